// settings.rs - tool-wide options and game data discovery

use std::path::{Path, PathBuf};

use crate::gamedef::{GameDef, GameId};

/// Options every tool shares, fed to `GameDef::init_filesystem`.
#[derive(Debug, Clone)]
pub struct CommonSettings {
    /// Override for the game's base data directory (the id1/baseq2
    /// equivalent). When unset it is located relative to the input file.
    pub basedir: Option<PathBuf>,

    /// Mod directory name, searched before the base game data.
    pub gamedir: Option<String>,

    /// Whether the game's default data directory joins the search path.
    pub defaultpaths: bool,
}

impl Default for CommonSettings {
    fn default() -> Self {
        CommonSettings {
            basedir: None,
            gamedir: None,
            defaultpaths: true,
        }
    }
}

/// Assemble the search path list for a compile: the input file's own
/// directory, then the mod directory, then the base game directory.
/// Most specific first, the same order the engines search.
pub fn build_search_paths(
    source: &Path,
    settings: &CommonSettings,
    default_base_dir: &str,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = source.parent() {
        if !dir.as_os_str().is_empty() {
            paths.push(dir.to_path_buf());
        }
    }

    let base: Option<PathBuf> = if let Some(b) = &settings.basedir {
        Some(b.clone())
    } else {
        source.ancestors().skip(1).find_map(|a| {
            let candidate = a.join(default_base_dir);
            candidate.is_dir().then_some(candidate)
        })
    };

    if let Some(base) = base {
        if let Some(game) = &settings.gamedir {
            if let Some(root) = base.parent() {
                paths.push(root.join(game));
            }
        }
        if settings.defaultpaths {
            paths.push(base);
        }
    }

    paths.dedup();
    log::debug!("search paths: {:?}", paths);
    paths
}

// ============================================================
// Palette loading
// ============================================================

/// Neutral grayscale ramp used when no game palette can be found.
pub const FALLBACK_PALETTE: [[u8; 3]; 256] = fallback_palette();

const fn fallback_palette() -> [[u8; 3]; 256] {
    let mut pal = [[0u8; 3]; 256];
    let mut i = 0;
    while i < 256 {
        pal[i] = [i as u8; 3];
        i += 1;
    }
    pal
}

const PALETTE_BYTES: usize = 256 * 3;

fn palette_from_bytes(bytes: &[u8]) -> [[u8; 3]; 256] {
    let mut pal = [[0u8; 3]; 256];
    for (i, chunk) in bytes.chunks_exact(3).take(256).enumerate() {
        pal[i] = [chunk[0], chunk[1], chunk[2]];
    }
    pal
}

/// Load the game palette from the search paths. The Quake family keeps
/// a raw 768-byte `gfx/palette.lmp`; Quake II carries its palette in
/// the trailer of `pics/colormap.pcx` behind a 0x0C marker byte.
/// Falls back to the game's built-in default when nothing is found.
pub fn load_palette(paths: &[PathBuf], game: &dyn GameDef) -> [[u8; 3]; 256] {
    let rel: &Path = if game.id() == GameId::Quake2 {
        Path::new("pics/colormap.pcx")
    } else {
        Path::new("gfx/palette.lmp")
    };

    for dir in paths {
        let file = dir.join(rel);
        let Ok(bytes) = std::fs::read(&file) else {
            continue;
        };
        if game.id() == GameId::Quake2 {
            if bytes.len() > PALETTE_BYTES && bytes[bytes.len() - PALETTE_BYTES - 1] == 0x0c {
                log::debug!("palette from {}", file.display());
                return palette_from_bytes(&bytes[bytes.len() - PALETTE_BYTES..]);
            }
        } else if bytes.len() >= PALETTE_BYTES {
            log::debug!("palette from {}", file.display());
            return palette_from_bytes(&bytes);
        }
        log::warn!("ignoring malformed palette {}", file.display());
    }
    *game.default_palette()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedef::{GAME_QUAKE, GAME_QUAKE_II};
    use std::fs;

    #[test]
    fn test_fallback_palette_ramp() {
        assert_eq!(FALLBACK_PALETTE[0], [0, 0, 0]);
        assert_eq!(FALLBACK_PALETTE[128], [128, 128, 128]);
        assert_eq!(FALLBACK_PALETTE[255], [255, 255, 255]);
    }

    #[test]
    fn test_search_paths_with_base_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("id1/maps")).unwrap();

        let source = root.join("id1/maps/start.map");
        let paths = build_search_paths(&source, &CommonSettings::default(), "id1");
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], root.join("id1/maps"));
        assert_eq!(paths[1], root.join("id1"));
    }

    #[test]
    fn test_search_paths_with_mod_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("id1")).unwrap();
        fs::create_dir_all(root.join("mymod")).unwrap();

        let settings = CommonSettings {
            gamedir: Some("mymod".into()),
            ..Default::default()
        };
        let source = root.join("start.map");
        let paths = build_search_paths(&source, &settings, "id1");
        assert_eq!(paths[paths.len() - 2], root.join("mymod"));
        assert_eq!(paths[paths.len() - 1], root.join("id1"));
    }

    #[test]
    fn test_search_paths_no_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("id1")).unwrap();

        let settings = CommonSettings {
            defaultpaths: false,
            ..Default::default()
        };
        let source = root.join("start.map");
        let paths = build_search_paths(&source, &settings, "id1");
        assert!(!paths.contains(&root.join("id1")));
    }

    #[test]
    fn test_load_palette_quake() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        fs::create_dir_all(dir.join("gfx")).unwrap();

        let mut raw = Vec::new();
        for i in 0..256u32 {
            raw.extend_from_slice(&[(255 - i) as u8, 0, i as u8]);
        }
        fs::write(dir.join("gfx/palette.lmp"), &raw).unwrap();

        let pal = load_palette(&[dir], &GAME_QUAKE);
        assert_eq!(pal[0], [255, 0, 0]);
        assert_eq!(pal[255], [0, 0, 255]);
    }

    #[test]
    fn test_load_palette_q2_colormap_trailer() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        fs::create_dir_all(dir.join("pics")).unwrap();

        let mut pcx = vec![0u8; 1024]; // fake image data
        pcx.push(0x0c);
        for i in 0..256u32 {
            pcx.extend_from_slice(&[i as u8, i as u8, 0]);
        }
        fs::write(dir.join("pics/colormap.pcx"), &pcx).unwrap();

        let pal = load_palette(&[dir], &GAME_QUAKE_II);
        assert_eq!(pal[7], [7, 7, 0]);
    }

    #[test]
    fn test_load_palette_fallback() {
        let pal = load_palette(&[PathBuf::from("/nonexistent")], &GAME_QUAKE);
        assert_eq!(pal, FALLBACK_PALETTE);
    }
}
