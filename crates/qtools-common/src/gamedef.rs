// gamedef.rs - per-game rules: contents, surfaces, hulls, filesystem

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::contentflags::{ContentFlags, GameData, Q1Detail, SurfFlags};
use crate::q_shared::{
    q_streq_nocase, Aabb, Q2Contents, CONTENTS_CLIP, CONTENTS_EMPTY, CONTENTS_LAVA,
    CONTENTS_ORIGIN, CONTENTS_SKY, CONTENTS_SLIME, CONTENTS_SOLID, CONTENTS_WATER,
    Q2_CONTENTS_LIQUID, Q2_CONTENTS_TYPE_MASK, TEX_SPECIAL,
};
use crate::settings::{self, CommonSettings};

/// Native game target ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameId {
    Unknown,
    Quake,
    Hexen2,
    HalfLife,
    Quake2,
}

// ============================================================
// Content statistics
// ============================================================

#[derive(Default)]
struct StatsData {
    native: HashMap<i32, u64>,
    detail_solid: u64,
    detail_fence: u64,
    detail_illusionary: u64,
    visblockers: u64,
}

/// Tally of classified contents, shared between worker threads.
#[derive(Default)]
pub struct ContentStats {
    inner: Mutex<StatsData>,
}

impl ContentStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of contents counted so far.
    pub fn total(&self) -> u64 {
        self.inner.lock().native.values().sum()
    }
}

// ============================================================
// Game definition
// ============================================================

/// Data and rules specific to the game a BSP is being compiled for.
/// Implementations are stateless; one static instance exists per game
/// and worker threads share it freely.
pub trait GameDef: Sync {
    fn id(&self) -> GameId;

    /// Whether the game uses an RGB lightmap or not.
    fn has_rgb_lightmap(&self) -> bool;

    /// Whether the game supports content flags on brush models.
    fn allow_contented_bmodels(&self) -> bool;

    /// Base dir for searching for paths, in case we are in a mod dir.
    fn default_base_dir(&self) -> &'static str;

    /// Max lengths of entity key and value strings, used for warnings.
    fn max_entity_key(&self) -> usize {
        32
    }
    fn max_entity_value(&self) -> usize {
        128
    }

    fn surf_is_lightmapped(&self, flags: &SurfFlags) -> bool;
    fn surf_is_subdivided(&self, flags: &SurfFlags) -> bool;
    fn surfflags_are_valid(&self, flags: &SurfFlags) -> bool;
    fn texinfo_is_hintskip(&self, flags: &SurfFlags, name: &str) -> bool;

    fn create_empty_contents(&self) -> ContentFlags;
    fn create_solid_contents(&self) -> ContentFlags;
    fn create_detail_illusionary_contents(&self, original: &ContentFlags) -> ContentFlags;
    fn create_detail_fence_contents(&self, original: &ContentFlags) -> ContentFlags;
    fn create_detail_solid_contents(&self, original: &ContentFlags) -> ContentFlags;

    fn contents_are_type_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool;
    fn contents_are_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool;
    fn contents_are_any_detail(&self, contents: &ContentFlags) -> bool;
    fn contents_are_detail_solid(&self, contents: &ContentFlags) -> bool;
    fn contents_are_detail_fence(&self, contents: &ContentFlags) -> bool;
    fn contents_are_detail_illusionary(&self, contents: &ContentFlags) -> bool;
    fn contents_are_mirrored(&self, contents: &ContentFlags) -> bool;
    fn contents_are_origin(&self, contents: &ContentFlags) -> bool;
    fn contents_are_clip(&self, contents: &ContentFlags) -> bool;
    fn contents_are_empty(&self, contents: &ContentFlags) -> bool;
    fn contents_are_solid(&self, contents: &ContentFlags) -> bool;
    fn contents_are_sky(&self, contents: &ContentFlags) -> bool;
    fn contents_are_liquid(&self, contents: &ContentFlags) -> bool;
    fn contents_are_valid(&self, contents: &ContentFlags, strict: bool) -> bool;

    /// Two contents of the same type clip each other unless either one
    /// opted out. Different types always clip.
    fn contents_clip_same_type(&self, a: &ContentFlags, b: &ContentFlags) -> bool {
        if !self.contents_are_type_equal(a, b) {
            return true;
        }
        a.clips_same_type.unwrap_or(true) && b.clips_same_type.unwrap_or(true)
    }

    /// When multiple brushes contribute to a leaf, the higher priority
    /// one determines the leaf contents.
    fn contents_priority(&self, contents: &ContentFlags) -> i32;

    /// Whether this chops lower priority brushes during CSG. True only
    /// for solid and opaque content types.
    fn chops(&self, contents: &ContentFlags) -> bool;

    /// Can a vis portal between these two contents be seen through?
    fn portal_can_see_through(
        &self,
        contents0: &ContentFlags,
        contents1: &ContentFlags,
        transwater: bool,
        transsky: bool,
    ) -> bool;

    /// Whether this content type stops a map leak.
    fn contents_seals_map(&self, contents: &ContentFlags) -> bool;

    /// Collapse compiler-internal content values to what the engine
    /// understands, just before serialization.
    fn contents_remap_for_export(&self, contents: &ContentFlags) -> ContentFlags;

    /// Resolve the contents of space claimed by two brushes at once.
    fn combine_contents(&self, a: &ContentFlags, b: &ContentFlags) -> ContentFlags;

    /// Resolve the contents of a merged vis cluster.
    fn cluster_contents(&self, a: &ContentFlags, b: &ContentFlags) -> ContentFlags {
        self.combine_contents(a, b)
    }

    fn get_contents_display(&self, contents: &ContentFlags) -> String;
    fn contents_make_valid(&self, contents: &mut ContentFlags);

    /// Decide the contents a face's texture name implies. The Quake
    /// family encodes liquids, sky, clip and origin in the name.
    fn face_get_contents(
        &self,
        texname: &str,
        flags: &SurfFlags,
        contents: &ContentFlags,
    ) -> ContentFlags;

    /// Collision hull dimensions, hull 0 first. Empty for games that
    /// store collision another way.
    fn get_hull_sizes(&self) -> &'static [Aabb];

    fn default_palette(&self) -> &'static [[u8; 3]; 256] {
        &settings::FALLBACK_PALETTE
    }

    /// Build the search path list for resolving game data files.
    fn init_filesystem(&self, source: &Path, settings: &CommonSettings) -> Vec<PathBuf> {
        settings::build_search_paths(source, settings, self.default_base_dir())
    }

    fn create_content_stats(&self) -> ContentStats {
        ContentStats::new()
    }

    fn count_contents_in_stats(&self, contents: &ContentFlags, stats: &ContentStats) {
        let mut data = stats.inner.lock();
        *data.native.entry(contents.native).or_insert(0) += 1;
        if self.contents_are_detail_solid(contents) {
            data.detail_solid += 1;
        } else if self.contents_are_detail_fence(contents) {
            data.detail_fence += 1;
        } else if self.contents_are_detail_illusionary(contents) {
            data.detail_illusionary += 1;
        }
        if contents.illusionary_visblocker {
            data.visblockers += 1;
        }
    }

    /// Render the tally as the familiar end-of-stage report.
    fn print_content_stats(&self, stats: &ContentStats, what: &str) -> String {
        let data = stats.inner.lock();
        let mut rows: Vec<(i32, u64)> = data.native.iter().map(|(k, v)| (*k, *v)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut out = String::new();
        for (native, count) in rows {
            let label = self.get_contents_display(&ContentFlags::from_native(native));
            let _ = writeln!(out, "{:8} {} {}", count, label, what);
        }
        if data.detail_solid > 0 {
            let _ = writeln!(out, "{:8} detail {}", data.detail_solid, what);
        }
        if data.detail_fence > 0 {
            let _ = writeln!(out, "{:8} detail fence {}", data.detail_fence, what);
        }
        if data.detail_illusionary > 0 {
            let _ = writeln!(out, "{:8} detail illusionary {}", data.detail_illusionary, what);
        }
        if data.visblockers > 0 {
            let _ = writeln!(out, "{:8} vis blocker {}", data.visblockers, what);
        }
        out
    }
}

// ============================================================
// Quake-like games (Quake, Hexen II, Half-Life)
// ============================================================

/// One ruleset covers the whole Quake family; the games differ only in
/// hull tables, lightmap format, and data layout on disk.
pub struct Q1LikeGame {
    id: GameId,
    base_dir: &'static str,
    rgb_lightmap: bool,
    contented_bmodels: bool,
    hulls: &'static [Aabb],
}

static QUAKE_HULLS: [Aabb; 3] = [
    Aabb::ZERO,
    Aabb::new([-16.0, -16.0, -32.0], [16.0, 16.0, 24.0]),
    Aabb::new([-32.0, -32.0, -64.0], [32.0, 32.0, 24.0]),
];

static HEXEN2_HULLS: [Aabb; 6] = [
    Aabb::ZERO,
    Aabb::new([-16.0, -16.0, -32.0], [16.0, 16.0, 24.0]),
    Aabb::new([-24.0, -24.0, -20.0], [24.0, 24.0, 20.0]),
    Aabb::new([-16.0, -16.0, -16.0], [16.0, 16.0, 12.0]),
    Aabb::new([-8.0, -8.0, -8.0], [8.0, 8.0, 8.0]),
    Aabb::new([-48.0, -48.0, -50.0], [48.0, 48.0, 50.0]),
];

static HALF_LIFE_HULLS: [Aabb; 4] = [
    Aabb::ZERO,
    Aabb::new([-16.0, -16.0, -36.0], [16.0, 16.0, 36.0]),
    Aabb::new([-32.0, -32.0, -32.0], [32.0, 32.0, 32.0]),
    Aabb::new([-16.0, -16.0, -18.0], [16.0, 16.0, 18.0]),
];

pub static GAME_QUAKE: Q1LikeGame = Q1LikeGame {
    id: GameId::Quake,
    base_dir: "id1",
    rgb_lightmap: false,
    contented_bmodels: false,
    hulls: &QUAKE_HULLS,
};

pub static GAME_HEXEN_II: Q1LikeGame = Q1LikeGame {
    id: GameId::Hexen2,
    base_dir: "data1",
    rgb_lightmap: false,
    contented_bmodels: false,
    hulls: &HEXEN2_HULLS,
};

pub static GAME_HALF_LIFE: Q1LikeGame = Q1LikeGame {
    id: GameId::HalfLife,
    base_dir: "valve",
    rgb_lightmap: true,
    contented_bmodels: true,
    hulls: &HALF_LIFE_HULLS,
};

impl Q1LikeGame {
    fn detail_of(&self, contents: &ContentFlags) -> Option<Q1Detail> {
        match contents.game_data {
            GameData::Q1(detail) => Some(detail),
            GameData::None => None,
        }
    }

    fn blocks_vis(&self, contents: &ContentFlags, transwater: bool, transsky: bool) -> bool {
        if contents.illusionary_visblocker {
            return true;
        }
        if self.contents_are_solid(contents) || self.contents_are_detail_solid(contents) {
            return true;
        }
        if self.contents_are_sky(contents) {
            return !transsky;
        }
        // structural liquids block unless translucent water was asked
        // for; detail liquids (fence or illusionary) never block
        if self.contents_are_liquid(contents) && !self.contents_are_any_detail(contents) {
            return !transwater;
        }
        false
    }
}

impl GameDef for Q1LikeGame {
    fn id(&self) -> GameId {
        self.id
    }

    fn has_rgb_lightmap(&self) -> bool {
        self.rgb_lightmap
    }

    fn allow_contented_bmodels(&self) -> bool {
        self.contented_bmodels
    }

    fn default_base_dir(&self) -> &'static str {
        self.base_dir
    }

    fn surf_is_lightmapped(&self, flags: &SurfFlags) -> bool {
        flags.native & TEX_SPECIAL == 0
    }

    fn surf_is_subdivided(&self, flags: &SurfFlags) -> bool {
        flags.native & TEX_SPECIAL == 0
    }

    fn surfflags_are_valid(&self, flags: &SurfFlags) -> bool {
        // TEX_SPECIAL is the only native bit the Quake family has
        flags.native & !TEX_SPECIAL == 0
    }

    fn texinfo_is_hintskip(&self, flags: &SurfFlags, name: &str) -> bool {
        if flags.is_hint || flags.is_skip {
            return true;
        }
        // wad texture names are case-insensitive
        const HINTSKIP_NAMES: [&str; 6] = [
            "hint",
            "hintskip",
            "skip",
            "*waterskip",
            "*slimeskip",
            "*lavaskip",
        ];
        HINTSKIP_NAMES.iter().any(|n| q_streq_nocase(name, n))
    }

    fn create_empty_contents(&self) -> ContentFlags {
        ContentFlags::from_native(CONTENTS_EMPTY)
    }

    fn create_solid_contents(&self) -> ContentFlags {
        ContentFlags::from_native(CONTENTS_SOLID)
    }

    fn create_detail_illusionary_contents(&self, original: &ContentFlags) -> ContentFlags {
        let mut out = *original;
        // a liquid stays its liquid type, anything else renders in empty
        if !self.contents_are_liquid(original) {
            out.native = CONTENTS_EMPTY;
        }
        out.game_data = GameData::Q1(Q1Detail::Illusionary);
        out
    }

    fn create_detail_fence_contents(&self, original: &ContentFlags) -> ContentFlags {
        let mut out = *original;
        if !self.contents_are_liquid(original) {
            out.native = CONTENTS_SOLID;
        }
        out.game_data = GameData::Q1(Q1Detail::Fence);
        out
    }

    fn create_detail_solid_contents(&self, original: &ContentFlags) -> ContentFlags {
        let mut out = *original;
        out.native = CONTENTS_SOLID;
        out.game_data = GameData::Q1(Q1Detail::Solid);
        out
    }

    fn contents_are_type_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool {
        a.native == b.native
            && a.game_data == b.game_data
            && a.illusionary_visblocker == b.illusionary_visblocker
    }

    fn contents_are_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool {
        a == b
    }

    fn contents_are_any_detail(&self, contents: &ContentFlags) -> bool {
        self.detail_of(contents).is_some()
    }

    fn contents_are_detail_solid(&self, contents: &ContentFlags) -> bool {
        self.detail_of(contents) == Some(Q1Detail::Solid)
    }

    fn contents_are_detail_fence(&self, contents: &ContentFlags) -> bool {
        self.detail_of(contents) == Some(Q1Detail::Fence)
    }

    fn contents_are_detail_illusionary(&self, contents: &ContentFlags) -> bool {
        self.detail_of(contents) == Some(Q1Detail::Illusionary)
    }

    fn contents_are_mirrored(&self, contents: &ContentFlags) -> bool {
        contents.mirror_inside.unwrap_or_else(|| {
            self.contents_are_liquid(contents)
                || self.contents_are_detail_fence(contents)
                || self.contents_are_detail_illusionary(contents)
        })
    }

    fn contents_are_origin(&self, contents: &ContentFlags) -> bool {
        contents.native == CONTENTS_ORIGIN
    }

    fn contents_are_clip(&self, contents: &ContentFlags) -> bool {
        contents.native == CONTENTS_CLIP
    }

    fn contents_are_empty(&self, contents: &ContentFlags) -> bool {
        contents.native == CONTENTS_EMPTY
            && contents.game_data == GameData::None
            && !contents.illusionary_visblocker
    }

    fn contents_are_solid(&self, contents: &ContentFlags) -> bool {
        contents.native == CONTENTS_SOLID && contents.game_data == GameData::None
    }

    fn contents_are_sky(&self, contents: &ContentFlags) -> bool {
        contents.native == CONTENTS_SKY
    }

    fn contents_are_liquid(&self, contents: &ContentFlags) -> bool {
        matches!(
            contents.native,
            CONTENTS_WATER | CONTENTS_SLIME | CONTENTS_LAVA
        )
    }

    fn contents_are_valid(&self, contents: &ContentFlags, strict: bool) -> bool {
        match contents.native {
            CONTENTS_EMPTY | CONTENTS_SOLID | CONTENTS_WATER | CONTENTS_SLIME | CONTENTS_LAVA
            | CONTENTS_SKY | CONTENTS_CLIP | CONTENTS_ORIGIN => true,
            0 => !strict,
            _ => false,
        }
    }

    fn contents_priority(&self, contents: &ContentFlags) -> i32 {
        match self.detail_of(contents) {
            Some(Q1Detail::Solid) => 5,
            Some(Q1Detail::Fence) => 4,
            Some(Q1Detail::Illusionary) => 3,
            None => match contents.native {
                CONTENTS_SOLID => 7,
                CONTENTS_SKY => 6,
                CONTENTS_WATER | CONTENTS_SLIME | CONTENTS_LAVA => 2,
                CONTENTS_CLIP | CONTENTS_ORIGIN => 2,
                CONTENTS_EMPTY => 1,
                _ => 0,
            },
        }
    }

    fn chops(&self, contents: &ContentFlags) -> bool {
        self.contents_are_solid(contents)
            || self.contents_are_detail_solid(contents)
            || self.contents_are_sky(contents)
    }

    fn portal_can_see_through(
        &self,
        contents0: &ContentFlags,
        contents1: &ContentFlags,
        transwater: bool,
        transsky: bool,
    ) -> bool {
        !self.blocks_vis(contents0, transwater, transsky)
            && !self.blocks_vis(contents1, transwater, transsky)
    }

    fn contents_seals_map(&self, contents: &ContentFlags) -> bool {
        self.contents_are_solid(contents) || self.contents_are_sky(contents)
    }

    fn contents_remap_for_export(&self, contents: &ContentFlags) -> ContentFlags {
        // clip becomes plain solid, origin was cut at CSG time and any
        // leftover collapses to empty; detail tiers drop their marker
        let native = match contents.native {
            CONTENTS_CLIP => CONTENTS_SOLID,
            CONTENTS_ORIGIN => CONTENTS_EMPTY,
            n => n,
        };
        ContentFlags::from_native(native)
    }

    fn combine_contents(&self, a: &ContentFlags, b: &ContentFlags) -> ContentFlags {
        let mut out = if self.contents_priority(a) >= self.contents_priority(b) {
            *a
        } else {
            *b
        };
        out.illusionary_visblocker = a.illusionary_visblocker || b.illusionary_visblocker;
        out
    }

    fn get_contents_display(&self, contents: &ContentFlags) -> String {
        let base = match contents.native {
            CONTENTS_EMPTY => "EMPTY",
            CONTENTS_SOLID => "SOLID",
            CONTENTS_WATER => "WATER",
            CONTENTS_SLIME => "SLIME",
            CONTENTS_LAVA => "LAVA",
            CONTENTS_SKY => "SKY",
            CONTENTS_CLIP => "CLIP",
            CONTENTS_ORIGIN => "ORIGIN",
            other => return format!("UNKNOWN({})", other),
        };
        let mut out = String::from(base);
        match self.detail_of(contents) {
            Some(Q1Detail::Solid) => out.push_str(" (DETAIL)"),
            Some(Q1Detail::Fence) => out.push_str(" (DETAIL_FENCE)"),
            Some(Q1Detail::Illusionary) => out.push_str(" (DETAIL_ILLUSIONARY)"),
            None => {}
        }
        if contents.illusionary_visblocker {
            out.push_str(" (VISBLOCKER)");
        }
        out
    }

    fn contents_make_valid(&self, contents: &mut ContentFlags) {
        if !self.contents_are_valid(contents, false) {
            *contents = self.create_solid_contents();
        }
    }

    fn face_get_contents(
        &self,
        texname: &str,
        _flags: &SurfFlags,
        contents: &ContentFlags,
    ) -> ContentFlags {
        let lower = texname.to_ascii_lowercase();
        if lower.starts_with("sky") {
            ContentFlags::from_native(CONTENTS_SKY)
        } else if let Some(rest) = lower.strip_prefix('*') {
            if rest.starts_with("lava") {
                ContentFlags::from_native(CONTENTS_LAVA)
            } else if rest.starts_with("slime") {
                ContentFlags::from_native(CONTENTS_SLIME)
            } else {
                ContentFlags::from_native(CONTENTS_WATER)
            }
        } else if lower == "clip" {
            ContentFlags::from_native(CONTENTS_CLIP)
        } else if lower == "origin" {
            ContentFlags::from_native(CONTENTS_ORIGIN)
        } else {
            *contents
        }
    }

    fn get_hull_sizes(&self) -> &'static [Aabb] {
        self.hulls
    }
}

// ============================================================
// Quake II
// ============================================================

pub struct Q2Game {
    base_dir: &'static str,
}

pub static GAME_QUAKE_II: Q2Game = Q2Game { base_dir: "baseq2" };

const Q2_VISIBLE_MASK: i32 = Q2Contents::WINDOW.bits()
    | Q2Contents::AUX.bits()
    | Q2Contents::LAVA.bits()
    | Q2Contents::SLIME.bits()
    | Q2Contents::WATER.bits()
    | Q2Contents::MIST.bits();

const Q2_KNOWN_SURF_MASK: i32 = crate::q_shared::Q2_SURF_LIGHT
    | crate::q_shared::Q2_SURF_SLICK
    | crate::q_shared::Q2_SURF_SKY
    | crate::q_shared::Q2_SURF_WARP
    | crate::q_shared::Q2_SURF_TRANS33
    | crate::q_shared::Q2_SURF_TRANS66
    | crate::q_shared::Q2_SURF_FLOWING
    | crate::q_shared::Q2_SURF_NODRAW
    | crate::q_shared::Q2_SURF_HINT
    | crate::q_shared::Q2_SURF_SKIP;

impl Q2Game {
    fn bits(contents: &ContentFlags) -> Q2Contents {
        Q2Contents::from_bits_retain(contents.native)
    }

    fn blocks_vis(&self, contents: &ContentFlags) -> bool {
        if contents.illusionary_visblocker {
            return true;
        }
        let bits = Self::bits(contents);
        // structural solid blocks; detail lets vis flow through
        bits.contains(Q2Contents::SOLID) && !bits.contains(Q2Contents::DETAIL)
    }
}

impl GameDef for Q2Game {
    fn id(&self) -> GameId {
        GameId::Quake2
    }

    fn has_rgb_lightmap(&self) -> bool {
        true
    }

    fn allow_contented_bmodels(&self) -> bool {
        true
    }

    fn default_base_dir(&self) -> &'static str {
        self.base_dir
    }

    fn surf_is_lightmapped(&self, flags: &SurfFlags) -> bool {
        use crate::q_shared::{Q2_SURF_NODRAW, Q2_SURF_SKY, Q2_SURF_WARP};
        flags.native & (Q2_SURF_SKY | Q2_SURF_WARP | Q2_SURF_NODRAW) == 0
    }

    fn surf_is_subdivided(&self, flags: &SurfFlags) -> bool {
        use crate::q_shared::{Q2_SURF_SKY, Q2_SURF_WARP};
        flags.native & (Q2_SURF_SKY | Q2_SURF_WARP) == 0
    }

    fn surfflags_are_valid(&self, flags: &SurfFlags) -> bool {
        flags.native & !Q2_KNOWN_SURF_MASK == 0
    }

    fn texinfo_is_hintskip(&self, flags: &SurfFlags, _name: &str) -> bool {
        use crate::q_shared::{Q2_SURF_HINT, Q2_SURF_SKIP};
        // Quake II carries hint/skip in the surface flags themselves
        flags.is_hint || flags.is_skip || flags.native & (Q2_SURF_HINT | Q2_SURF_SKIP) != 0
    }

    fn create_empty_contents(&self) -> ContentFlags {
        ContentFlags::from_native(0)
    }

    fn create_solid_contents(&self) -> ContentFlags {
        ContentFlags::from_native(Q2Contents::SOLID.bits())
    }

    fn create_detail_illusionary_contents(&self, original: &ContentFlags) -> ContentFlags {
        let mut out = *original;
        let mut bits = Self::bits(original);
        bits.remove(Q2Contents::SOLID | Q2Contents::WINDOW);
        bits.insert(Q2Contents::MIST | Q2Contents::DETAIL | Q2Contents::TRANSLUCENT);
        out.native = bits.bits();
        out
    }

    fn create_detail_fence_contents(&self, original: &ContentFlags) -> ContentFlags {
        let mut out = *original;
        let mut bits = Self::bits(original);
        bits.remove(Q2Contents::SOLID | Q2Contents::AUX | Q2Contents::MIST);
        bits.insert(Q2Contents::WINDOW | Q2Contents::DETAIL | Q2Contents::TRANSLUCENT);
        out.native = bits.bits();
        out
    }

    fn create_detail_solid_contents(&self, original: &ContentFlags) -> ContentFlags {
        let mut out = *original;
        let mut bits = Self::bits(original);
        bits.remove(Q2Contents::from_bits_retain(Q2_VISIBLE_MASK) | Q2Contents::TRANSLUCENT);
        bits.insert(Q2Contents::SOLID | Q2Contents::DETAIL);
        out.native = bits.bits();
        out
    }

    fn contents_are_type_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool {
        // modifier bits like CURRENT_* or MONSTER don't make a type
        a.native & Q2_CONTENTS_TYPE_MASK == b.native & Q2_CONTENTS_TYPE_MASK
            && a.illusionary_visblocker == b.illusionary_visblocker
    }

    fn contents_are_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool {
        a == b
    }

    fn contents_are_any_detail(&self, contents: &ContentFlags) -> bool {
        Self::bits(contents).contains(Q2Contents::DETAIL)
    }

    fn contents_are_detail_solid(&self, contents: &ContentFlags) -> bool {
        Self::bits(contents).contains(Q2Contents::DETAIL | Q2Contents::SOLID)
    }

    fn contents_are_detail_fence(&self, contents: &ContentFlags) -> bool {
        Self::bits(contents).contains(Q2Contents::DETAIL | Q2Contents::WINDOW)
    }

    fn contents_are_detail_illusionary(&self, contents: &ContentFlags) -> bool {
        Self::bits(contents).contains(Q2Contents::DETAIL | Q2Contents::MIST)
    }

    fn contents_are_mirrored(&self, contents: &ContentFlags) -> bool {
        contents
            .mirror_inside
            .unwrap_or_else(|| self.contents_are_liquid(contents))
    }

    fn contents_are_origin(&self, contents: &ContentFlags) -> bool {
        Self::bits(contents).contains(Q2Contents::ORIGIN)
    }

    fn contents_are_clip(&self, contents: &ContentFlags) -> bool {
        Self::bits(contents)
            .intersects(Q2Contents::PLAYERCLIP | Q2Contents::MONSTERCLIP)
    }

    fn contents_are_empty(&self, contents: &ContentFlags) -> bool {
        contents.native == 0 && !contents.illusionary_visblocker
    }

    fn contents_are_solid(&self, contents: &ContentFlags) -> bool {
        let bits = Self::bits(contents);
        bits.contains(Q2Contents::SOLID) && !bits.contains(Q2Contents::DETAIL)
    }

    fn contents_are_sky(&self, _contents: &ContentFlags) -> bool {
        // sky is a surface flag in Quake II, not a content
        false
    }

    fn contents_are_liquid(&self, contents: &ContentFlags) -> bool {
        contents.native & Q2_CONTENTS_LIQUID != 0
    }

    fn contents_are_valid(&self, contents: &ContentFlags, strict: bool) -> bool {
        if !strict {
            return true;
        }
        // solid mixed with a translucent visible type confuses vis
        let bits = Self::bits(contents);
        !(bits.contains(Q2Contents::SOLID) && contents.native & Q2_VISIBLE_MASK != 0)
    }

    fn contents_priority(&self, contents: &ContentFlags) -> i32 {
        let bits = Self::bits(contents);
        if bits.contains(Q2Contents::SOLID) {
            10
        } else if bits.contains(Q2Contents::WINDOW) {
            9
        } else if bits.contains(Q2Contents::AUX) {
            8
        } else if bits.contains(Q2Contents::LAVA) {
            7
        } else if bits.contains(Q2Contents::SLIME) {
            6
        } else if bits.contains(Q2Contents::WATER) {
            5
        } else if bits.contains(Q2Contents::MIST) {
            4
        } else if bits.contains(Q2Contents::AREAPORTAL) {
            3
        } else if bits.intersects(
            Q2Contents::PLAYERCLIP | Q2Contents::MONSTERCLIP | Q2Contents::ORIGIN,
        ) {
            2
        } else if contents.native == 0 {
            1
        } else {
            0
        }
    }

    fn chops(&self, contents: &ContentFlags) -> bool {
        Self::bits(contents).contains(Q2Contents::SOLID)
    }

    fn portal_can_see_through(
        &self,
        contents0: &ContentFlags,
        contents1: &ContentFlags,
        _transwater: bool,
        _transsky: bool,
    ) -> bool {
        // liquids are always translucent to vis in Quake II
        !self.blocks_vis(contents0) && !self.blocks_vis(contents1)
    }

    fn contents_seals_map(&self, contents: &ContentFlags) -> bool {
        self.contents_are_solid(contents)
    }

    fn contents_remap_for_export(&self, contents: &ContentFlags) -> ContentFlags {
        // everything the compiler tracks is already a native bit
        ContentFlags::from_native(contents.native)
    }

    fn combine_contents(&self, a: &ContentFlags, b: &ContentFlags) -> ContentFlags {
        let mut out = if self.contents_priority(a) >= self.contents_priority(b) {
            *a
        } else {
            *b
        };
        out.native = a.native | b.native;
        out.illusionary_visblocker = a.illusionary_visblocker || b.illusionary_visblocker;
        self.contents_make_valid(&mut out);
        out
    }

    fn get_contents_display(&self, contents: &ContentFlags) -> String {
        if contents.native == 0 {
            return "EMPTY".to_string();
        }
        let names: Vec<&str> = Self::bits(contents)
            .iter_names()
            .map(|(name, _)| name)
            .collect();
        if names.is_empty() {
            format!("UNKNOWN({:#x})", contents.native)
        } else {
            names.join(" | ")
        }
    }

    fn contents_make_valid(&self, contents: &mut ContentFlags) {
        let bits = Self::bits(contents);
        if bits.contains(Q2Contents::SOLID) && contents.native & Q2_VISIBLE_MASK != 0 {
            contents.native &= !(Q2_VISIBLE_MASK | Q2Contents::TRANSLUCENT.bits());
        }
    }

    fn face_get_contents(
        &self,
        _texname: &str,
        _flags: &SurfFlags,
        contents: &ContentFlags,
    ) -> ContentFlags {
        // the editor supplies contents per brush; texture names carry
        // no content meaning in Quake II
        *contents
    }

    fn get_hull_sizes(&self) -> &'static [Aabb] {
        &[]
    }
}

// ============================================================
// Generic (in-memory only)
// ============================================================

/// Stand-in game for the generic document form. It exists so the
/// registry entry has something to point at; asking it a semantic
/// question is a programming error, queries must go through the
/// format the document was loaded from.
pub struct GenericGame;

pub static GAME_GENERIC: GenericGame = GenericGame;

macro_rules! no_game_semantics {
    () => {
        panic!("generic BSP documents have no game semantics")
    };
}

impl GameDef for GenericGame {
    fn id(&self) -> GameId {
        GameId::Unknown
    }

    fn has_rgb_lightmap(&self) -> bool {
        no_game_semantics!()
    }

    fn allow_contented_bmodels(&self) -> bool {
        no_game_semantics!()
    }

    fn default_base_dir(&self) -> &'static str {
        no_game_semantics!()
    }

    fn surf_is_lightmapped(&self, _flags: &SurfFlags) -> bool {
        no_game_semantics!()
    }

    fn surf_is_subdivided(&self, _flags: &SurfFlags) -> bool {
        no_game_semantics!()
    }

    fn surfflags_are_valid(&self, _flags: &SurfFlags) -> bool {
        no_game_semantics!()
    }

    fn texinfo_is_hintskip(&self, _flags: &SurfFlags, _name: &str) -> bool {
        no_game_semantics!()
    }

    fn create_empty_contents(&self) -> ContentFlags {
        no_game_semantics!()
    }

    fn create_solid_contents(&self) -> ContentFlags {
        no_game_semantics!()
    }

    fn create_detail_illusionary_contents(&self, _original: &ContentFlags) -> ContentFlags {
        no_game_semantics!()
    }

    fn create_detail_fence_contents(&self, _original: &ContentFlags) -> ContentFlags {
        no_game_semantics!()
    }

    fn create_detail_solid_contents(&self, _original: &ContentFlags) -> ContentFlags {
        no_game_semantics!()
    }

    fn contents_are_type_equal(&self, _a: &ContentFlags, _b: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_equal(&self, _a: &ContentFlags, _b: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_any_detail(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_detail_solid(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_detail_fence(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_detail_illusionary(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_mirrored(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_origin(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_clip(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_empty(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_solid(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_sky(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_liquid(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_are_valid(&self, _contents: &ContentFlags, _strict: bool) -> bool {
        no_game_semantics!()
    }

    fn contents_priority(&self, _contents: &ContentFlags) -> i32 {
        no_game_semantics!()
    }

    fn chops(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn portal_can_see_through(
        &self,
        _contents0: &ContentFlags,
        _contents1: &ContentFlags,
        _transwater: bool,
        _transsky: bool,
    ) -> bool {
        no_game_semantics!()
    }

    fn contents_seals_map(&self, _contents: &ContentFlags) -> bool {
        no_game_semantics!()
    }

    fn contents_remap_for_export(&self, _contents: &ContentFlags) -> ContentFlags {
        no_game_semantics!()
    }

    fn combine_contents(&self, _a: &ContentFlags, _b: &ContentFlags) -> ContentFlags {
        no_game_semantics!()
    }

    fn get_contents_display(&self, _contents: &ContentFlags) -> String {
        no_game_semantics!()
    }

    fn contents_make_valid(&self, _contents: &mut ContentFlags) {
        no_game_semantics!()
    }

    fn face_get_contents(
        &self,
        _texname: &str,
        _flags: &SurfFlags,
        _contents: &ContentFlags,
    ) -> ContentFlags {
        no_game_semantics!()
    }

    fn get_hull_sizes(&self) -> &'static [Aabb] {
        no_game_semantics!()
    }
}
