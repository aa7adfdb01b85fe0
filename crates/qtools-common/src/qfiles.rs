// qfiles.rs - on-disk BSP container structures shared by every format

use crate::error::{BspError, BspResult};
use crate::q_shared::{numeric_cast_u16, Vec3};
use crate::stream::{put_f32, put_i32, put_u16, put_u32, put_vec3, BspReader, LumpRecord};

// ============================================================
// Format idents
// ============================================================
// The first dword of a BSP file. The Quake lineage used a bare version
// number; later formats switched to four ASCII characters.

/// Quake / Hexen II BSP version (plain 29, no magic string)
pub const BSPVERSION: i32 = 29;
/// Half-Life BSP version (same shell as Quake, RGB lightmaps)
pub const BSPHLVERSION: i32 = 30;
/// BSP2 magic: "BSP2" in little-endian
pub const BSP2VERSION: i32 =
    (b'2' as i32) << 24 | (b'P' as i32) << 16 | (b'S' as i32) << 8 | b'B' as i32;
/// BSP2 RMQ prototype magic: "2PSB" in little-endian
pub const BSP2RMQVERSION: i32 =
    (b'B' as i32) << 24 | (b'S' as i32) << 16 | (b'P' as i32) << 8 | b'2' as i32;
/// Quake II BSP magic: "IBSP" in little-endian
pub const IDBSPHEADER: i32 =
    (b'P' as i32) << 24 | (b'S' as i32) << 16 | (b'B' as i32) << 8 | b'I' as i32;
/// Qbism extended Quake II magic: "QBSP" in little-endian
pub const QBISMHEADER: i32 =
    (b'P' as i32) << 24 | (b'S' as i32) << 16 | (b'B' as i32) << 8 | b'Q' as i32;
/// In-memory generic document tag: "MBSP" in little-endian
pub const MBSPIDENT: i32 =
    (b'P' as i32) << 24 | (b'S' as i32) << 16 | (b'B' as i32) << 8 | b'M' as i32;
/// Quake II BSP version number (follows the IBSP/QBSP magic)
pub const Q2_BSPVERSION: i32 = 38;

/// Render an ident as the four ASCII characters it occupies on disk,
/// least significant byte first. Non-printable bytes render as '.'.
pub fn ident_name(ident: i32) -> String {
    ident
        .to_le_bytes()
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

/// Decode the entities lump. The text is NUL-terminated on disk; some
/// tools pad with extra NULs, so strip them all.
pub(crate) fn entdata_from_bytes(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encode the entities lump, appending the terminating NUL.
pub(crate) fn entdata_to_bytes(entdata: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(entdata.len() + 1);
    out.extend_from_slice(entdata.as_bytes());
    out.push(0);
    out
}

// ============================================================
// Lump directory
// ============================================================

pub const Q1_HEADER_LUMPS: usize = 15;
pub const Q2_HEADER_LUMPS: usize = 19;

// Quake-family lump indices
pub const LUMP_ENTITIES: usize = 0;
pub const LUMP_PLANES: usize = 1;
pub const LUMP_TEXTURES: usize = 2;
pub const LUMP_VERTEXES: usize = 3;
pub const LUMP_VISIBILITY: usize = 4;
pub const LUMP_NODES: usize = 5;
pub const LUMP_TEXINFO: usize = 6;
pub const LUMP_FACES: usize = 7;
pub const LUMP_LIGHTING: usize = 8;
pub const LUMP_CLIPNODES: usize = 9;
pub const LUMP_LEAFS: usize = 10;
pub const LUMP_MARKSURFACES: usize = 11;
pub const LUMP_EDGES: usize = 12;
pub const LUMP_SURFEDGES: usize = 13;
pub const LUMP_MODELS: usize = 14;

// Quake II family lump indices
pub const Q2_LUMP_ENTITIES: usize = 0;
pub const Q2_LUMP_PLANES: usize = 1;
pub const Q2_LUMP_VERTEXES: usize = 2;
pub const Q2_LUMP_VISIBILITY: usize = 3;
pub const Q2_LUMP_NODES: usize = 4;
pub const Q2_LUMP_TEXINFO: usize = 5;
pub const Q2_LUMP_FACES: usize = 6;
pub const Q2_LUMP_LIGHTING: usize = 7;
pub const Q2_LUMP_LEAFS: usize = 8;
pub const Q2_LUMP_LEAFFACES: usize = 9;
pub const Q2_LUMP_LEAFBRUSHES: usize = 10;
pub const Q2_LUMP_EDGES: usize = 11;
pub const Q2_LUMP_SURFEDGES: usize = 12;
pub const Q2_LUMP_MODELS: usize = 13;
pub const Q2_LUMP_BRUSHES: usize = 14;
pub const Q2_LUMP_BRUSHSIDES: usize = 15;
pub const Q2_LUMP_POP: usize = 16;
pub const Q2_LUMP_AREAS: usize = 17;
pub const Q2_LUMP_AREAPORTALS: usize = 18;

/// One lump directory entry: byte offset and length within the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Lump {
    pub fileofs: i32,
    pub filelen: i32,
}

impl LumpRecord for Lump {
    const DISK_SIZE: usize = 8;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(Lump {
            fileofs: r.read_i32()?,
            filelen: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.fileofs);
        put_i32(out, self.filelen);
    }
}

impl Lump {
    /// Borrow this lump's bytes out of the whole file, rejecting
    /// directory entries that point outside it.
    pub(crate) fn slice<'a>(&self, file: &'a [u8], name: &'static str) -> BspResult<&'a [u8]> {
        let err = || BspError::TruncatedFile {
            lump: name,
            offset: self.fileofs as usize,
            length: self.filelen as usize,
            file_size: file.len(),
        };
        if self.fileofs < 0 || self.filelen < 0 {
            return Err(err());
        }
        let (ofs, len) = (self.fileofs as usize, self.filelen as usize);
        let end = ofs.checked_add(len).ok_or_else(err)?;
        if end > file.len() {
            return Err(err());
        }
        Ok(&file[ofs..end])
    }

    /// Byte offset one past the end of this lump's data.
    pub(crate) fn end(&self) -> usize {
        self.fileofs.max(0) as usize + self.filelen.max(0) as usize
    }
}

// ============================================================
// Upper design bounds
// ============================================================
// The classic fixed array sizes the original tools allocated. The
// extended formats have no fixed bounds; these only feed diagnostics.

// Quake family
pub const MAX_MAP_HULLS_Q1: usize = 4;
pub const MAX_MAP_HULLS_H2: usize = 8;
pub const MAX_MAP_MODELS: usize = 256;
pub const MAX_MAP_PLANES: usize = 32767;
pub const MAX_MAP_NODES: usize = 32767;
pub const MAX_MAP_CLIPNODES: usize = 32767;
pub const MAX_MAP_LEAFS: usize = 8192;
pub const MAX_MAP_VERTS: usize = 65535;
pub const MAX_MAP_FACES: usize = 65535;
pub const MAX_MAP_MARKSURFACES: usize = 65535;
pub const MAX_MAP_TEXINFO: usize = 4096;
pub const MAX_MAP_EDGES: usize = 256000;
pub const MAX_MAP_SURFEDGES: usize = 512000;
pub const MAX_MAP_ENTSTRING: usize = 65536;
pub const MAX_MAP_MIPTEX: usize = 0x200000;
pub const MAX_MAP_LIGHTING: usize = 0x100000;
pub const MAX_MAP_VISIBILITY: usize = 0x100000;

// Quake II family
pub const Q2_MAX_MAP_MODELS: usize = 1024;
pub const Q2_MAX_MAP_BRUSHES: usize = 8192;
pub const Q2_MAX_MAP_ENTSTRING: usize = 0x40000;
pub const Q2_MAX_MAP_TEXINFO: usize = 8192;
pub const Q2_MAX_MAP_AREAS: usize = 256;
pub const Q2_MAX_MAP_AREAPORTALS: usize = 1024;
pub const Q2_MAX_MAP_PLANES: usize = 65536;
pub const Q2_MAX_MAP_NODES: usize = 65536;
pub const Q2_MAX_MAP_BRUSHSIDES: usize = 65536;
pub const Q2_MAX_MAP_LEAFS: usize = 65536;
pub const Q2_MAX_MAP_VERTS: usize = 65536;
pub const Q2_MAX_MAP_FACES: usize = 65536;
pub const Q2_MAX_MAP_LEAFFACES: usize = 65536;
pub const Q2_MAX_MAP_LEAFBRUSHES: usize = 65536;
pub const Q2_MAX_MAP_EDGES: usize = 128000;
pub const Q2_MAX_MAP_SURFEDGES: usize = 256000;
pub const Q2_MAX_MAP_LIGHTING: usize = 0x200000;
pub const Q2_MAX_MAP_VISIBILITY: usize = 0x100000;

pub const MAXLIGHTMAPS: usize = 4;

// Ambient sound channels stored per leaf in the Quake family.
pub const AMBIENT_WATER: usize = 0;
pub const AMBIENT_SKY: usize = 1;
pub const AMBIENT_SLIME: usize = 2;
pub const AMBIENT_LAVA: usize = 3;
pub const NUM_AMBIENTS: usize = 4;

// ============================================================
// Disk records shared across formats
// ============================================================

// Plane types
pub const PLANE_X: i32 = 0;
pub const PLANE_Y: i32 = 1;
pub const PLANE_Z: i32 = 2;
pub const PLANE_ANYX: i32 = 3;
pub const PLANE_ANYY: i32 = 4;
pub const PLANE_ANYZ: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct DPlane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: i32,
}

impl LumpRecord for DPlane {
    const DISK_SIZE: usize = 20;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DPlane {
            normal: r.read_vec3()?,
            dist: r.read_f32()?,
            plane_type: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_vec3(out, &self.normal);
        put_f32(out, self.dist);
        put_i32(out, self.plane_type);
    }
}

/// Two rows of [x y z offset]; projects a world position to texture
/// coordinates. Row-major on disk in every format that stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TexVecs(pub [[f32; 4]; 2]);

impl TexVecs {
    pub fn uvs(&self, pos: &Vec3) -> [f32; 2] {
        let row = |r: &[f32; 4]| pos[0] * r[0] + pos[1] * r[1] + pos[2] * r[2] + r[3];
        [row(&self.0[0]), row(&self.0[1])]
    }

    pub fn uvs_normalized(&self, pos: &Vec3, width: i32, height: i32) -> [f32; 2] {
        let [u, v] = self.uvs(pos);
        [u / width as f32, v / height as f32]
    }

    pub(crate) fn read(r: &mut BspReader) -> BspResult<Self> {
        let mut rows = [[0.0f32; 4]; 2];
        for row in &mut rows {
            for v in row.iter_mut() {
                *v = r.read_f32()?;
            }
        }
        Ok(TexVecs(rows))
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        for row in &self.0 {
            for v in row {
                put_f32(out, *v);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct DVertex {
    pub point: Vec3,
}

impl LumpRecord for DVertex {
    const DISK_SIZE: usize = 12;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DVertex {
            point: r.read_vec3()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_vec3(out, &self.point);
    }
}

/// Edge with 16-bit vertex indices (bsp29 and Quake II).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DEdge {
    pub v: [u16; 2],
}

impl LumpRecord for DEdge {
    const DISK_SIZE: usize = 4;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DEdge {
            v: [r.read_u16()?, r.read_u16()?],
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.v[0]);
        put_u16(out, self.v[1]);
    }
}

/// Edge with 32-bit vertex indices (extended formats).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DEdge32 {
    pub v: [u32; 2],
}

impl LumpRecord for DEdge32 {
    const DISK_SIZE: usize = 8;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DEdge32 {
            v: [r.read_u32()?, r.read_u32()?],
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u32(out, self.v[0]);
        put_u32(out, self.v[1]);
    }
}

impl From<&DEdge> for DEdge32 {
    fn from(e: &DEdge) -> Self {
        DEdge32 {
            v: [e.v[0] as u32, e.v[1] as u32],
        }
    }
}

impl TryFrom<&DEdge32> for DEdge {
    type Error = BspError;

    fn try_from(e: &DEdge32) -> BspResult<Self> {
        Ok(DEdge {
            v: [
                numeric_cast_u16(e.v[0] as i64, "DEdge::v")?,
                numeric_cast_u16(e.v[1] as i64, "DEdge::v")?,
            ],
        })
    }
}

/// Quake II brush; identical record in base and Qbism formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DBrush {
    pub firstside: i32,
    pub numsides: i32,
    pub contents: i32,
}

impl LumpRecord for DBrush {
    const DISK_SIZE: usize = 12;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DBrush {
            firstside: r.read_i32()?,
            numsides: r.read_i32()?,
            contents: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.firstside);
        put_i32(out, self.numsides);
        put_i32(out, self.contents);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DAreaPortal {
    pub portalnum: i32,
    pub otherarea: i32,
}

impl LumpRecord for DAreaPortal {
    const DISK_SIZE: usize = 8;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DAreaPortal {
            portalnum: r.read_i32()?,
            otherarea: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.portalnum);
        put_i32(out, self.otherarea);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DArea {
    pub numareaportals: i32,
    pub firstareaportal: i32,
}

impl LumpRecord for DArea {
    const DISK_SIZE: usize = 8;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DArea {
            numareaportals: r.read_i32()?,
            firstareaportal: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.numareaportals);
        put_i32(out, self.firstareaportal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    // =========================================================================
    // Struct size verification for binary-layout-critical structs
    // =========================================================================

    #[test]
    fn size_of_lump() {
        // 2 x i32 = 8 bytes
        assert_eq!(size_of::<Lump>(), Lump::DISK_SIZE);
    }

    #[test]
    fn size_of_dplane() {
        // 3*4 + 4 + 4 = 20 bytes
        assert_eq!(size_of::<DPlane>(), DPlane::DISK_SIZE);
    }

    #[test]
    fn size_of_dvertex() {
        assert_eq!(size_of::<DVertex>(), DVertex::DISK_SIZE);
    }

    #[test]
    fn size_of_edges() {
        assert_eq!(size_of::<DEdge>(), DEdge::DISK_SIZE);
        assert_eq!(size_of::<DEdge32>(), DEdge32::DISK_SIZE);
    }

    #[test]
    fn size_of_q2_records() {
        assert_eq!(size_of::<DBrush>(), DBrush::DISK_SIZE);
        assert_eq!(size_of::<DArea>(), DArea::DISK_SIZE);
        assert_eq!(size_of::<DAreaPortal>(), DAreaPortal::DISK_SIZE);
    }

    // =========================================================================
    // Magic constants
    // =========================================================================

    #[test]
    fn bsp_header_magics() {
        assert_eq!(&IDBSPHEADER.to_le_bytes(), b"IBSP");
        assert_eq!(&QBISMHEADER.to_le_bytes(), b"QBSP");
        assert_eq!(&BSP2VERSION.to_le_bytes(), b"BSP2");
        assert_eq!(&BSP2RMQVERSION.to_le_bytes(), b"2PSB");
        assert_eq!(&MBSPIDENT.to_le_bytes(), b"MBSP");
        assert_eq!(BSPVERSION, 29);
        assert_eq!(BSPHLVERSION, 30);
        assert_eq!(Q2_BSPVERSION, 38);
    }

    #[test]
    fn test_ident_name() {
        assert_eq!(ident_name(IDBSPHEADER), "IBSP");
        assert_eq!(ident_name(BSP2RMQVERSION), "2PSB");
        assert_eq!(ident_name(29), "....");
    }

    #[test]
    fn test_texvec_projection() {
        let tv = TexVecs([[1.0, 0.0, 0.0, 8.0], [0.0, 0.0, -1.0, 0.0]]);
        assert_eq!(tv.uvs(&[16.0, 99.0, 32.0]), [24.0, -32.0]);
        assert_eq!(tv.uvs_normalized(&[16.0, 99.0, 32.0], 64, 64), [0.375, -0.5]);
    }

    #[test]
    fn test_plane_roundtrip() {
        let plane = DPlane {
            normal: [0.0, 0.0, 1.0],
            dist: 128.0,
            plane_type: PLANE_Z,
        };
        let mut buf = Vec::new();
        plane.write(&mut buf);
        assert_eq!(buf.len(), DPlane::DISK_SIZE);
        let back = DPlane::read(&mut BspReader::new(&buf)).unwrap();
        assert_eq!(back, plane);
    }

    #[test]
    fn test_entdata_codec() {
        assert_eq!(entdata_from_bytes(b"{ }\0"), "{ }");
        assert_eq!(entdata_from_bytes(b"{ }\0\0\0"), "{ }");
        // missing terminator is tolerated
        assert_eq!(entdata_from_bytes(b"{ }"), "{ }");
        assert_eq!(entdata_to_bytes("{ }"), b"{ }\0");
    }
}
