// bspfile_q1.rs - Quake-family disk records and documents
//
// Three tiers share one lump table: the classic bsp29, the BSP2-RMQ
// interim format (32-bit counts, 16-bit bounds), and BSP2. Hexen II and
// Half-Life ride the same shells; only the models record (Hexen II) and
// the header version (Half-Life) differ.

use crate::bspfile_generic::{MBsp, MClipnode, MFace, MLeaf, MModel, MNode, MTexinfo};
use crate::contentflags::SurfFlags;
use crate::error::{BspError, BspResult};
use crate::q_shared::{
    bounds_ceil_i16, bounds_floor_i16, bounds_widen, numeric_cast_i16, numeric_cast_i32,
    numeric_cast_u16,
};
use crate::qfiles::{
    entdata_from_bytes, entdata_to_bytes, DEdge, DEdge32, DPlane, DVertex, Lump, TexVecs,
    LUMP_CLIPNODES, LUMP_EDGES, LUMP_ENTITIES, LUMP_FACES, LUMP_LEAFS, LUMP_LIGHTING,
    LUMP_MARKSURFACES, LUMP_MODELS, LUMP_NODES, LUMP_PLANES, LUMP_SURFEDGES, LUMP_TEXINFO,
    LUMP_TEXTURES, LUMP_VERTEXES, LUMP_VISIBILITY, MAXLIGHTMAPS, MAX_MAP_HULLS_H2,
    MAX_MAP_HULLS_Q1, NUM_AMBIENTS, Q1_HEADER_LUMPS,
};
use crate::stream::{
    parse_records, put_i16, put_i16_vec3, put_i32, put_u16, put_u32, put_u8, put_vec3,
    write_records, BspReader, LumpRecord,
};

// ============================================================
// Texinfo (shared by all three tiers)
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct DTexinfoQ1 {
    pub vecs: TexVecs,
    pub miptex: i32,
    pub flags: i32,
}

impl LumpRecord for DTexinfoQ1 {
    const DISK_SIZE: usize = 40;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DTexinfoQ1 {
            vecs: TexVecs::read(r)?,
            miptex: r.read_i32()?,
            flags: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.vecs.write(out);
        put_i32(out, self.miptex);
        put_i32(out, self.flags);
    }
}

impl From<&DTexinfoQ1> for MTexinfo {
    fn from(t: &DTexinfoQ1) -> Self {
        MTexinfo {
            vecs: t.vecs,
            flags: SurfFlags::from_native(t.flags),
            miptex: t.miptex,
            ..MTexinfo::default()
        }
    }
}

impl From<&MTexinfo> for DTexinfoQ1 {
    fn from(t: &MTexinfo) -> Self {
        // only the native bits survive; the extended surface fields are
        // compile-time state and have no on-disk home in this family
        DTexinfoQ1 {
            vecs: t.vecs,
            miptex: t.miptex,
            flags: t.flags.native,
        }
    }
}

// ============================================================
// bsp29 records
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DNode29 {
    pub planenum: i32,
    /// Negative children are -(leafnum + 1).
    pub children: [i16; 2],
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub firstface: u16,
    pub numfaces: u16,
}

impl LumpRecord for DNode29 {
    const DISK_SIZE: usize = 24;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DNode29 {
            planenum: r.read_i32()?,
            children: [r.read_i16()?, r.read_i16()?],
            mins: r.read_i16_vec3()?,
            maxs: r.read_i16_vec3()?,
            firstface: r.read_u16()?,
            numfaces: r.read_u16()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.planenum);
        put_i16(out, self.children[0]);
        put_i16(out, self.children[1]);
        put_i16_vec3(out, &self.mins);
        put_i16_vec3(out, &self.maxs);
        put_u16(out, self.firstface);
        put_u16(out, self.numfaces);
    }
}

impl From<&DNode29> for MNode {
    fn from(n: &DNode29) -> Self {
        MNode {
            planenum: n.planenum,
            children: [n.children[0] as i32, n.children[1] as i32],
            mins: bounds_widen(&n.mins),
            maxs: bounds_widen(&n.maxs),
            firstface: n.firstface as u32,
            numfaces: n.numfaces as u32,
        }
    }
}

impl TryFrom<&MNode> for DNode29 {
    type Error = BspError;

    fn try_from(n: &MNode) -> BspResult<Self> {
        Ok(DNode29 {
            planenum: n.planenum,
            children: [
                numeric_cast_i16(n.children[0] as i64, "DNode29::children")?,
                numeric_cast_i16(n.children[1] as i64, "DNode29::children")?,
            ],
            mins: bounds_floor_i16(&n.mins, "DNode29::mins")?,
            maxs: bounds_ceil_i16(&n.maxs, "DNode29::maxs")?,
            firstface: numeric_cast_u16(n.firstface as i64, "DNode29::firstface")?,
            numfaces: numeric_cast_u16(n.numfaces as i64, "DNode29::numfaces")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DFace29 {
    pub planenum: i16,
    pub side: i16,
    pub firstedge: i32,
    pub numedges: i16,
    pub texinfo: i16,
    pub styles: [u8; MAXLIGHTMAPS],
    pub lightofs: i32,
}

impl LumpRecord for DFace29 {
    const DISK_SIZE: usize = 20;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DFace29 {
            planenum: r.read_i16()?,
            side: r.read_i16()?,
            firstedge: r.read_i32()?,
            numedges: r.read_i16()?,
            texinfo: r.read_i16()?,
            styles: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
            lightofs: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i16(out, self.planenum);
        put_i16(out, self.side);
        put_i32(out, self.firstedge);
        put_i16(out, self.numedges);
        put_i16(out, self.texinfo);
        for s in self.styles {
            put_u8(out, s);
        }
        put_i32(out, self.lightofs);
    }
}

impl From<&DFace29> for MFace {
    fn from(f: &DFace29) -> Self {
        MFace {
            planenum: f.planenum as u16 as u32,
            side: f.side as i32,
            firstedge: f.firstedge,
            numedges: f.numedges as i32,
            texinfo: f.texinfo as i32,
            styles: f.styles,
            lightofs: f.lightofs,
        }
    }
}

impl TryFrom<&MFace> for DFace29 {
    type Error = BspError;

    fn try_from(f: &MFace) -> BspResult<Self> {
        Ok(DFace29 {
            planenum: numeric_cast_i16(f.planenum as i64, "DFace29::planenum")?,
            side: numeric_cast_i16(f.side as i64, "DFace29::side")?,
            firstedge: f.firstedge,
            numedges: numeric_cast_i16(f.numedges as i64, "DFace29::numedges")?,
            texinfo: numeric_cast_i16(f.texinfo as i64, "DFace29::texinfo")?,
            styles: f.styles,
            lightofs: f.lightofs,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DClipnode29 {
    pub planenum: i32,
    /// Negative children are content values.
    pub children: [i16; 2],
}

impl LumpRecord for DClipnode29 {
    const DISK_SIZE: usize = 8;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DClipnode29 {
            planenum: r.read_i32()?,
            children: [r.read_i16()?, r.read_i16()?],
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.planenum);
        put_i16(out, self.children[0]);
        put_i16(out, self.children[1]);
    }
}

impl From<&DClipnode29> for MClipnode {
    fn from(c: &DClipnode29) -> Self {
        MClipnode {
            planenum: c.planenum,
            children: [c.children[0] as i32, c.children[1] as i32],
        }
    }
}

impl TryFrom<&MClipnode> for DClipnode29 {
    type Error = BspError;

    fn try_from(c: &MClipnode) -> BspResult<Self> {
        Ok(DClipnode29 {
            planenum: c.planenum,
            children: [
                numeric_cast_i16(c.children[0] as i64, "DClipnode29::children")?,
                numeric_cast_i16(c.children[1] as i64, "DClipnode29::children")?,
            ],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DLeaf29 {
    pub contents: i32,
    pub visofs: i32,
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub firstmarksurface: u16,
    pub nummarksurfaces: u16,
    pub ambient_level: [u8; NUM_AMBIENTS],
}

impl LumpRecord for DLeaf29 {
    const DISK_SIZE: usize = 28;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DLeaf29 {
            contents: r.read_i32()?,
            visofs: r.read_i32()?,
            mins: r.read_i16_vec3()?,
            maxs: r.read_i16_vec3()?,
            firstmarksurface: r.read_u16()?,
            nummarksurfaces: r.read_u16()?,
            ambient_level: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.contents);
        put_i32(out, self.visofs);
        put_i16_vec3(out, &self.mins);
        put_i16_vec3(out, &self.maxs);
        put_u16(out, self.firstmarksurface);
        put_u16(out, self.nummarksurfaces);
        for a in self.ambient_level {
            put_u8(out, a);
        }
    }
}

impl From<&DLeaf29> for MLeaf {
    fn from(l: &DLeaf29) -> Self {
        MLeaf {
            contents: l.contents,
            visofs: l.visofs,
            mins: bounds_widen(&l.mins),
            maxs: bounds_widen(&l.maxs),
            firstmarksurface: l.firstmarksurface as u32,
            nummarksurfaces: l.nummarksurfaces as u32,
            ambient_level: l.ambient_level,
            ..MLeaf::default()
        }
    }
}

impl TryFrom<&MLeaf> for DLeaf29 {
    type Error = BspError;

    fn try_from(l: &MLeaf) -> BspResult<Self> {
        Ok(DLeaf29 {
            contents: l.contents,
            visofs: l.visofs,
            mins: bounds_floor_i16(&l.mins, "DLeaf29::mins")?,
            maxs: bounds_ceil_i16(&l.maxs, "DLeaf29::maxs")?,
            firstmarksurface: numeric_cast_u16(
                l.firstmarksurface as i64,
                "DLeaf29::firstmarksurface",
            )?,
            nummarksurfaces: numeric_cast_u16(
                l.nummarksurfaces as i64,
                "DLeaf29::nummarksurfaces",
            )?,
            ambient_level: l.ambient_level,
        })
    }
}

// ============================================================
// BSP2-RMQ records (32-bit counts, bounds still 16-bit)
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DNode2Rmq {
    pub planenum: i32,
    pub children: [i32; 2],
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub firstface: u32,
    pub numfaces: u32,
}

impl LumpRecord for DNode2Rmq {
    const DISK_SIZE: usize = 32;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DNode2Rmq {
            planenum: r.read_i32()?,
            children: [r.read_i32()?, r.read_i32()?],
            mins: r.read_i16_vec3()?,
            maxs: r.read_i16_vec3()?,
            firstface: r.read_u32()?,
            numfaces: r.read_u32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.planenum);
        put_i32(out, self.children[0]);
        put_i32(out, self.children[1]);
        put_i16_vec3(out, &self.mins);
        put_i16_vec3(out, &self.maxs);
        put_u32(out, self.firstface);
        put_u32(out, self.numfaces);
    }
}

impl From<&DNode2Rmq> for MNode {
    fn from(n: &DNode2Rmq) -> Self {
        MNode {
            planenum: n.planenum,
            children: n.children,
            mins: bounds_widen(&n.mins),
            maxs: bounds_widen(&n.maxs),
            firstface: n.firstface,
            numfaces: n.numfaces,
        }
    }
}

impl TryFrom<&MNode> for DNode2Rmq {
    type Error = BspError;

    fn try_from(n: &MNode) -> BspResult<Self> {
        Ok(DNode2Rmq {
            planenum: n.planenum,
            children: n.children,
            mins: bounds_floor_i16(&n.mins, "DNode2Rmq::mins")?,
            maxs: bounds_ceil_i16(&n.maxs, "DNode2Rmq::maxs")?,
            firstface: n.firstface,
            numfaces: n.numfaces,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DLeaf2Rmq {
    pub contents: i32,
    pub visofs: i32,
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub firstmarksurface: u32,
    pub nummarksurfaces: u32,
    pub ambient_level: [u8; NUM_AMBIENTS],
}

impl LumpRecord for DLeaf2Rmq {
    const DISK_SIZE: usize = 32;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DLeaf2Rmq {
            contents: r.read_i32()?,
            visofs: r.read_i32()?,
            mins: r.read_i16_vec3()?,
            maxs: r.read_i16_vec3()?,
            firstmarksurface: r.read_u32()?,
            nummarksurfaces: r.read_u32()?,
            ambient_level: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.contents);
        put_i32(out, self.visofs);
        put_i16_vec3(out, &self.mins);
        put_i16_vec3(out, &self.maxs);
        put_u32(out, self.firstmarksurface);
        put_u32(out, self.nummarksurfaces);
        for a in self.ambient_level {
            put_u8(out, a);
        }
    }
}

impl From<&DLeaf2Rmq> for MLeaf {
    fn from(l: &DLeaf2Rmq) -> Self {
        MLeaf {
            contents: l.contents,
            visofs: l.visofs,
            mins: bounds_widen(&l.mins),
            maxs: bounds_widen(&l.maxs),
            firstmarksurface: l.firstmarksurface,
            nummarksurfaces: l.nummarksurfaces,
            ambient_level: l.ambient_level,
            ..MLeaf::default()
        }
    }
}

impl TryFrom<&MLeaf> for DLeaf2Rmq {
    type Error = BspError;

    fn try_from(l: &MLeaf) -> BspResult<Self> {
        Ok(DLeaf2Rmq {
            contents: l.contents,
            visofs: l.visofs,
            mins: bounds_floor_i16(&l.mins, "DLeaf2Rmq::mins")?,
            maxs: bounds_ceil_i16(&l.maxs, "DLeaf2Rmq::maxs")?,
            firstmarksurface: l.firstmarksurface,
            nummarksurfaces: l.nummarksurfaces,
            ambient_level: l.ambient_level,
        })
    }
}

// ============================================================
// BSP2 records (everything 32-bit, float bounds)
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct DNode2 {
    pub planenum: i32,
    pub children: [i32; 2],
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub firstface: u32,
    pub numfaces: u32,
}

impl LumpRecord for DNode2 {
    const DISK_SIZE: usize = 44;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DNode2 {
            planenum: r.read_i32()?,
            children: [r.read_i32()?, r.read_i32()?],
            mins: r.read_vec3()?,
            maxs: r.read_vec3()?,
            firstface: r.read_u32()?,
            numfaces: r.read_u32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.planenum);
        put_i32(out, self.children[0]);
        put_i32(out, self.children[1]);
        put_vec3(out, &self.mins);
        put_vec3(out, &self.maxs);
        put_u32(out, self.firstface);
        put_u32(out, self.numfaces);
    }
}

impl From<&DNode2> for MNode {
    fn from(n: &DNode2) -> Self {
        MNode {
            planenum: n.planenum,
            children: n.children,
            mins: n.mins,
            maxs: n.maxs,
            firstface: n.firstface,
            numfaces: n.numfaces,
        }
    }
}

impl From<&MNode> for DNode2 {
    fn from(n: &MNode) -> Self {
        DNode2 {
            planenum: n.planenum,
            children: n.children,
            mins: n.mins,
            maxs: n.maxs,
            firstface: n.firstface,
            numfaces: n.numfaces,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DFace2 {
    pub planenum: i32,
    pub side: i32,
    pub firstedge: i32,
    pub numedges: i32,
    pub texinfo: i32,
    pub styles: [u8; MAXLIGHTMAPS],
    pub lightofs: i32,
}

impl LumpRecord for DFace2 {
    const DISK_SIZE: usize = 28;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DFace2 {
            planenum: r.read_i32()?,
            side: r.read_i32()?,
            firstedge: r.read_i32()?,
            numedges: r.read_i32()?,
            texinfo: r.read_i32()?,
            styles: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
            lightofs: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.planenum);
        put_i32(out, self.side);
        put_i32(out, self.firstedge);
        put_i32(out, self.numedges);
        put_i32(out, self.texinfo);
        for s in self.styles {
            put_u8(out, s);
        }
        put_i32(out, self.lightofs);
    }
}

impl From<&DFace2> for MFace {
    fn from(f: &DFace2) -> Self {
        MFace {
            planenum: f.planenum as u32,
            side: f.side,
            firstedge: f.firstedge,
            numedges: f.numedges,
            texinfo: f.texinfo,
            styles: f.styles,
            lightofs: f.lightofs,
        }
    }
}

impl TryFrom<&MFace> for DFace2 {
    type Error = BspError;

    fn try_from(f: &MFace) -> BspResult<Self> {
        Ok(DFace2 {
            planenum: numeric_cast_i32(f.planenum as i64, "DFace2::planenum")?,
            side: f.side,
            firstedge: f.firstedge,
            numedges: f.numedges,
            texinfo: f.texinfo,
            styles: f.styles,
            lightofs: f.lightofs,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DClipnode2 {
    pub planenum: i32,
    pub children: [i32; 2],
}

impl LumpRecord for DClipnode2 {
    const DISK_SIZE: usize = 12;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DClipnode2 {
            planenum: r.read_i32()?,
            children: [r.read_i32()?, r.read_i32()?],
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.planenum);
        put_i32(out, self.children[0]);
        put_i32(out, self.children[1]);
    }
}

impl From<&DClipnode2> for MClipnode {
    fn from(c: &DClipnode2) -> Self {
        MClipnode {
            planenum: c.planenum,
            children: c.children,
        }
    }
}

impl From<&MClipnode> for DClipnode2 {
    fn from(c: &MClipnode) -> Self {
        DClipnode2 {
            planenum: c.planenum,
            children: c.children,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct DLeaf2 {
    pub contents: i32,
    pub visofs: i32,
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub firstmarksurface: u32,
    pub nummarksurfaces: u32,
    pub ambient_level: [u8; NUM_AMBIENTS],
}

impl LumpRecord for DLeaf2 {
    const DISK_SIZE: usize = 44;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DLeaf2 {
            contents: r.read_i32()?,
            visofs: r.read_i32()?,
            mins: r.read_vec3()?,
            maxs: r.read_vec3()?,
            firstmarksurface: r.read_u32()?,
            nummarksurfaces: r.read_u32()?,
            ambient_level: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.contents);
        put_i32(out, self.visofs);
        put_vec3(out, &self.mins);
        put_vec3(out, &self.maxs);
        put_u32(out, self.firstmarksurface);
        put_u32(out, self.nummarksurfaces);
        for a in self.ambient_level {
            put_u8(out, a);
        }
    }
}

impl From<&DLeaf2> for MLeaf {
    fn from(l: &DLeaf2) -> Self {
        MLeaf {
            contents: l.contents,
            visofs: l.visofs,
            mins: l.mins,
            maxs: l.maxs,
            firstmarksurface: l.firstmarksurface,
            nummarksurfaces: l.nummarksurfaces,
            ambient_level: l.ambient_level,
            ..MLeaf::default()
        }
    }
}

impl From<&MLeaf> for DLeaf2 {
    fn from(l: &MLeaf) -> Self {
        DLeaf2 {
            contents: l.contents,
            visofs: l.visofs,
            mins: l.mins,
            maxs: l.maxs,
            firstmarksurface: l.firstmarksurface,
            nummarksurfaces: l.nummarksurfaces,
            ambient_level: l.ambient_level,
        }
    }
}

// ============================================================
// Models
// ============================================================

pub const DMODEL_Q1_SIZE: usize = 64;
pub const DMODEL_H2_SIZE: usize = 80;

/// Parse the models lump. The record is 64 bytes with four hull roots,
/// or 80 bytes with eight for Hexen II; the lump length is the only
/// thing that tells the two apart.
pub(crate) fn parse_models(bytes: &[u8], hexen2: bool) -> BspResult<Vec<MModel>> {
    let (stride, hulls) = if hexen2 {
        (DMODEL_H2_SIZE, MAX_MAP_HULLS_H2)
    } else {
        (DMODEL_Q1_SIZE, MAX_MAP_HULLS_Q1)
    };
    if !bytes.len().is_multiple_of(stride) {
        return Err(BspError::LumpSizeMismatch {
            lump: "models",
            length: bytes.len(),
            record_size: stride,
        });
    }

    let mut r = BspReader::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() / stride);
    for _ in 0..bytes.len() / stride {
        let mut model = MModel {
            mins: r.read_vec3()?,
            maxs: r.read_vec3()?,
            origin: r.read_vec3()?,
            ..MModel::default()
        };
        for h in 0..hulls {
            model.headnode[h] = r.read_i32()?;
        }
        model.visleafs = r.read_i32()?;
        model.firstface = r.read_i32()?;
        model.numfaces = r.read_i32()?;
        out.push(model);
    }
    Ok(out)
}

pub(crate) fn write_models(models: &[MModel], hexen2: bool, out: &mut Vec<u8>) {
    let hulls = if hexen2 {
        MAX_MAP_HULLS_H2
    } else {
        MAX_MAP_HULLS_Q1
    };
    for model in models {
        put_vec3(out, &model.mins);
        put_vec3(out, &model.maxs);
        put_vec3(out, &model.origin);
        for h in 0..hulls {
            put_i32(out, model.headnode[h]);
        }
        put_i32(out, model.visleafs);
        put_i32(out, model.firstface);
        put_i32(out, model.numfaces);
    }
}

// ============================================================
// Documents
// ============================================================

macro_rules! q1_parse_body {
    ($doc:ident, $file:ident, $lumps:ident, $hexen2:ident,
     node: $node:ty, face: $face:ty, clip: $clip:ty, leaf: $leaf:ty, mark: $mark:ty, edge: $edge:ty) => {
        Ok($doc {
            dentdata: entdata_from_bytes($lumps[LUMP_ENTITIES].slice($file, "entities")?),
            dplanes: parse_records("planes", $lumps[LUMP_PLANES].slice($file, "planes")?)?,
            dtexdata: $lumps[LUMP_TEXTURES].slice($file, "textures")?.to_vec(),
            dvertexes: parse_records("vertexes", $lumps[LUMP_VERTEXES].slice($file, "vertexes")?)?,
            dvisdata: $lumps[LUMP_VISIBILITY].slice($file, "visibility")?.to_vec(),
            dnodes: parse_records::<$node>("nodes", $lumps[LUMP_NODES].slice($file, "nodes")?)?,
            texinfo: parse_records("texinfo", $lumps[LUMP_TEXINFO].slice($file, "texinfo")?)?,
            dfaces: parse_records::<$face>("faces", $lumps[LUMP_FACES].slice($file, "faces")?)?,
            dlightdata: $lumps[LUMP_LIGHTING].slice($file, "lighting")?.to_vec(),
            dclipnodes: parse_records::<$clip>(
                "clipnodes",
                $lumps[LUMP_CLIPNODES].slice($file, "clipnodes")?,
            )?,
            dleafs: parse_records::<$leaf>("leafs", $lumps[LUMP_LEAFS].slice($file, "leafs")?)?,
            dmarksurfaces: parse_records::<$mark>(
                "marksurfaces",
                $lumps[LUMP_MARKSURFACES].slice($file, "marksurfaces")?,
            )?,
            dedges: parse_records::<$edge>("edges", $lumps[LUMP_EDGES].slice($file, "edges")?)?,
            dsurfedges: parse_records("surfedges", $lumps[LUMP_SURFEDGES].slice($file, "surfedges")?)?,
            dmodels: parse_models($lumps[LUMP_MODELS].slice($file, "models")?, $hexen2)?,
        })
    };
}

/// Classic Quake / Half-Life / Hexen II document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Bsp29 {
    pub dmodels: Vec<MModel>,
    pub dvisdata: Vec<u8>,
    pub dlightdata: Vec<u8>,
    pub dtexdata: Vec<u8>,
    pub dentdata: String,
    pub dleafs: Vec<DLeaf29>,
    pub dplanes: Vec<DPlane>,
    pub dvertexes: Vec<DVertex>,
    pub dnodes: Vec<DNode29>,
    pub texinfo: Vec<DTexinfoQ1>,
    pub dfaces: Vec<DFace29>,
    pub dclipnodes: Vec<DClipnode29>,
    pub dedges: Vec<DEdge>,
    pub dmarksurfaces: Vec<u16>,
    pub dsurfedges: Vec<i32>,
}

impl Bsp29 {
    pub(crate) fn parse(file: &[u8], lumps: &[Lump], hexen2: bool) -> BspResult<Self> {
        q1_parse_body!(Bsp29, file, lumps, hexen2,
            node: DNode29, face: DFace29, clip: DClipnode29, leaf: DLeaf29, mark: u16, edge: DEdge)
    }

    pub(crate) fn serialize_lumps(&self, hexen2: bool) -> Vec<Vec<u8>> {
        let mut lumps = vec![Vec::new(); Q1_HEADER_LUMPS];
        lumps[LUMP_ENTITIES] = entdata_to_bytes(&self.dentdata);
        write_records(&self.dplanes, &mut lumps[LUMP_PLANES]);
        lumps[LUMP_TEXTURES] = self.dtexdata.clone();
        write_records(&self.dvertexes, &mut lumps[LUMP_VERTEXES]);
        lumps[LUMP_VISIBILITY] = self.dvisdata.clone();
        write_records(&self.dnodes, &mut lumps[LUMP_NODES]);
        write_records(&self.texinfo, &mut lumps[LUMP_TEXINFO]);
        write_records(&self.dfaces, &mut lumps[LUMP_FACES]);
        lumps[LUMP_LIGHTING] = self.dlightdata.clone();
        write_records(&self.dclipnodes, &mut lumps[LUMP_CLIPNODES]);
        write_records(&self.dleafs, &mut lumps[LUMP_LEAFS]);
        write_records(&self.dmarksurfaces, &mut lumps[LUMP_MARKSURFACES]);
        write_records(&self.dedges, &mut lumps[LUMP_EDGES]);
        write_records(&self.dsurfedges, &mut lumps[LUMP_SURFEDGES]);
        write_models(&self.dmodels, hexen2, &mut lumps[LUMP_MODELS]);
        lumps
    }

    pub fn to_mbsp(&self) -> MBsp {
        MBsp {
            dmodels: self.dmodels.clone(),
            dvisdata: self.dvisdata.clone(),
            dlightdata: self.dlightdata.clone(),
            dtexdata: self.dtexdata.clone(),
            dentdata: self.dentdata.clone(),
            dleafs: self.dleafs.iter().map(MLeaf::from).collect(),
            dplanes: self.dplanes.clone(),
            dvertexes: self.dvertexes.clone(),
            dnodes: self.dnodes.iter().map(MNode::from).collect(),
            texinfo: self.texinfo.iter().map(MTexinfo::from).collect(),
            dfaces: self.dfaces.iter().map(MFace::from).collect(),
            dclipnodes: self.dclipnodes.iter().map(MClipnode::from).collect(),
            dedges: self.dedges.iter().map(DEdge32::from).collect(),
            dmarksurfaces: self.dmarksurfaces.iter().map(|&m| m as u32).collect(),
            dsurfedges: self.dsurfedges.clone(),
            ..MBsp::default()
        }
    }

    pub fn from_mbsp(mbsp: &MBsp) -> BspResult<Self> {
        Ok(Bsp29 {
            dmodels: mbsp.dmodels.clone(),
            dvisdata: mbsp.dvisdata.clone(),
            dlightdata: mbsp.dlightdata.clone(),
            dtexdata: mbsp.dtexdata.clone(),
            dentdata: mbsp.dentdata.clone(),
            dleafs: mbsp
                .dleafs
                .iter()
                .map(DLeaf29::try_from)
                .collect::<BspResult<_>>()?,
            dplanes: mbsp.dplanes.clone(),
            dvertexes: mbsp.dvertexes.clone(),
            dnodes: mbsp
                .dnodes
                .iter()
                .map(DNode29::try_from)
                .collect::<BspResult<_>>()?,
            texinfo: mbsp.texinfo.iter().map(DTexinfoQ1::from).collect(),
            dfaces: mbsp
                .dfaces
                .iter()
                .map(DFace29::try_from)
                .collect::<BspResult<_>>()?,
            dclipnodes: mbsp
                .dclipnodes
                .iter()
                .map(DClipnode29::try_from)
                .collect::<BspResult<_>>()?,
            dedges: mbsp
                .dedges
                .iter()
                .map(DEdge::try_from)
                .collect::<BspResult<_>>()?,
            dmarksurfaces: mbsp
                .dmarksurfaces
                .iter()
                .map(|&m| numeric_cast_u16(m as i64, "marksurfaces"))
                .collect::<BspResult<_>>()?,
            dsurfedges: mbsp.dsurfedges.clone(),
        })
    }
}

/// BSP2-RMQ document (the interim "2PSB" format).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Bsp2Rmq {
    pub dmodels: Vec<MModel>,
    pub dvisdata: Vec<u8>,
    pub dlightdata: Vec<u8>,
    pub dtexdata: Vec<u8>,
    pub dentdata: String,
    pub dleafs: Vec<DLeaf2Rmq>,
    pub dplanes: Vec<DPlane>,
    pub dvertexes: Vec<DVertex>,
    pub dnodes: Vec<DNode2Rmq>,
    pub texinfo: Vec<DTexinfoQ1>,
    pub dfaces: Vec<DFace2>,
    pub dclipnodes: Vec<DClipnode2>,
    pub dedges: Vec<DEdge32>,
    pub dmarksurfaces: Vec<u32>,
    pub dsurfedges: Vec<i32>,
}

impl Bsp2Rmq {
    pub(crate) fn parse(file: &[u8], lumps: &[Lump], hexen2: bool) -> BspResult<Self> {
        q1_parse_body!(Bsp2Rmq, file, lumps, hexen2,
            node: DNode2Rmq, face: DFace2, clip: DClipnode2, leaf: DLeaf2Rmq, mark: u32, edge: DEdge32)
    }

    pub(crate) fn serialize_lumps(&self, hexen2: bool) -> Vec<Vec<u8>> {
        let mut lumps = vec![Vec::new(); Q1_HEADER_LUMPS];
        lumps[LUMP_ENTITIES] = entdata_to_bytes(&self.dentdata);
        write_records(&self.dplanes, &mut lumps[LUMP_PLANES]);
        lumps[LUMP_TEXTURES] = self.dtexdata.clone();
        write_records(&self.dvertexes, &mut lumps[LUMP_VERTEXES]);
        lumps[LUMP_VISIBILITY] = self.dvisdata.clone();
        write_records(&self.dnodes, &mut lumps[LUMP_NODES]);
        write_records(&self.texinfo, &mut lumps[LUMP_TEXINFO]);
        write_records(&self.dfaces, &mut lumps[LUMP_FACES]);
        lumps[LUMP_LIGHTING] = self.dlightdata.clone();
        write_records(&self.dclipnodes, &mut lumps[LUMP_CLIPNODES]);
        write_records(&self.dleafs, &mut lumps[LUMP_LEAFS]);
        write_records(&self.dmarksurfaces, &mut lumps[LUMP_MARKSURFACES]);
        write_records(&self.dedges, &mut lumps[LUMP_EDGES]);
        write_records(&self.dsurfedges, &mut lumps[LUMP_SURFEDGES]);
        write_models(&self.dmodels, hexen2, &mut lumps[LUMP_MODELS]);
        lumps
    }

    pub fn to_mbsp(&self) -> MBsp {
        MBsp {
            dmodels: self.dmodels.clone(),
            dvisdata: self.dvisdata.clone(),
            dlightdata: self.dlightdata.clone(),
            dtexdata: self.dtexdata.clone(),
            dentdata: self.dentdata.clone(),
            dleafs: self.dleafs.iter().map(MLeaf::from).collect(),
            dplanes: self.dplanes.clone(),
            dvertexes: self.dvertexes.clone(),
            dnodes: self.dnodes.iter().map(MNode::from).collect(),
            texinfo: self.texinfo.iter().map(MTexinfo::from).collect(),
            dfaces: self.dfaces.iter().map(MFace::from).collect(),
            dclipnodes: self.dclipnodes.iter().map(MClipnode::from).collect(),
            dedges: self.dedges.clone(),
            dmarksurfaces: self.dmarksurfaces.clone(),
            dsurfedges: self.dsurfedges.clone(),
            ..MBsp::default()
        }
    }

    pub fn from_mbsp(mbsp: &MBsp) -> BspResult<Self> {
        Ok(Bsp2Rmq {
            dmodels: mbsp.dmodels.clone(),
            dvisdata: mbsp.dvisdata.clone(),
            dlightdata: mbsp.dlightdata.clone(),
            dtexdata: mbsp.dtexdata.clone(),
            dentdata: mbsp.dentdata.clone(),
            dleafs: mbsp
                .dleafs
                .iter()
                .map(DLeaf2Rmq::try_from)
                .collect::<BspResult<_>>()?,
            dplanes: mbsp.dplanes.clone(),
            dvertexes: mbsp.dvertexes.clone(),
            dnodes: mbsp
                .dnodes
                .iter()
                .map(DNode2Rmq::try_from)
                .collect::<BspResult<_>>()?,
            texinfo: mbsp.texinfo.iter().map(DTexinfoQ1::from).collect(),
            dfaces: mbsp
                .dfaces
                .iter()
                .map(DFace2::try_from)
                .collect::<BspResult<_>>()?,
            dclipnodes: mbsp.dclipnodes.iter().map(DClipnode2::from).collect(),
            dedges: mbsp.dedges.clone(),
            dmarksurfaces: mbsp.dmarksurfaces.clone(),
            dsurfedges: mbsp.dsurfedges.clone(),
        })
    }
}

/// BSP2 document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Bsp2 {
    pub dmodels: Vec<MModel>,
    pub dvisdata: Vec<u8>,
    pub dlightdata: Vec<u8>,
    pub dtexdata: Vec<u8>,
    pub dentdata: String,
    pub dleafs: Vec<DLeaf2>,
    pub dplanes: Vec<DPlane>,
    pub dvertexes: Vec<DVertex>,
    pub dnodes: Vec<DNode2>,
    pub texinfo: Vec<DTexinfoQ1>,
    pub dfaces: Vec<DFace2>,
    pub dclipnodes: Vec<DClipnode2>,
    pub dedges: Vec<DEdge32>,
    pub dmarksurfaces: Vec<u32>,
    pub dsurfedges: Vec<i32>,
}

impl Bsp2 {
    pub(crate) fn parse(file: &[u8], lumps: &[Lump], hexen2: bool) -> BspResult<Self> {
        q1_parse_body!(Bsp2, file, lumps, hexen2,
            node: DNode2, face: DFace2, clip: DClipnode2, leaf: DLeaf2, mark: u32, edge: DEdge32)
    }

    pub(crate) fn serialize_lumps(&self, hexen2: bool) -> Vec<Vec<u8>> {
        let mut lumps = vec![Vec::new(); Q1_HEADER_LUMPS];
        lumps[LUMP_ENTITIES] = entdata_to_bytes(&self.dentdata);
        write_records(&self.dplanes, &mut lumps[LUMP_PLANES]);
        lumps[LUMP_TEXTURES] = self.dtexdata.clone();
        write_records(&self.dvertexes, &mut lumps[LUMP_VERTEXES]);
        lumps[LUMP_VISIBILITY] = self.dvisdata.clone();
        write_records(&self.dnodes, &mut lumps[LUMP_NODES]);
        write_records(&self.texinfo, &mut lumps[LUMP_TEXINFO]);
        write_records(&self.dfaces, &mut lumps[LUMP_FACES]);
        lumps[LUMP_LIGHTING] = self.dlightdata.clone();
        write_records(&self.dclipnodes, &mut lumps[LUMP_CLIPNODES]);
        write_records(&self.dleafs, &mut lumps[LUMP_LEAFS]);
        write_records(&self.dmarksurfaces, &mut lumps[LUMP_MARKSURFACES]);
        write_records(&self.dedges, &mut lumps[LUMP_EDGES]);
        write_records(&self.dsurfedges, &mut lumps[LUMP_SURFEDGES]);
        write_models(&self.dmodels, hexen2, &mut lumps[LUMP_MODELS]);
        lumps
    }

    pub fn to_mbsp(&self) -> MBsp {
        MBsp {
            dmodels: self.dmodels.clone(),
            dvisdata: self.dvisdata.clone(),
            dlightdata: self.dlightdata.clone(),
            dtexdata: self.dtexdata.clone(),
            dentdata: self.dentdata.clone(),
            dleafs: self.dleafs.iter().map(MLeaf::from).collect(),
            dplanes: self.dplanes.clone(),
            dvertexes: self.dvertexes.clone(),
            dnodes: self.dnodes.iter().map(MNode::from).collect(),
            texinfo: self.texinfo.iter().map(MTexinfo::from).collect(),
            dfaces: self.dfaces.iter().map(MFace::from).collect(),
            dclipnodes: self.dclipnodes.iter().map(MClipnode::from).collect(),
            dedges: self.dedges.clone(),
            dmarksurfaces: self.dmarksurfaces.clone(),
            dsurfedges: self.dsurfedges.clone(),
            ..MBsp::default()
        }
    }

    pub fn from_mbsp(mbsp: &MBsp) -> BspResult<Self> {
        Ok(Bsp2 {
            dmodels: mbsp.dmodels.clone(),
            dvisdata: mbsp.dvisdata.clone(),
            dlightdata: mbsp.dlightdata.clone(),
            dtexdata: mbsp.dtexdata.clone(),
            dentdata: mbsp.dentdata.clone(),
            dleafs: mbsp.dleafs.iter().map(DLeaf2::from).collect(),
            dplanes: mbsp.dplanes.clone(),
            dvertexes: mbsp.dvertexes.clone(),
            dnodes: mbsp.dnodes.iter().map(DNode2::from).collect(),
            texinfo: mbsp.texinfo.iter().map(DTexinfoQ1::from).collect(),
            dfaces: mbsp
                .dfaces
                .iter()
                .map(DFace2::try_from)
                .collect::<BspResult<_>>()?,
            dclipnodes: mbsp.dclipnodes.iter().map(DClipnode2::from).collect(),
            dedges: mbsp.dedges.clone(),
            dmarksurfaces: mbsp.dmarksurfaces.clone(),
            dsurfedges: mbsp.dsurfedges.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn size_of_q1_records() {
        assert_eq!(size_of::<DTexinfoQ1>(), DTexinfoQ1::DISK_SIZE);
        assert_eq!(size_of::<DNode29>(), DNode29::DISK_SIZE);
        assert_eq!(size_of::<DFace29>(), DFace29::DISK_SIZE);
        assert_eq!(size_of::<DClipnode29>(), DClipnode29::DISK_SIZE);
        assert_eq!(size_of::<DLeaf29>(), DLeaf29::DISK_SIZE);
        assert_eq!(size_of::<DNode2Rmq>(), DNode2Rmq::DISK_SIZE);
        assert_eq!(size_of::<DLeaf2Rmq>(), DLeaf2Rmq::DISK_SIZE);
        assert_eq!(size_of::<DNode2>(), DNode2::DISK_SIZE);
        assert_eq!(size_of::<DFace2>(), DFace2::DISK_SIZE);
        assert_eq!(size_of::<DClipnode2>(), DClipnode2::DISK_SIZE);
        assert_eq!(size_of::<DLeaf2>(), DLeaf2::DISK_SIZE);
    }

    #[test]
    fn test_node29_roundtrip() {
        let node = DNode29 {
            planenum: 12,
            children: [-3, 400],
            mins: [-128, -64, 0],
            maxs: [128, 64, 512],
            firstface: 7,
            numfaces: 3,
        };
        let mut buf = Vec::new();
        node.write(&mut buf);
        assert_eq!(buf.len(), DNode29::DISK_SIZE);
        let back = DNode29::read(&mut BspReader::new(&buf)).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_node29_widen_narrow() {
        let node = DNode29 {
            planenum: 12,
            children: [-3, 400],
            mins: [-128, -64, 0],
            maxs: [128, 64, 512],
            firstface: 7,
            numfaces: 3,
        };
        let wide = MNode::from(&node);
        assert_eq!(wide.children, [-3, 400]);
        assert_eq!(wide.mins, [-128.0, -64.0, 0.0]);
        let back = DNode29::try_from(&wide).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_node29_overflow_rejected() {
        let wide = MNode {
            children: [40000, 1],
            ..MNode::default()
        };
        let err = DNode29::try_from(&wide).unwrap_err();
        assert!(matches!(
            err,
            BspError::NumericOverflow {
                field: "DNode29::children",
                ..
            }
        ));
        // the RMQ tier holds it fine
        assert!(DNode2Rmq::try_from(&wide).is_ok());
    }

    #[test]
    fn test_bounds_floor_ceil_on_narrow() {
        let wide = MNode {
            mins: [-10.5, 0.0, 3.25],
            maxs: [10.5, 0.0, 7.75],
            ..MNode::default()
        };
        let narrow = DNode29::try_from(&wide).unwrap();
        assert_eq!(narrow.mins, [-11, 0, 3]);
        assert_eq!(narrow.maxs, [11, 0, 8]);
    }

    #[test]
    fn test_face29_planenum_overflow() {
        let wide = MFace {
            planenum: 70000,
            ..MFace::default()
        };
        assert!(DFace29::try_from(&wide).is_err());
        // planenum fits i32, so the BSP2 face takes it
        assert_eq!(DFace2::try_from(&wide).unwrap().planenum, 70000);
    }

    #[test]
    fn test_clipnode_contents_children() {
        let clip = DClipnode29 {
            planenum: 5,
            children: [-2, 88],
        };
        let wide = MClipnode::from(&clip);
        assert_eq!(wide.children, [-2, 88]);
        assert_eq!(DClipnode29::try_from(&wide).unwrap(), clip);
    }

    #[test]
    fn test_models_q1_roundtrip() {
        let model = MModel {
            mins: [-32.0, -32.0, 0.0],
            maxs: [32.0, 32.0, 64.0],
            origin: [0.0; 3],
            headnode: [1, 2, 3, 4, 0, 0, 0, 0],
            visleafs: 9,
            firstface: 0,
            numfaces: 6,
        };
        let mut buf = Vec::new();
        write_models(&[model], false, &mut buf);
        assert_eq!(buf.len(), DMODEL_Q1_SIZE);

        let parsed = parse_models(&buf, false).unwrap();
        assert_eq!(parsed, vec![model]);
    }

    #[test]
    fn test_models_hexen2_roundtrip() {
        let model = MModel {
            headnode: [1, 2, 3, 4, 5, 6, 7, 8],
            visleafs: 2,
            ..MModel::default()
        };
        let mut buf = Vec::new();
        write_models(&[model], true, &mut buf);
        assert_eq!(buf.len(), DMODEL_H2_SIZE);

        let parsed = parse_models(&buf, true).unwrap();
        assert_eq!(parsed[0].headnode, [1, 2, 3, 4, 5, 6, 7, 8]);

        // the same bytes are a funny size for plain Quake
        assert!(matches!(
            parse_models(&buf, false),
            Err(BspError::LumpSizeMismatch { lump: "models", .. })
        ));
    }

    fn sample_bsp29() -> Bsp29 {
        Bsp29 {
            dmodels: vec![MModel {
                maxs: [64.0, 64.0, 64.0],
                headnode: [0, 0, 0, 0, 0, 0, 0, 0],
                visleafs: 1,
                numfaces: 1,
                ..MModel::default()
            }],
            dvisdata: vec![0xff],
            dlightdata: vec![1, 2, 3],
            dtexdata: vec![0; 4],
            dentdata: "{\n\"classname\" \"worldspawn\"\n}\n".to_string(),
            dleafs: vec![DLeaf29 {
                contents: -2,
                visofs: -1,
                mins: [-64, -64, -64],
                maxs: [64, 64, 64],
                firstmarksurface: 0,
                nummarksurfaces: 1,
                ambient_level: [0; 4],
            }],
            dplanes: vec![DPlane {
                normal: [0.0, 0.0, 1.0],
                dist: 0.0,
                plane_type: 2,
            }],
            dvertexes: vec![DVertex {
                point: [8.0, 8.0, 0.0],
            }],
            dnodes: vec![DNode29 {
                planenum: 0,
                children: [-1, -2],
                mins: [-64, -64, -64],
                maxs: [64, 64, 64],
                firstface: 0,
                numfaces: 1,
            }],
            texinfo: vec![DTexinfoQ1::default()],
            dfaces: vec![DFace29 {
                planenum: 0,
                side: 0,
                firstedge: 0,
                numedges: 4,
                texinfo: 0,
                styles: [0, 255, 255, 255],
                lightofs: 0,
            }],
            dclipnodes: vec![DClipnode29 {
                planenum: 0,
                children: [-2, -1],
            }],
            dedges: vec![DEdge { v: [0, 1] }],
            dmarksurfaces: vec![0],
            dsurfedges: vec![1, -1],
        }
    }

    #[test]
    fn test_bsp29_mbsp_roundtrip() {
        let doc = sample_bsp29();
        let mbsp = doc.to_mbsp();
        assert_eq!(mbsp.dleafs[0].contents, -2);
        assert_eq!(mbsp.dnodes[0].children, [-1, -2]);

        let back = Bsp29::from_mbsp(&mbsp).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_bsp29_upgrades_to_bsp2() {
        let doc = sample_bsp29();
        let mbsp = doc.to_mbsp();
        let bsp2 = Bsp2::from_mbsp(&mbsp).unwrap();
        assert_eq!(bsp2.dnodes[0].children, [-1, -2]);
        assert_eq!(bsp2.dleafs[0].mins, [-64.0, -64.0, -64.0]);
        assert_eq!(bsp2.dmarksurfaces, vec![0u32]);

        // and back down without loss
        let down = Bsp29::from_mbsp(&bsp2.to_mbsp()).unwrap();
        assert_eq!(down, doc);
    }

    #[test]
    fn test_texinfo_conversion_keeps_native_flags() {
        let ti = DTexinfoQ1 {
            vecs: TexVecs([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]]),
            miptex: 3,
            flags: 1,
        };
        let wide = MTexinfo::from(&ti);
        assert_eq!(wide.flags.native, 1);
        assert_eq!(wide.miptex, 3);
        assert_eq!(DTexinfoQ1::from(&wide), ti);
    }
}
