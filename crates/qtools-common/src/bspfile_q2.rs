// bspfile_q2.rs - Quake II disk records and documents
//
// Two tiers over one lump table: vanilla IBSP and the Qbism QBSP
// extension, which widens every 16-bit index to 32 bits and stores
// float node/leaf bounds. Both carry version 38 after the magic.

use crate::bspfile_generic::{MBrushSide, MBsp, MFace, MLeaf, MModel, MNode, MTexinfo};
use crate::contentflags::SurfFlags;
use crate::error::{BspError, BspResult};
use crate::q_shared::{
    bounds_ceil_i16, bounds_floor_i16, bounds_widen, numeric_cast_i16, numeric_cast_u16, Vec3,
};
use crate::qfiles::{
    entdata_from_bytes, entdata_to_bytes, DArea, DAreaPortal, DBrush, DEdge, DEdge32, DPlane,
    DVertex, Lump, TexVecs, MAXLIGHTMAPS, Q2_HEADER_LUMPS, Q2_LUMP_AREAPORTALS, Q2_LUMP_AREAS,
    Q2_LUMP_BRUSHES, Q2_LUMP_BRUSHSIDES, Q2_LUMP_EDGES, Q2_LUMP_ENTITIES, Q2_LUMP_FACES,
    Q2_LUMP_LEAFBRUSHES, Q2_LUMP_LEAFFACES, Q2_LUMP_LEAFS, Q2_LUMP_LIGHTING, Q2_LUMP_MODELS,
    Q2_LUMP_NODES, Q2_LUMP_PLANES, Q2_LUMP_POP, Q2_LUMP_SURFEDGES, Q2_LUMP_TEXINFO,
    Q2_LUMP_VERTEXES, Q2_LUMP_VISIBILITY,
};
use crate::stream::{
    parse_records, put_i16, put_i16_vec3, put_i32, put_u16, put_u32, put_u8, put_vec3,
    write_records, BspReader, LumpRecord,
};

pub const Q2_TEXNAME_LEN: usize = 32;

/// Decode a fixed 32-byte texture name field, stopping at the first NUL.
/// A name that fills all 32 bytes has no terminator on disk.
pub(crate) fn texname_from_bytes(bytes: &[u8; Q2_TEXNAME_LEN]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encode a texture name into the fixed field, truncating to 31 bytes so
/// the terminator always survives.
pub(crate) fn texname_to_bytes(name: &str) -> [u8; Q2_TEXNAME_LEN] {
    let mut out = [0u8; Q2_TEXNAME_LEN];
    let n = name.len().min(Q2_TEXNAME_LEN - 1);
    out[..n].copy_from_slice(&name.as_bytes()[..n]);
    out
}

// ============================================================
// Texinfo
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct DTexinfoQ2 {
    pub vecs: TexVecs,
    pub flags: i32,
    pub value: i32,
    pub texture: [u8; Q2_TEXNAME_LEN],
    pub nexttexinfo: i32,
}

impl Default for DTexinfoQ2 {
    fn default() -> Self {
        DTexinfoQ2 {
            vecs: TexVecs::default(),
            flags: 0,
            value: 0,
            texture: [0; Q2_TEXNAME_LEN],
            nexttexinfo: -1,
        }
    }
}

impl LumpRecord for DTexinfoQ2 {
    const DISK_SIZE: usize = 76;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        let vecs = TexVecs::read(r)?;
        let flags = r.read_i32()?;
        let value = r.read_i32()?;
        let mut texture = [0u8; Q2_TEXNAME_LEN];
        texture.copy_from_slice(r.read_bytes(Q2_TEXNAME_LEN)?);
        Ok(DTexinfoQ2 {
            vecs,
            flags,
            value,
            texture,
            nexttexinfo: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.vecs.write(out);
        put_i32(out, self.flags);
        put_i32(out, self.value);
        out.extend_from_slice(&self.texture);
        put_i32(out, self.nexttexinfo);
    }
}

impl From<&DTexinfoQ2> for MTexinfo {
    fn from(t: &DTexinfoQ2) -> Self {
        MTexinfo {
            vecs: t.vecs,
            flags: SurfFlags::from_native(t.flags),
            value: t.value,
            texture: texname_from_bytes(&t.texture),
            nexttexinfo: t.nexttexinfo,
            ..MTexinfo::default()
        }
    }
}

impl From<&MTexinfo> for DTexinfoQ2 {
    fn from(t: &MTexinfo) -> Self {
        DTexinfoQ2 {
            vecs: t.vecs,
            flags: t.flags.native,
            value: t.value,
            texture: texname_to_bytes(&t.texture),
            nexttexinfo: t.nexttexinfo,
        }
    }
}

// ============================================================
// Vanilla IBSP records
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DNodeQ2 {
    pub planenum: i32,
    /// Negative children are -(leafnum + 1).
    pub children: [i32; 2],
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub firstface: u16,
    pub numfaces: u16,
}

impl LumpRecord for DNodeQ2 {
    const DISK_SIZE: usize = 28;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DNodeQ2 {
            planenum: r.read_i32()?,
            children: [r.read_i32()?, r.read_i32()?],
            mins: r.read_i16_vec3()?,
            maxs: r.read_i16_vec3()?,
            firstface: r.read_u16()?,
            numfaces: r.read_u16()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.planenum);
        put_i32(out, self.children[0]);
        put_i32(out, self.children[1]);
        put_i16_vec3(out, &self.mins);
        put_i16_vec3(out, &self.maxs);
        put_u16(out, self.firstface);
        put_u16(out, self.numfaces);
    }
}

impl From<&DNodeQ2> for MNode {
    fn from(n: &DNodeQ2) -> Self {
        MNode {
            planenum: n.planenum,
            children: n.children,
            mins: bounds_widen(&n.mins),
            maxs: bounds_widen(&n.maxs),
            firstface: n.firstface as u32,
            numfaces: n.numfaces as u32,
        }
    }
}

impl TryFrom<&MNode> for DNodeQ2 {
    type Error = BspError;

    fn try_from(n: &MNode) -> BspResult<Self> {
        Ok(DNodeQ2 {
            planenum: n.planenum,
            children: n.children,
            mins: bounds_floor_i16(&n.mins, "DNodeQ2::mins")?,
            maxs: bounds_ceil_i16(&n.maxs, "DNodeQ2::maxs")?,
            firstface: numeric_cast_u16(n.firstface as i64, "DNodeQ2::firstface")?,
            numfaces: numeric_cast_u16(n.numfaces as i64, "DNodeQ2::numfaces")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DFaceQ2 {
    pub planenum: u16,
    pub side: i16,
    pub firstedge: i32,
    pub numedges: i16,
    pub texinfo: i16,
    pub styles: [u8; MAXLIGHTMAPS],
    pub lightofs: i32,
}

impl LumpRecord for DFaceQ2 {
    const DISK_SIZE: usize = 20;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DFaceQ2 {
            planenum: r.read_u16()?,
            side: r.read_i16()?,
            firstedge: r.read_i32()?,
            numedges: r.read_i16()?,
            texinfo: r.read_i16()?,
            styles: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
            lightofs: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.planenum);
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

impl From<&DFaceQ2> for MFace {
    fn from(f: &DFaceQ2) -> Self {
        MFace {
            planenum: f.planenum as u32,
            side: f.side as i32,
            firstedge: f.firstedge,
            numedges: f.numedges as i32,
            texinfo: f.texinfo as i32,
            styles: f.styles,
            lightofs: f.lightofs,
        }
    }
}

impl TryFrom<&MFace> for DFaceQ2 {
    type Error = BspError;

    fn try_from(f: &MFace) -> BspResult<Self> {
        Ok(DFaceQ2 {
            planenum: numeric_cast_u16(f.planenum as i64, "DFaceQ2::planenum")?,
            side: numeric_cast_i16(f.side as i64, "DFaceQ2::side")?,
            firstedge: f.firstedge,
            numedges: numeric_cast_i16(f.numedges as i64, "DFaceQ2::numedges")?,
            texinfo: numeric_cast_i16(f.texinfo as i64, "DFaceQ2::texinfo")?,
            styles: f.styles,
            lightofs: f.lightofs,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DLeafQ2 {
    pub contents: i32,
    pub cluster: i16,
    pub area: i16,
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub firstleafface: u16,
    pub numleaffaces: u16,
    pub firstleafbrush: u16,
    pub numleafbrushes: u16,
}

impl LumpRecord for DLeafQ2 {
    const DISK_SIZE: usize = 28;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DLeafQ2 {
            contents: r.read_i32()?,
            cluster: r.read_i16()?,
            area: r.read_i16()?,
            mins: r.read_i16_vec3()?,
            maxs: r.read_i16_vec3()?,
            firstleafface: r.read_u16()?,
            numleaffaces: r.read_u16()?,
            firstleafbrush: r.read_u16()?,
            numleafbrushes: r.read_u16()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.contents);
        put_i16(out, self.cluster);
        put_i16(out, self.area);
        put_i16_vec3(out, &self.mins);
        put_i16_vec3(out, &self.maxs);
        put_u16(out, self.firstleafface);
        put_u16(out, self.numleaffaces);
        put_u16(out, self.firstleafbrush);
        put_u16(out, self.numleafbrushes);
    }
}

impl From<&DLeafQ2> for MLeaf {
    fn from(l: &DLeafQ2) -> Self {
        MLeaf {
            contents: l.contents,
            cluster: l.cluster as i32,
            area: l.area as i32,
            mins: bounds_widen(&l.mins),
            maxs: bounds_widen(&l.maxs),
            firstmarksurface: l.firstleafface as u32,
            nummarksurfaces: l.numleaffaces as u32,
            firstleafbrush: l.firstleafbrush as u32,
            numleafbrushes: l.numleafbrushes as u32,
            ..MLeaf::default()
        }
    }
}

impl TryFrom<&MLeaf> for DLeafQ2 {
    type Error = BspError;

    fn try_from(l: &MLeaf) -> BspResult<Self> {
        Ok(DLeafQ2 {
            contents: l.contents,
            cluster: numeric_cast_i16(l.cluster as i64, "DLeafQ2::cluster")?,
            area: numeric_cast_i16(l.area as i64, "DLeafQ2::area")?,
            mins: bounds_floor_i16(&l.mins, "DLeafQ2::mins")?,
            maxs: bounds_ceil_i16(&l.maxs, "DLeafQ2::maxs")?,
            firstleafface: numeric_cast_u16(l.firstmarksurface as i64, "DLeafQ2::firstleafface")?,
            numleaffaces: numeric_cast_u16(l.nummarksurfaces as i64, "DLeafQ2::numleaffaces")?,
            firstleafbrush: numeric_cast_u16(l.firstleafbrush as i64, "DLeafQ2::firstleafbrush")?,
            numleafbrushes: numeric_cast_u16(l.numleafbrushes as i64, "DLeafQ2::numleafbrushes")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DBrushSideQ2 {
    pub planenum: u16,
    pub texinfo: i16,
}

impl LumpRecord for DBrushSideQ2 {
    const DISK_SIZE: usize = 4;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DBrushSideQ2 {
            planenum: r.read_u16()?,
            texinfo: r.read_i16()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.planenum);
        put_i16(out, self.texinfo);
    }
}

impl From<&DBrushSideQ2> for MBrushSide {
    fn from(s: &DBrushSideQ2) -> Self {
        MBrushSide {
            planenum: s.planenum as u32,
            texinfo: s.texinfo as i32,
        }
    }
}

impl TryFrom<&MBrushSide> for DBrushSideQ2 {
    type Error = BspError;

    fn try_from(s: &MBrushSide) -> BspResult<Self> {
        Ok(DBrushSideQ2 {
            planenum: numeric_cast_u16(s.planenum as i64, "DBrushSideQ2::planenum")?,
            texinfo: numeric_cast_i16(s.texinfo as i64, "DBrushSideQ2::texinfo")?,
        })
    }
}

// ============================================================
// Qbism QBSP records
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct DNodeQbism {
    pub planenum: i32,
    pub children: [i32; 2],
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub firstface: u32,
    pub numfaces: u32,
}

impl LumpRecord for DNodeQbism {
    const DISK_SIZE: usize = 44;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DNodeQbism {
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

impl From<&DNodeQbism> for MNode {
    fn from(n: &DNodeQbism) -> Self {
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

impl From<&MNode> for DNodeQbism {
    fn from(n: &MNode) -> Self {
        DNodeQbism {
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
pub struct DFaceQbism {
    pub planenum: u32,
    pub side: i32,
    pub firstedge: i32,
    pub numedges: i32,
    pub texinfo: i32,
    pub styles: [u8; MAXLIGHTMAPS],
    pub lightofs: i32,
}

impl LumpRecord for DFaceQbism {
    const DISK_SIZE: usize = 28;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DFaceQbism {
            planenum: r.read_u32()?,
            side: r.read_i32()?,
            firstedge: r.read_i32()?,
            numedges: r.read_i32()?,
            texinfo: r.read_i32()?,
            styles: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
            lightofs: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u32(out, self.planenum);
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

impl From<&DFaceQbism> for MFace {
    fn from(f: &DFaceQbism) -> Self {
        MFace {
            planenum: f.planenum,
            side: f.side,
            firstedge: f.firstedge,
            numedges: f.numedges,
            texinfo: f.texinfo,
            styles: f.styles,
            lightofs: f.lightofs,
        }
    }
}

impl From<&MFace> for DFaceQbism {
    fn from(f: &MFace) -> Self {
        DFaceQbism {
            planenum: f.planenum,
            side: f.side,
            firstedge: f.firstedge,
            numedges: f.numedges,
            texinfo: f.texinfo,
            styles: f.styles,
            lightofs: f.lightofs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct DLeafQbism {
    pub contents: i32,
    pub cluster: i32,
    pub area: i32,
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub firstleafface: u32,
    pub numleaffaces: u32,
    pub firstleafbrush: u32,
    pub numleafbrushes: u32,
}

impl LumpRecord for DLeafQbism {
    const DISK_SIZE: usize = 52;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DLeafQbism {
            contents: r.read_i32()?,
            cluster: r.read_i32()?,
            area: r.read_i32()?,
            mins: r.read_vec3()?,
            maxs: r.read_vec3()?,
            firstleafface: r.read_u32()?,
            numleaffaces: r.read_u32()?,
            firstleafbrush: r.read_u32()?,
            numleafbrushes: r.read_u32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.contents);
        put_i32(out, self.cluster);
        put_i32(out, self.area);
        put_vec3(out, &self.mins);
        put_vec3(out, &self.maxs);
        put_u32(out, self.firstleafface);
        put_u32(out, self.numleaffaces);
        put_u32(out, self.firstleafbrush);
        put_u32(out, self.numleafbrushes);
    }
}

impl From<&DLeafQbism> for MLeaf {
    fn from(l: &DLeafQbism) -> Self {
        MLeaf {
            contents: l.contents,
            cluster: l.cluster,
            area: l.area,
            mins: l.mins,
            maxs: l.maxs,
            firstmarksurface: l.firstleafface,
            nummarksurfaces: l.numleaffaces,
            firstleafbrush: l.firstleafbrush,
            numleafbrushes: l.numleafbrushes,
            ..MLeaf::default()
        }
    }
}

impl From<&MLeaf> for DLeafQbism {
    fn from(l: &MLeaf) -> Self {
        DLeafQbism {
            contents: l.contents,
            cluster: l.cluster,
            area: l.area,
            mins: l.mins,
            maxs: l.maxs,
            firstleafface: l.firstmarksurface,
            numleaffaces: l.nummarksurfaces,
            firstleafbrush: l.firstleafbrush,
            numleafbrushes: l.numleafbrushes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DBrushSideQbism {
    pub planenum: u32,
    pub texinfo: i32,
}

impl LumpRecord for DBrushSideQbism {
    const DISK_SIZE: usize = 8;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DBrushSideQbism {
            planenum: r.read_u32()?,
            texinfo: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u32(out, self.planenum);
        put_i32(out, self.texinfo);
    }
}

impl From<&DBrushSideQbism> for MBrushSide {
    fn from(s: &DBrushSideQbism) -> Self {
        MBrushSide {
            planenum: s.planenum,
            texinfo: s.texinfo,
        }
    }
}

impl From<&MBrushSide> for DBrushSideQbism {
    fn from(s: &MBrushSide) -> Self {
        DBrushSideQbism {
            planenum: s.planenum,
            texinfo: s.texinfo,
        }
    }
}

// ============================================================
// Models
// ============================================================

/// Quake II model record, shared by both tiers. One hull root and no
/// visleaf count, unlike the Quake layout.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct DModelQ2 {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub origin: Vec3,
    pub headnode: i32,
    pub firstface: i32,
    pub numfaces: i32,
}

impl LumpRecord for DModelQ2 {
    const DISK_SIZE: usize = 48;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        Ok(DModelQ2 {
            mins: r.read_vec3()?,
            maxs: r.read_vec3()?,
            origin: r.read_vec3()?,
            headnode: r.read_i32()?,
            firstface: r.read_i32()?,
            numfaces: r.read_i32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_vec3(out, &self.mins);
        put_vec3(out, &self.maxs);
        put_vec3(out, &self.origin);
        put_i32(out, self.headnode);
        put_i32(out, self.firstface);
        put_i32(out, self.numfaces);
    }
}

impl From<&DModelQ2> for MModel {
    fn from(m: &DModelQ2) -> Self {
        let mut model = MModel {
            mins: m.mins,
            maxs: m.maxs,
            origin: m.origin,
            firstface: m.firstface,
            numfaces: m.numfaces,
            ..MModel::default()
        };
        model.headnode[0] = m.headnode;
        model
    }
}

impl From<&MModel> for DModelQ2 {
    fn from(m: &MModel) -> Self {
        // hulls past the first and the visleaf count have no disk home
        DModelQ2 {
            mins: m.mins,
            maxs: m.maxs,
            origin: m.origin,
            headnode: m.headnode[0],
            firstface: m.firstface,
            numfaces: m.numfaces,
        }
    }
}

// ============================================================
// Documents
// ============================================================

macro_rules! q2_parse_body {
    ($doc:ident, $file:ident, $lumps:ident,
     node: $node:ty, face: $face:ty, leaf: $leaf:ty, side: $side:ty, mark: $mark:ty,
     brushref: $brushref:ty, edge: $edge:ty) => {
        Ok($doc {
            dentdata: entdata_from_bytes($lumps[Q2_LUMP_ENTITIES].slice($file, "entities")?),
            dplanes: parse_records("planes", $lumps[Q2_LUMP_PLANES].slice($file, "planes")?)?,
            dvertexes: parse_records("vertexes", $lumps[Q2_LUMP_VERTEXES].slice($file, "vertexes")?)?,
            dvisdata: $lumps[Q2_LUMP_VISIBILITY].slice($file, "visibility")?.to_vec(),
            dnodes: parse_records::<$node>("nodes", $lumps[Q2_LUMP_NODES].slice($file, "nodes")?)?,
            texinfo: parse_records("texinfo", $lumps[Q2_LUMP_TEXINFO].slice($file, "texinfo")?)?,
            dfaces: parse_records::<$face>("faces", $lumps[Q2_LUMP_FACES].slice($file, "faces")?)?,
            dlightdata: $lumps[Q2_LUMP_LIGHTING].slice($file, "lighting")?.to_vec(),
            dleafs: parse_records::<$leaf>("leafs", $lumps[Q2_LUMP_LEAFS].slice($file, "leafs")?)?,
            dleaffaces: parse_records::<$mark>(
                "leaffaces",
                $lumps[Q2_LUMP_LEAFFACES].slice($file, "leaffaces")?,
            )?,
            dleafbrushes: parse_records::<$brushref>(
                "leafbrushes",
                $lumps[Q2_LUMP_LEAFBRUSHES].slice($file, "leafbrushes")?,
            )?,
            dedges: parse_records::<$edge>("edges", $lumps[Q2_LUMP_EDGES].slice($file, "edges")?)?,
            dsurfedges: parse_records(
                "surfedges",
                $lumps[Q2_LUMP_SURFEDGES].slice($file, "surfedges")?,
            )?,
            dmodels: parse_records("models", $lumps[Q2_LUMP_MODELS].slice($file, "models")?)?,
            dbrushes: parse_records("brushes", $lumps[Q2_LUMP_BRUSHES].slice($file, "brushes")?)?,
            dbrushsides: parse_records::<$side>(
                "brushsides",
                $lumps[Q2_LUMP_BRUSHSIDES].slice($file, "brushsides")?,
            )?,
            dpop: $lumps[Q2_LUMP_POP].slice($file, "pop")?.to_vec(),
            dareas: parse_records("areas", $lumps[Q2_LUMP_AREAS].slice($file, "areas")?)?,
            dareaportals: parse_records(
                "areaportals",
                $lumps[Q2_LUMP_AREAPORTALS].slice($file, "areaportals")?,
            )?,
        })
    };
}

macro_rules! q2_serialize_body {
    ($self:ident) => {{
        let mut lumps = vec![Vec::new(); Q2_HEADER_LUMPS];
        lumps[Q2_LUMP_ENTITIES] = entdata_to_bytes(&$self.dentdata);
        write_records(&$self.dplanes, &mut lumps[Q2_LUMP_PLANES]);
        write_records(&$self.dvertexes, &mut lumps[Q2_LUMP_VERTEXES]);
        lumps[Q2_LUMP_VISIBILITY] = $self.dvisdata.clone();
        write_records(&$self.dnodes, &mut lumps[Q2_LUMP_NODES]);
        write_records(&$self.texinfo, &mut lumps[Q2_LUMP_TEXINFO]);
        write_records(&$self.dfaces, &mut lumps[Q2_LUMP_FACES]);
        lumps[Q2_LUMP_LIGHTING] = $self.dlightdata.clone();
        write_records(&$self.dleafs, &mut lumps[Q2_LUMP_LEAFS]);
        write_records(&$self.dleaffaces, &mut lumps[Q2_LUMP_LEAFFACES]);
        write_records(&$self.dleafbrushes, &mut lumps[Q2_LUMP_LEAFBRUSHES]);
        write_records(&$self.dedges, &mut lumps[Q2_LUMP_EDGES]);
        write_records(&$self.dsurfedges, &mut lumps[Q2_LUMP_SURFEDGES]);
        write_records(&$self.dmodels, &mut lumps[Q2_LUMP_MODELS]);
        write_records(&$self.dbrushes, &mut lumps[Q2_LUMP_BRUSHES]);
        write_records(&$self.dbrushsides, &mut lumps[Q2_LUMP_BRUSHSIDES]);
        lumps[Q2_LUMP_POP] = $self.dpop.clone();
        write_records(&$self.dareas, &mut lumps[Q2_LUMP_AREAS]);
        write_records(&$self.dareaportals, &mut lumps[Q2_LUMP_AREAPORTALS]);
        lumps
    }};
}

/// Vanilla Quake II document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Q2Bsp {
    pub dmodels: Vec<DModelQ2>,
    pub dvisdata: Vec<u8>,
    pub dlightdata: Vec<u8>,
    pub dentdata: String,
    pub dleafs: Vec<DLeafQ2>,
    pub dplanes: Vec<DPlane>,
    pub dvertexes: Vec<DVertex>,
    pub dnodes: Vec<DNodeQ2>,
    pub texinfo: Vec<DTexinfoQ2>,
    pub dfaces: Vec<DFaceQ2>,
    pub dedges: Vec<DEdge>,
    pub dleaffaces: Vec<u16>,
    pub dleafbrushes: Vec<u16>,
    pub dsurfedges: Vec<i32>,
    pub dareas: Vec<DArea>,
    pub dareaportals: Vec<DAreaPortal>,
    pub dbrushes: Vec<DBrush>,
    pub dbrushsides: Vec<DBrushSideQ2>,
    pub dpop: Vec<u8>,
}

impl Q2Bsp {
    pub(crate) fn parse(file: &[u8], lumps: &[Lump]) -> BspResult<Self> {
        q2_parse_body!(Q2Bsp, file, lumps,
            node: DNodeQ2, face: DFaceQ2, leaf: DLeafQ2, side: DBrushSideQ2,
            mark: u16, brushref: u16, edge: DEdge)
    }

    pub(crate) fn serialize_lumps(&self) -> Vec<Vec<u8>> {
        q2_serialize_body!(self)
    }

    pub fn to_mbsp(&self) -> MBsp {
        MBsp {
            dmodels: self.dmodels.iter().map(MModel::from).collect(),
            dvisdata: self.dvisdata.clone(),
            dlightdata: self.dlightdata.clone(),
            dentdata: self.dentdata.clone(),
            dleafs: self.dleafs.iter().map(MLeaf::from).collect(),
            dplanes: self.dplanes.clone(),
            dvertexes: self.dvertexes.clone(),
            dnodes: self.dnodes.iter().map(MNode::from).collect(),
            texinfo: self.texinfo.iter().map(MTexinfo::from).collect(),
            dfaces: self.dfaces.iter().map(MFace::from).collect(),
            dedges: self.dedges.iter().map(DEdge32::from).collect(),
            dmarksurfaces: self.dleaffaces.iter().map(|&m| m as u32).collect(),
            dleafbrushes: self.dleafbrushes.iter().map(|&b| b as u32).collect(),
            dsurfedges: self.dsurfedges.clone(),
            dareas: self.dareas.clone(),
            dareaportals: self.dareaportals.clone(),
            dbrushes: self.dbrushes.clone(),
            dbrushsides: self.dbrushsides.iter().map(MBrushSide::from).collect(),
            dpop: self.dpop.clone(),
            ..MBsp::default()
        }
    }

    pub fn from_mbsp(mbsp: &MBsp) -> BspResult<Self> {
        Ok(Q2Bsp {
            dmodels: mbsp.dmodels.iter().map(DModelQ2::from).collect(),
            dvisdata: mbsp.dvisdata.clone(),
            dlightdata: mbsp.dlightdata.clone(),
            dentdata: mbsp.dentdata.clone(),
            dleafs: mbsp
                .dleafs
                .iter()
                .map(DLeafQ2::try_from)
                .collect::<BspResult<_>>()?,
            dplanes: mbsp.dplanes.clone(),
            dvertexes: mbsp.dvertexes.clone(),
            dnodes: mbsp
                .dnodes
                .iter()
                .map(DNodeQ2::try_from)
                .collect::<BspResult<_>>()?,
            texinfo: mbsp.texinfo.iter().map(DTexinfoQ2::from).collect(),
            dfaces: mbsp
                .dfaces
                .iter()
                .map(DFaceQ2::try_from)
                .collect::<BspResult<_>>()?,
            dedges: mbsp
                .dedges
                .iter()
                .map(DEdge::try_from)
                .collect::<BspResult<_>>()?,
            dleaffaces: mbsp
                .dmarksurfaces
                .iter()
                .map(|&m| numeric_cast_u16(m as i64, "leaffaces"))
                .collect::<BspResult<_>>()?,
            dleafbrushes: mbsp
                .dleafbrushes
                .iter()
                .map(|&b| numeric_cast_u16(b as i64, "leafbrushes"))
                .collect::<BspResult<_>>()?,
            dsurfedges: mbsp.dsurfedges.clone(),
            dareas: mbsp.dareas.clone(),
            dareaportals: mbsp.dareaportals.clone(),
            dbrushes: mbsp.dbrushes.clone(),
            dbrushsides: mbsp
                .dbrushsides
                .iter()
                .map(DBrushSideQ2::try_from)
                .collect::<BspResult<_>>()?,
            dpop: mbsp.dpop.clone(),
        })
    }
}

/// Qbism extended Quake II document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QbismBsp {
    pub dmodels: Vec<DModelQ2>,
    pub dvisdata: Vec<u8>,
    pub dlightdata: Vec<u8>,
    pub dentdata: String,
    pub dleafs: Vec<DLeafQbism>,
    pub dplanes: Vec<DPlane>,
    pub dvertexes: Vec<DVertex>,
    pub dnodes: Vec<DNodeQbism>,
    pub texinfo: Vec<DTexinfoQ2>,
    pub dfaces: Vec<DFaceQbism>,
    pub dedges: Vec<DEdge32>,
    pub dleaffaces: Vec<u32>,
    pub dleafbrushes: Vec<u32>,
    pub dsurfedges: Vec<i32>,
    pub dareas: Vec<DArea>,
    pub dareaportals: Vec<DAreaPortal>,
    pub dbrushes: Vec<DBrush>,
    pub dbrushsides: Vec<DBrushSideQbism>,
    pub dpop: Vec<u8>,
}

impl QbismBsp {
    pub(crate) fn parse(file: &[u8], lumps: &[Lump]) -> BspResult<Self> {
        q2_parse_body!(QbismBsp, file, lumps,
            node: DNodeQbism, face: DFaceQbism, leaf: DLeafQbism, side: DBrushSideQbism,
            mark: u32, brushref: u32, edge: DEdge32)
    }

    pub(crate) fn serialize_lumps(&self) -> Vec<Vec<u8>> {
        q2_serialize_body!(self)
    }

    pub fn to_mbsp(&self) -> MBsp {
        MBsp {
            dmodels: self.dmodels.iter().map(MModel::from).collect(),
            dvisdata: self.dvisdata.clone(),
            dlightdata: self.dlightdata.clone(),
            dentdata: self.dentdata.clone(),
            dleafs: self.dleafs.iter().map(MLeaf::from).collect(),
            dplanes: self.dplanes.clone(),
            dvertexes: self.dvertexes.clone(),
            dnodes: self.dnodes.iter().map(MNode::from).collect(),
            texinfo: self.texinfo.iter().map(MTexinfo::from).collect(),
            dfaces: self.dfaces.iter().map(MFace::from).collect(),
            dedges: self.dedges.clone(),
            dmarksurfaces: self.dleaffaces.clone(),
            dleafbrushes: self.dleafbrushes.clone(),
            dsurfedges: self.dsurfedges.clone(),
            dareas: self.dareas.clone(),
            dareaportals: self.dareaportals.clone(),
            dbrushes: self.dbrushes.clone(),
            dbrushsides: self.dbrushsides.iter().map(MBrushSide::from).collect(),
            dpop: self.dpop.clone(),
            ..MBsp::default()
        }
    }

    pub fn from_mbsp(mbsp: &MBsp) -> BspResult<Self> {
        Ok(QbismBsp {
            dmodels: mbsp.dmodels.iter().map(DModelQ2::from).collect(),
            dvisdata: mbsp.dvisdata.clone(),
            dlightdata: mbsp.dlightdata.clone(),
            dentdata: mbsp.dentdata.clone(),
            dleafs: mbsp.dleafs.iter().map(DLeafQbism::from).collect(),
            dplanes: mbsp.dplanes.clone(),
            dvertexes: mbsp.dvertexes.clone(),
            dnodes: mbsp.dnodes.iter().map(DNodeQbism::from).collect(),
            texinfo: mbsp.texinfo.iter().map(DTexinfoQ2::from).collect(),
            dfaces: mbsp.dfaces.iter().map(DFaceQbism::from).collect(),
            dedges: mbsp.dedges.clone(),
            dleaffaces: mbsp.dmarksurfaces.clone(),
            dleafbrushes: mbsp.dleafbrushes.clone(),
            dsurfedges: mbsp.dsurfedges.clone(),
            dareas: mbsp.dareas.clone(),
            dareaportals: mbsp.dareaportals.clone(),
            dbrushes: mbsp.dbrushes.clone(),
            dbrushsides: mbsp.dbrushsides.iter().map(DBrushSideQbism::from).collect(),
            dpop: mbsp.dpop.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::q_shared::Q2_CONTENTS_SOLID;
    use std::mem::size_of;

    #[test]
    fn size_of_q2_records() {
        assert_eq!(size_of::<DTexinfoQ2>(), DTexinfoQ2::DISK_SIZE);
        assert_eq!(size_of::<DNodeQ2>(), DNodeQ2::DISK_SIZE);
        assert_eq!(size_of::<DFaceQ2>(), DFaceQ2::DISK_SIZE);
        assert_eq!(size_of::<DLeafQ2>(), DLeafQ2::DISK_SIZE);
        assert_eq!(size_of::<DBrushSideQ2>(), DBrushSideQ2::DISK_SIZE);
        assert_eq!(size_of::<DModelQ2>(), DModelQ2::DISK_SIZE);
        assert_eq!(size_of::<DNodeQbism>(), DNodeQbism::DISK_SIZE);
        assert_eq!(size_of::<DFaceQbism>(), DFaceQbism::DISK_SIZE);
        assert_eq!(size_of::<DLeafQbism>(), DLeafQbism::DISK_SIZE);
        assert_eq!(size_of::<DBrushSideQbism>(), DBrushSideQbism::DISK_SIZE);
    }

    #[test]
    fn test_texname_codec() {
        assert_eq!(texname_from_bytes(&texname_to_bytes("e1u1/floor1_3")), "e1u1/floor1_3");

        // a name that fills the field keeps no terminator on disk
        let full = [b'a'; Q2_TEXNAME_LEN];
        assert_eq!(texname_from_bytes(&full), "a".repeat(32));

        // writing truncates to keep the terminator
        let truncated = texname_to_bytes(&"b".repeat(40));
        assert_eq!(truncated[Q2_TEXNAME_LEN - 1], 0);
        assert_eq!(texname_from_bytes(&truncated), "b".repeat(31));
    }

    #[test]
    fn test_texinfo_roundtrip() {
        let ti = DTexinfoQ2 {
            vecs: TexVecs([[1.0, 0.0, 0.0, 16.0], [0.0, -1.0, 0.0, 0.0]]),
            flags: 0x1,
            value: 300,
            texture: texname_to_bytes("e1u1/sky1"),
            nexttexinfo: -1,
        };
        let mut buf = Vec::new();
        ti.write(&mut buf);
        assert_eq!(buf.len(), DTexinfoQ2::DISK_SIZE);
        let back = DTexinfoQ2::read(&mut BspReader::new(&buf)).unwrap();
        assert_eq!(back, ti);

        let wide = MTexinfo::from(&ti);
        assert_eq!(wide.texture, "e1u1/sky1");
        assert_eq!(wide.value, 300);
        assert_eq!(DTexinfoQ2::from(&wide), ti);
    }

    #[test]
    fn test_node_widen_narrow() {
        let node = DNodeQ2 {
            planenum: 4,
            children: [100000, -7],
            mins: [-512, -512, -64],
            maxs: [512, 512, 256],
            firstface: 12,
            numfaces: 2,
        };
        let wide = MNode::from(&node);
        // children are already 32-bit in vanilla, so big values survive
        assert_eq!(wide.children, [100000, -7]);
        assert_eq!(DNodeQ2::try_from(&wide).unwrap(), node);
    }

    #[test]
    fn test_node_face_count_overflow() {
        let wide = MNode {
            firstface: 90000,
            ..MNode::default()
        };
        let err = DNodeQ2::try_from(&wide).unwrap_err();
        assert!(matches!(
            err,
            BspError::NumericOverflow {
                field: "DNodeQ2::firstface",
                ..
            }
        ));
        assert_eq!(DNodeQbism::from(&wide).firstface, 90000);
    }

    #[test]
    fn test_leaf_cluster_sign_extension() {
        let leaf = DLeafQ2 {
            contents: Q2_CONTENTS_SOLID,
            cluster: -1,
            area: 0,
            mins: [0; 3],
            maxs: [0; 3],
            firstleafface: 0,
            numleaffaces: 0,
            firstleafbrush: 0,
            numleafbrushes: 0,
        };
        let wide = MLeaf::from(&leaf);
        assert_eq!(wide.cluster, -1);
        assert_eq!(DLeafQ2::try_from(&wide).unwrap(), leaf);

        let big = MLeaf {
            cluster: 40000,
            ..MLeaf::default()
        };
        assert!(DLeafQ2::try_from(&big).is_err());
        assert_eq!(DLeafQbism::from(&big).cluster, 40000);
    }

    #[test]
    fn test_face_planenum_is_unsigned() {
        // 40000 overflows the Quake i16 planenum but fits Quake II's u16
        let wide = MFace {
            planenum: 40000,
            ..MFace::default()
        };
        assert_eq!(DFaceQ2::try_from(&wide).unwrap().planenum, 40000);

        let too_big = MFace {
            planenum: 70000,
            ..MFace::default()
        };
        assert!(DFaceQ2::try_from(&too_big).is_err());
        assert_eq!(DFaceQbism::from(&too_big).planenum, 70000);
    }

    #[test]
    fn test_model_single_headnode() {
        let model = DModelQ2 {
            mins: [-16.0, -16.0, 0.0],
            maxs: [16.0, 16.0, 32.0],
            origin: [0.0; 3],
            headnode: 5,
            firstface: 2,
            numfaces: 4,
        };
        let wide = MModel::from(&model);
        assert_eq!(wide.headnode[0], 5);
        assert_eq!(wide.headnode[1], 0);
        assert_eq!(DModelQ2::from(&wide), model);
    }

    fn sample_q2bsp() -> Q2Bsp {
        Q2Bsp {
            dmodels: vec![DModelQ2 {
                maxs: [64.0, 64.0, 64.0],
                numfaces: 1,
                ..DModelQ2::default()
            }],
            dvisdata: vec![1, 0, 0, 0],
            dlightdata: vec![7; 3],
            dentdata: "{\n\"classname\" \"worldspawn\"\n}\n".to_string(),
            dleafs: vec![DLeafQ2 {
                contents: Q2_CONTENTS_SOLID,
                cluster: -1,
                area: 1,
                mins: [-64, -64, -64],
                maxs: [64, 64, 64],
                firstleafface: 0,
                numleaffaces: 1,
                firstleafbrush: 0,
                numleafbrushes: 1,
            }],
            dplanes: vec![DPlane {
                normal: [1.0, 0.0, 0.0],
                dist: 64.0,
                plane_type: 0,
            }],
            dvertexes: vec![DVertex {
                point: [64.0, 0.0, 0.0],
            }],
            dnodes: vec![DNodeQ2 {
                planenum: 0,
                children: [-1, -2],
                mins: [-64, -64, -64],
                maxs: [64, 64, 64],
                firstface: 0,
                numfaces: 1,
            }],
            texinfo: vec![DTexinfoQ2 {
                texture: texname_to_bytes("e1u1/floor1_3"),
                ..DTexinfoQ2::default()
            }],
            dfaces: vec![DFaceQ2 {
                planenum: 0,
                side: 0,
                firstedge: 0,
                numedges: 4,
                texinfo: 0,
                styles: [0, 255, 255, 255],
                lightofs: 0,
            }],
            dedges: vec![DEdge { v: [0, 0] }],
            dleaffaces: vec![0],
            dleafbrushes: vec![0],
            dsurfedges: vec![1],
            dareas: vec![DArea {
                numareaportals: 0,
                firstareaportal: 0,
            }],
            dareaportals: vec![DAreaPortal {
                portalnum: 0,
                otherarea: 0,
            }],
            dbrushes: vec![DBrush {
                firstside: 0,
                numsides: 1,
                contents: Q2_CONTENTS_SOLID,
            }],
            dbrushsides: vec![DBrushSideQ2 {
                planenum: 0,
                texinfo: 0,
            }],
            dpop: Vec::new(),
        }
    }

    #[test]
    fn test_q2bsp_mbsp_roundtrip() {
        let doc = sample_q2bsp();
        let mbsp = doc.to_mbsp();
        assert_eq!(mbsp.dleafs[0].cluster, -1);
        assert_eq!(mbsp.dbrushes[0].contents, Q2_CONTENTS_SOLID);
        assert_eq!(mbsp.texinfo[0].texture, "e1u1/floor1_3");

        let back = Q2Bsp::from_mbsp(&mbsp).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_q2bsp_upgrades_to_qbism() {
        let doc = sample_q2bsp();
        let mbsp = doc.to_mbsp();
        let qbism = QbismBsp::from_mbsp(&mbsp).unwrap();
        assert_eq!(qbism.dleafs[0].cluster, -1);
        assert_eq!(qbism.dleafs[0].mins, [-64.0, -64.0, -64.0]);
        assert_eq!(qbism.dbrushsides[0].planenum, 0u32);

        let down = Q2Bsp::from_mbsp(&qbism.to_mbsp()).unwrap();
        assert_eq!(down, doc);
    }

    #[test]
    fn test_brushside_narrowing() {
        let side = MBrushSide {
            planenum: 70000,
            texinfo: 3,
        };
        assert!(matches!(
            DBrushSideQ2::try_from(&side),
            Err(BspError::NumericOverflow {
                field: "DBrushSideQ2::planenum",
                ..
            })
        ));
        assert_eq!(DBrushSideQbism::from(&side).planenum, 70000);
    }
}
