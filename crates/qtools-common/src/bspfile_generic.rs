// bspfile_generic.rs - limit-free in-memory BSP document

use crate::contentflags::SurfFlags;
use crate::q_shared::Vec3;
use crate::qfiles::{
    DArea, DAreaPortal, DBrush, DEdge32, DPlane, DVertex, TexVecs, MAXLIGHTMAPS,
    MAX_MAP_HULLS_H2, NUM_AMBIENTS,
};

// Every native format widens into these records without loss; going the
// other way narrows and can fail. Field widths are the largest any
// supported format stores.

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MModel {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub origin: Vec3,
    /// One tree root per hull. Quake fills the first four, Hexen II all
    /// eight, Quake II only the first.
    pub headnode: [i32; MAX_MAP_HULLS_H2],
    pub visleafs: i32,
    pub firstface: i32,
    pub numfaces: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MNode {
    pub planenum: i32,
    /// Negative children are -(leafnum + 1).
    pub children: [i32; 2],
    pub mins: Vec3,
    pub maxs: Vec3,
    pub firstface: u32,
    pub numfaces: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MFace {
    pub planenum: u32,
    pub side: i32,
    pub firstedge: i32,
    pub numedges: i32,
    pub texinfo: i32,
    pub styles: [u8; MAXLIGHTMAPS],
    pub lightofs: i32,
}

impl Default for MFace {
    fn default() -> Self {
        MFace {
            planenum: 0,
            side: 0,
            firstedge: 0,
            numedges: 0,
            texinfo: 0,
            styles: [255; MAXLIGHTMAPS],
            lightofs: -1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MClipnode {
    pub planenum: i32,
    /// Negative children are content values.
    pub children: [i32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MLeaf {
    pub contents: i32,
    pub visofs: i32,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub firstmarksurface: u32,
    pub nummarksurfaces: u32,
    pub ambient_level: [u8; NUM_AMBIENTS],
    pub cluster: i32,
    pub area: i32,
    pub firstleafbrush: u32,
    pub numleafbrushes: u32,
}

impl Default for MLeaf {
    fn default() -> Self {
        MLeaf {
            contents: 0,
            visofs: -1,
            mins: [0.0; 3],
            maxs: [0.0; 3],
            firstmarksurface: 0,
            nummarksurfaces: 0,
            ambient_level: [0; NUM_AMBIENTS],
            cluster: -1,
            area: 0,
            firstleafbrush: 0,
            numleafbrushes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MTexinfo {
    pub vecs: TexVecs,
    pub flags: SurfFlags,
    /// Index into the textures lump (Quake family).
    pub miptex: i32,
    /// Light emission or whatever the surface flags need (Quake II).
    pub value: i32,
    pub texture: String,
    pub nexttexinfo: i32,
}

impl Default for MTexinfo {
    fn default() -> Self {
        MTexinfo {
            vecs: TexVecs::default(),
            flags: SurfFlags::default(),
            miptex: 0,
            value: 0,
            texture: String::new(),
            nexttexinfo: -1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MBrushSide {
    pub planenum: u32,
    pub texinfo: i32,
}

/// The in-memory document all conversions route through. Field names
/// follow the on-disk lump names.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MBsp {
    pub dmodels: Vec<MModel>,
    pub dvisdata: Vec<u8>,
    pub dlightdata: Vec<u8>,
    pub dtexdata: Vec<u8>,
    pub dentdata: String,
    pub dleafs: Vec<MLeaf>,
    pub dplanes: Vec<DPlane>,
    pub dvertexes: Vec<DVertex>,
    pub dnodes: Vec<MNode>,
    pub texinfo: Vec<MTexinfo>,
    pub dfaces: Vec<MFace>,
    pub dclipnodes: Vec<MClipnode>,
    pub dedges: Vec<DEdge32>,
    pub dmarksurfaces: Vec<u32>,
    pub dsurfedges: Vec<i32>,
    pub dbrushsides: Vec<MBrushSide>,
    pub dbrushes: Vec<DBrush>,
    pub dleafbrushes: Vec<u32>,
    pub dpop: Vec<u8>,
    pub dareas: Vec<DArea>,
    pub dareaportals: Vec<DAreaPortal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(MFace::default().lightofs, -1);
        assert_eq!(MFace::default().styles, [255; MAXLIGHTMAPS]);
        assert_eq!(MLeaf::default().visofs, -1);
        assert_eq!(MLeaf::default().cluster, -1);
        assert_eq!(MTexinfo::default().nexttexinfo, -1);

        let bsp = MBsp::default();
        assert!(bsp.dmodels.is_empty());
        assert!(bsp.dentdata.is_empty());
    }

    #[test]
    fn test_model_hull_capacity() {
        let model = MModel::default();
        assert_eq!(model.headnode.len(), MAX_MAP_HULLS_H2);
    }
}
