// bspfile.rs - format registry, detection, and the load/write/convert engine

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use crate::bspfile_generic::MBsp;
use crate::bspfile_q1::{
    Bsp2, Bsp29, Bsp2Rmq, DClipnode2, DClipnode29, DFace2, DFace29, DLeaf2, DLeaf29, DLeaf2Rmq,
    DNode2, DNode29, DNode2Rmq, DTexinfoQ1, DMODEL_H2_SIZE, DMODEL_Q1_SIZE,
};
use crate::bspfile_q2::{
    DBrushSideQ2, DBrushSideQbism, DFaceQ2, DFaceQbism, DLeafQ2, DLeafQbism, DModelQ2, DNodeQ2,
    DNodeQbism, DTexinfoQ2, Q2Bsp, QbismBsp,
};
use crate::bspxfile::BspxEntries;
use crate::error::{BspError, BspResult};
use crate::gamedef::{
    GameDef, GameId, GAME_GENERIC, GAME_HALF_LIFE, GAME_HEXEN_II, GAME_QUAKE, GAME_QUAKE_II,
};
use crate::q_shared::com_parse;
use crate::qfiles::*;
use crate::stream::{align4, put_i32, write_records, BspReader, LumpRecord};

// ============================================================
// Lump descriptors
// ============================================================

/// Static description of one lump slot: its name, the size of one
/// record, and the classic tool limit it is measured against in
/// diagnostics. Raw and text lumps have size 1 and count in bytes.
#[derive(Debug, Clone, Copy)]
pub struct LumpSpec {
    pub name: &'static str,
    pub size: usize,
    pub limit: Option<usize>,
}

impl LumpSpec {
    const fn new(name: &'static str, size: usize, limit: Option<usize>) -> Self {
        LumpSpec { name, size, limit }
    }
}

const LUMPS_BSP29: [LumpSpec; Q1_HEADER_LUMPS] = [
    LumpSpec::new("entities", 1, Some(MAX_MAP_ENTSTRING)),
    LumpSpec::new("planes", DPlane::DISK_SIZE, Some(MAX_MAP_PLANES)),
    LumpSpec::new("textures", 1, Some(MAX_MAP_MIPTEX)),
    LumpSpec::new("vertexes", DVertex::DISK_SIZE, Some(MAX_MAP_VERTS)),
    LumpSpec::new("visibility", 1, Some(MAX_MAP_VISIBILITY)),
    LumpSpec::new("nodes", DNode29::DISK_SIZE, Some(MAX_MAP_NODES)),
    LumpSpec::new("texinfo", DTexinfoQ1::DISK_SIZE, Some(MAX_MAP_TEXINFO)),
    LumpSpec::new("faces", DFace29::DISK_SIZE, Some(MAX_MAP_FACES)),
    LumpSpec::new("lighting", 1, Some(MAX_MAP_LIGHTING)),
    LumpSpec::new("clipnodes", DClipnode29::DISK_SIZE, Some(MAX_MAP_CLIPNODES)),
    LumpSpec::new("leafs", DLeaf29::DISK_SIZE, Some(MAX_MAP_LEAFS)),
    LumpSpec::new("marksurfaces", 2, Some(MAX_MAP_MARKSURFACES)),
    LumpSpec::new("edges", DEdge::DISK_SIZE, Some(MAX_MAP_EDGES)),
    LumpSpec::new("surfedges", 4, Some(MAX_MAP_SURFEDGES)),
    LumpSpec::new("models", DMODEL_Q1_SIZE, Some(MAX_MAP_MODELS)),
];

const LUMPS_H2: [LumpSpec; Q1_HEADER_LUMPS] = [
    LumpSpec::new("entities", 1, Some(MAX_MAP_ENTSTRING)),
    LumpSpec::new("planes", DPlane::DISK_SIZE, Some(MAX_MAP_PLANES)),
    LumpSpec::new("textures", 1, Some(MAX_MAP_MIPTEX)),
    LumpSpec::new("vertexes", DVertex::DISK_SIZE, Some(MAX_MAP_VERTS)),
    LumpSpec::new("visibility", 1, Some(MAX_MAP_VISIBILITY)),
    LumpSpec::new("nodes", DNode29::DISK_SIZE, Some(MAX_MAP_NODES)),
    LumpSpec::new("texinfo", DTexinfoQ1::DISK_SIZE, Some(MAX_MAP_TEXINFO)),
    LumpSpec::new("faces", DFace29::DISK_SIZE, Some(MAX_MAP_FACES)),
    LumpSpec::new("lighting", 1, Some(MAX_MAP_LIGHTING)),
    LumpSpec::new("clipnodes", DClipnode29::DISK_SIZE, Some(MAX_MAP_CLIPNODES)),
    LumpSpec::new("leafs", DLeaf29::DISK_SIZE, Some(MAX_MAP_LEAFS)),
    LumpSpec::new("marksurfaces", 2, Some(MAX_MAP_MARKSURFACES)),
    LumpSpec::new("edges", DEdge::DISK_SIZE, Some(MAX_MAP_EDGES)),
    LumpSpec::new("surfedges", 4, Some(MAX_MAP_SURFEDGES)),
    LumpSpec::new("models", DMODEL_H2_SIZE, Some(MAX_MAP_MODELS)),
];

const LUMPS_BSP2RMQ: [LumpSpec; Q1_HEADER_LUMPS] = [
    LumpSpec::new("entities", 1, None),
    LumpSpec::new("planes", DPlane::DISK_SIZE, None),
    LumpSpec::new("textures", 1, None),
    LumpSpec::new("vertexes", DVertex::DISK_SIZE, None),
    LumpSpec::new("visibility", 1, None),
    LumpSpec::new("nodes", DNode2Rmq::DISK_SIZE, None),
    LumpSpec::new("texinfo", DTexinfoQ1::DISK_SIZE, None),
    LumpSpec::new("faces", DFace2::DISK_SIZE, None),
    LumpSpec::new("lighting", 1, None),
    LumpSpec::new("clipnodes", DClipnode2::DISK_SIZE, None),
    LumpSpec::new("leafs", DLeaf2Rmq::DISK_SIZE, None),
    LumpSpec::new("marksurfaces", 4, None),
    LumpSpec::new("edges", DEdge32::DISK_SIZE, None),
    LumpSpec::new("surfedges", 4, None),
    LumpSpec::new("models", DMODEL_Q1_SIZE, None),
];

const LUMPS_H2_BSP2RMQ: [LumpSpec; Q1_HEADER_LUMPS] = [
    LumpSpec::new("entities", 1, None),
    LumpSpec::new("planes", DPlane::DISK_SIZE, None),
    LumpSpec::new("textures", 1, None),
    LumpSpec::new("vertexes", DVertex::DISK_SIZE, None),
    LumpSpec::new("visibility", 1, None),
    LumpSpec::new("nodes", DNode2Rmq::DISK_SIZE, None),
    LumpSpec::new("texinfo", DTexinfoQ1::DISK_SIZE, None),
    LumpSpec::new("faces", DFace2::DISK_SIZE, None),
    LumpSpec::new("lighting", 1, None),
    LumpSpec::new("clipnodes", DClipnode2::DISK_SIZE, None),
    LumpSpec::new("leafs", DLeaf2Rmq::DISK_SIZE, None),
    LumpSpec::new("marksurfaces", 4, None),
    LumpSpec::new("edges", DEdge32::DISK_SIZE, None),
    LumpSpec::new("surfedges", 4, None),
    LumpSpec::new("models", DMODEL_H2_SIZE, None),
];

const LUMPS_BSP2: [LumpSpec; Q1_HEADER_LUMPS] = [
    LumpSpec::new("entities", 1, None),
    LumpSpec::new("planes", DPlane::DISK_SIZE, None),
    LumpSpec::new("textures", 1, None),
    LumpSpec::new("vertexes", DVertex::DISK_SIZE, None),
    LumpSpec::new("visibility", 1, None),
    LumpSpec::new("nodes", DNode2::DISK_SIZE, None),
    LumpSpec::new("texinfo", DTexinfoQ1::DISK_SIZE, None),
    LumpSpec::new("faces", DFace2::DISK_SIZE, None),
    LumpSpec::new("lighting", 1, None),
    LumpSpec::new("clipnodes", DClipnode2::DISK_SIZE, None),
    LumpSpec::new("leafs", DLeaf2::DISK_SIZE, None),
    LumpSpec::new("marksurfaces", 4, None),
    LumpSpec::new("edges", DEdge32::DISK_SIZE, None),
    LumpSpec::new("surfedges", 4, None),
    LumpSpec::new("models", DMODEL_Q1_SIZE, None),
];

const LUMPS_H2_BSP2: [LumpSpec; Q1_HEADER_LUMPS] = [
    LumpSpec::new("entities", 1, None),
    LumpSpec::new("planes", DPlane::DISK_SIZE, None),
    LumpSpec::new("textures", 1, None),
    LumpSpec::new("vertexes", DVertex::DISK_SIZE, None),
    LumpSpec::new("visibility", 1, None),
    LumpSpec::new("nodes", DNode2::DISK_SIZE, None),
    LumpSpec::new("texinfo", DTexinfoQ1::DISK_SIZE, None),
    LumpSpec::new("faces", DFace2::DISK_SIZE, None),
    LumpSpec::new("lighting", 1, None),
    LumpSpec::new("clipnodes", DClipnode2::DISK_SIZE, None),
    LumpSpec::new("leafs", DLeaf2::DISK_SIZE, None),
    LumpSpec::new("marksurfaces", 4, None),
    LumpSpec::new("edges", DEdge32::DISK_SIZE, None),
    LumpSpec::new("surfedges", 4, None),
    LumpSpec::new("models", DMODEL_H2_SIZE, None),
];

const LUMPS_Q2: [LumpSpec; Q2_HEADER_LUMPS] = [
    LumpSpec::new("entities", 1, Some(Q2_MAX_MAP_ENTSTRING)),
    LumpSpec::new("planes", DPlane::DISK_SIZE, Some(Q2_MAX_MAP_PLANES)),
    LumpSpec::new("vertexes", DVertex::DISK_SIZE, Some(Q2_MAX_MAP_VERTS)),
    LumpSpec::new("visibility", 1, Some(Q2_MAX_MAP_VISIBILITY)),
    LumpSpec::new("nodes", DNodeQ2::DISK_SIZE, Some(Q2_MAX_MAP_NODES)),
    LumpSpec::new("texinfo", DTexinfoQ2::DISK_SIZE, Some(Q2_MAX_MAP_TEXINFO)),
    LumpSpec::new("faces", DFaceQ2::DISK_SIZE, Some(Q2_MAX_MAP_FACES)),
    LumpSpec::new("lighting", 1, Some(Q2_MAX_MAP_LIGHTING)),
    LumpSpec::new("leafs", DLeafQ2::DISK_SIZE, Some(Q2_MAX_MAP_LEAFS)),
    LumpSpec::new("leaffaces", 2, Some(Q2_MAX_MAP_LEAFFACES)),
    LumpSpec::new("leafbrushes", 2, Some(Q2_MAX_MAP_LEAFBRUSHES)),
    LumpSpec::new("edges", DEdge::DISK_SIZE, Some(Q2_MAX_MAP_EDGES)),
    LumpSpec::new("surfedges", 4, Some(Q2_MAX_MAP_SURFEDGES)),
    LumpSpec::new("models", DModelQ2::DISK_SIZE, Some(Q2_MAX_MAP_MODELS)),
    LumpSpec::new("brushes", DBrush::DISK_SIZE, Some(Q2_MAX_MAP_BRUSHES)),
    LumpSpec::new("brushsides", DBrushSideQ2::DISK_SIZE, Some(Q2_MAX_MAP_BRUSHSIDES)),
    LumpSpec::new("pop", 1, None),
    LumpSpec::new("areas", DArea::DISK_SIZE, Some(Q2_MAX_MAP_AREAS)),
    LumpSpec::new("areaportals", DAreaPortal::DISK_SIZE, Some(Q2_MAX_MAP_AREAPORTALS)),
];

const LUMPS_QBISM: [LumpSpec; Q2_HEADER_LUMPS] = [
    LumpSpec::new("entities", 1, None),
    LumpSpec::new("planes", DPlane::DISK_SIZE, None),
    LumpSpec::new("vertexes", DVertex::DISK_SIZE, None),
    LumpSpec::new("visibility", 1, None),
    LumpSpec::new("nodes", DNodeQbism::DISK_SIZE, None),
    LumpSpec::new("texinfo", DTexinfoQ2::DISK_SIZE, None),
    LumpSpec::new("faces", DFaceQbism::DISK_SIZE, None),
    LumpSpec::new("lighting", 1, None),
    LumpSpec::new("leafs", DLeafQbism::DISK_SIZE, None),
    LumpSpec::new("leaffaces", 4, None),
    LumpSpec::new("leafbrushes", 4, None),
    LumpSpec::new("edges", DEdge32::DISK_SIZE, None),
    LumpSpec::new("surfedges", 4, None),
    LumpSpec::new("models", DModelQ2::DISK_SIZE, None),
    LumpSpec::new("brushes", DBrush::DISK_SIZE, None),
    LumpSpec::new("brushsides", DBrushSideQbism::DISK_SIZE, None),
    LumpSpec::new("pop", 1, None),
    LumpSpec::new("areas", DArea::DISK_SIZE, None),
    LumpSpec::new("areaportals", DAreaPortal::DISK_SIZE, None),
];

const LUMPS_GENERIC: [LumpSpec; 0] = [];

// ============================================================
// Format registry
// ============================================================

/// Which structural document shape a format parses into. The three
/// Quake-family tiers are shared by their Hexen II siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Generic,
    Bsp29,
    Bsp2Rmq,
    Bsp2,
    Q2,
    Qbism,
}

/// One recognized format: how to match its header, how its lumps decode,
/// which game's semantics apply, and where to go when its limits are
/// outgrown.
pub struct BspVersion {
    pub ident: i32,
    /// Second header dword, present only in the Quake II family.
    pub version: Option<i32>,
    pub short_name: &'static str,
    pub name: &'static str,
    pub lumps: &'static [LumpSpec],
    pub game: &'static dyn GameDef,
    /// The same-game tier with wider fields, when one exists.
    pub extended: Option<&'static BspVersion>,
    pub kind: VariantKind,
}

impl fmt::Display for BspVersion {
    /// Version-carrying formats render as `IDNT:version`, the rest as
    /// their short name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(v) => write!(f, "{}:{}", ident_name(self.ident), v),
            None => write!(f, "{}", self.short_name),
        }
    }
}

impl fmt::Debug for BspVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BspVersion({})", self.short_name)
    }
}

pub static BSPVER_GENERIC: BspVersion = BspVersion {
    ident: MBSPIDENT,
    version: None,
    short_name: "mbsp",
    name: "generic BSP",
    lumps: &LUMPS_GENERIC,
    game: &GAME_GENERIC,
    extended: None,
    kind: VariantKind::Generic,
};

pub static BSPVER_29: BspVersion = BspVersion {
    ident: BSPVERSION,
    version: None,
    short_name: "bsp29",
    name: "Quake BSP29",
    lumps: &LUMPS_BSP29,
    game: &GAME_QUAKE,
    extended: Some(&BSPVER_2),
    kind: VariantKind::Bsp29,
};

pub static BSPVER_H2: BspVersion = BspVersion {
    ident: BSPVERSION,
    version: None,
    short_name: "hexen2",
    name: "Hexen II BSP29",
    lumps: &LUMPS_H2,
    game: &GAME_HEXEN_II,
    extended: Some(&BSPVER_H2_2),
    kind: VariantKind::Bsp29,
};

pub static BSPVER_2RMQ: BspVersion = BspVersion {
    ident: BSP2RMQVERSION,
    version: None,
    short_name: "bsp2rmq",
    name: "Quake BSP2-RMQ",
    lumps: &LUMPS_BSP2RMQ,
    game: &GAME_QUAKE,
    extended: Some(&BSPVER_2),
    kind: VariantKind::Bsp2Rmq,
};

pub static BSPVER_H2_2RMQ: BspVersion = BspVersion {
    ident: BSP2RMQVERSION,
    version: None,
    short_name: "hexen2bsp2rmq",
    name: "Hexen II BSP2-RMQ",
    lumps: &LUMPS_H2_BSP2RMQ,
    game: &GAME_HEXEN_II,
    extended: Some(&BSPVER_H2_2),
    kind: VariantKind::Bsp2Rmq,
};

pub static BSPVER_2: BspVersion = BspVersion {
    ident: BSP2VERSION,
    version: None,
    short_name: "bsp2",
    name: "Quake BSP2",
    lumps: &LUMPS_BSP2,
    game: &GAME_QUAKE,
    extended: None,
    kind: VariantKind::Bsp2,
};

pub static BSPVER_H2_2: BspVersion = BspVersion {
    ident: BSP2VERSION,
    version: None,
    short_name: "hexen2bsp2",
    name: "Hexen II BSP2",
    lumps: &LUMPS_H2_BSP2,
    game: &GAME_HEXEN_II,
    extended: None,
    kind: VariantKind::Bsp2,
};

pub static BSPVER_HL: BspVersion = BspVersion {
    ident: BSPHLVERSION,
    version: None,
    short_name: "hl",
    name: "Half-Life BSP30",
    lumps: &LUMPS_BSP29,
    game: &GAME_HALF_LIFE,
    extended: None,
    kind: VariantKind::Bsp29,
};

pub static BSPVER_Q2: BspVersion = BspVersion {
    ident: IDBSPHEADER,
    version: Some(Q2_BSPVERSION),
    short_name: "q2bsp",
    name: "Quake II IBSP",
    lumps: &LUMPS_Q2,
    game: &GAME_QUAKE_II,
    extended: Some(&BSPVER_QBISM),
    kind: VariantKind::Q2,
};

pub static BSPVER_QBISM: BspVersion = BspVersion {
    ident: QBISMHEADER,
    version: Some(Q2_BSPVERSION),
    short_name: "qbism",
    name: "Quake II Qbism QBSP",
    lumps: &LUMPS_QBISM,
    game: &GAME_QUAKE_II,
    extended: None,
    kind: VariantKind::Qbism,
};

/// Every recognized format. Quake entries precede their Hexen II
/// siblings so header lookup lands on Quake first; the loader refines
/// to the sibling from the models lump.
pub static BSPVERSIONS: [&BspVersion; 10] = [
    &BSPVER_GENERIC,
    &BSPVER_29,
    &BSPVER_H2,
    &BSPVER_2,
    &BSPVER_H2_2,
    &BSPVER_2RMQ,
    &BSPVER_H2_2RMQ,
    &BSPVER_HL,
    &BSPVER_Q2,
    &BSPVER_QBISM,
];

fn find_registry_conflict(
    versions: &[&'static BspVersion],
) -> Option<(&'static str, &'static str)> {
    for (i, a) in versions.iter().enumerate() {
        for b in &versions[i + 1..] {
            if a.ident != b.ident || a.version != b.version {
                continue;
            }
            // Quake and Hexen II deliberately share a shell; the models
            // record size tells them apart after the header is read.
            let pair = (a.game.id(), b.game.id());
            if pair == (GameId::Quake, GameId::Hexen2) || pair == (GameId::Hexen2, GameId::Quake)
            {
                continue;
            }
            return Some((a.short_name, b.short_name));
        }
    }
    None
}

static REGISTRY_CONFLICT: OnceLock<Option<(&'static str, &'static str)>> = OnceLock::new();

/// Check the registry for entries that would make header detection
/// ambiguous. Runs once; later calls reuse the verdict.
pub fn validate_format_registry() -> BspResult<()> {
    match REGISTRY_CONFLICT.get_or_init(|| find_registry_conflict(&BSPVERSIONS)) {
        None => Ok(()),
        Some(pair) => Err(BspError::FormatAmbiguous {
            first: pair.0,
            second: pair.1,
        }),
    }
}

fn lookup_version(ident: i32, version: Option<i32>) -> Option<&'static BspVersion> {
    BSPVERSIONS
        .iter()
        .copied()
        .find(|v| v.kind != VariantKind::Generic && v.ident == ident && v.version == version)
}

fn hexen2_sibling(version: &'static BspVersion) -> Option<&'static BspVersion> {
    if std::ptr::eq(version, &BSPVER_29) {
        Some(&BSPVER_H2)
    } else if std::ptr::eq(version, &BSPVER_2RMQ) {
        Some(&BSPVER_H2_2RMQ)
    } else if std::ptr::eq(version, &BSPVER_2) {
        Some(&BSPVER_H2_2)
    } else {
        None
    }
}

// ============================================================
// Documents
// ============================================================

/// The structural document, one concrete shape live at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BspVariant {
    #[default]
    None,
    M(MBsp),
    Bsp29(Bsp29),
    Bsp2Rmq(Bsp2Rmq),
    Bsp2(Bsp2),
    Q2(Q2Bsp),
    Qbism(QbismBsp),
}

impl BspVariant {
    pub fn name(&self) -> &'static str {
        match self {
            BspVariant::None => "none",
            BspVariant::M(_) => "mbsp",
            BspVariant::Bsp29(_) => "bsp29",
            BspVariant::Bsp2Rmq(_) => "bsp2rmq",
            BspVariant::Bsp2(_) => "bsp2",
            BspVariant::Q2(_) => "q2bsp",
            BspVariant::Qbism(_) => "qbism",
        }
    }

    /// The entities text of whichever shape is live.
    pub fn entdata(&self) -> &str {
        match self {
            BspVariant::None => "",
            BspVariant::M(m) => &m.dentdata,
            BspVariant::Bsp29(b) => &b.dentdata,
            BspVariant::Bsp2Rmq(b) => &b.dentdata,
            BspVariant::Bsp2(b) => &b.dentdata,
            BspVariant::Q2(b) => &b.dentdata,
            BspVariant::Qbism(b) => &b.dentdata,
        }
    }
}

/// A loaded or constructed map document. `version` is the format the
/// document currently holds; `loadversion` stays the format it was read
/// from disk as, surviving conversions.
#[derive(Debug, Clone)]
pub struct BspData {
    pub version: &'static BspVersion,
    pub loadversion: &'static BspVersion,
    pub bsp: BspVariant,
    pub bspx: BspxEntries,
}

impl Default for BspData {
    fn default() -> Self {
        BspData {
            version: &BSPVER_GENERIC,
            loadversion: &BSPVER_GENERIC,
            bsp: BspVariant::None,
            bspx: BspxEntries::new(),
        }
    }
}

impl BspData {
    pub fn new(version: &'static BspVersion, bsp: BspVariant) -> Self {
        BspData {
            version,
            loadversion: version,
            bsp,
            bspx: BspxEntries::new(),
        }
    }
}

// ============================================================
// Load
// ============================================================

/// Extract the map's display name from the entities text: the value of
/// the `message` key in the leading worldspawn block.
pub fn worldspawn_message(entdata: &str) -> Option<String> {
    let (token, mut rest) = com_parse(entdata);
    if token != "{" {
        return None;
    }
    while let Some(data) = rest {
        let (key, r) = com_parse(data);
        rest = r;
        if key.is_empty() || key == "}" {
            return None;
        }
        let (value, r) = com_parse(rest?);
        rest = r;
        if key == "message" {
            return Some(value);
        }
    }
    None
}

/// Load a BSP from disk, detecting the format from its header. Returns
/// the document and the map's embedded display name, when it has one.
pub fn load_bsp_file(path: &Path) -> BspResult<(BspData, Option<String>)> {
    validate_format_registry()?;
    let file = std::fs::read(path)?;
    let mut r = BspReader::new(&file);

    let ident = r.read_i32()?;
    let version = if BSPVERSIONS
        .iter()
        .any(|v| v.ident == ident && v.version.is_some())
    {
        Some(r.read_i32()?)
    } else {
        None
    };

    let mut loadversion =
        lookup_version(ident, version).ok_or(BspError::FormatUnrecognized { ident, version })?;

    let mut lumps = Vec::with_capacity(loadversion.lumps.len());
    for _ in 0..loadversion.lumps.len() {
        lumps.push(Lump::read(&mut r)?);
    }
    let header_end = r.position();

    // Hexen II shares the Quake header byte for byte; only the models
    // record size tells the two apart.
    if loadversion.game.id() == GameId::Quake {
        let models_len = lumps[LUMP_MODELS].filelen.max(0) as usize;
        if models_len % DMODEL_H2_SIZE == 0 && models_len % DMODEL_Q1_SIZE != 0 {
            if let Some(sibling) = hexen2_sibling(loadversion) {
                log::debug!("models lump is {} bytes, reading as {}", models_len, sibling.name);
                loadversion = sibling;
            }
        }
    }

    let hexen2 = loadversion.game.id() == GameId::Hexen2;
    let bsp = match loadversion.kind {
        VariantKind::Bsp29 => BspVariant::Bsp29(Bsp29::parse(&file, &lumps, hexen2)?),
        VariantKind::Bsp2Rmq => BspVariant::Bsp2Rmq(Bsp2Rmq::parse(&file, &lumps, hexen2)?),
        VariantKind::Bsp2 => BspVariant::Bsp2(Bsp2::parse(&file, &lumps, hexen2)?),
        VariantKind::Q2 => BspVariant::Q2(Q2Bsp::parse(&file, &lumps)?),
        VariantKind::Qbism => BspVariant::Qbism(QbismBsp::parse(&file, &lumps)?),
        VariantKind::Generic => return Err(BspError::FormatUnrecognized { ident, version }),
    };

    let mut lumps_end = header_end;
    for lump in &lumps {
        lumps_end = lumps_end.max(lump.end());
    }
    let bspx = BspxEntries::parse(&file, lumps_end)?;

    let message = worldspawn_message(bsp.entdata());
    log::debug!("loaded {} as {}", path.display(), loadversion.name);

    Ok((
        BspData {
            version: loadversion,
            loadversion,
            bsp,
            bspx,
        },
        message,
    ))
}

// ============================================================
// Write
// ============================================================

fn serialize_variant(bsp: &BspVariant, version: &BspVersion) -> BspResult<Vec<Vec<u8>>> {
    let hexen2 = version.game.id() == GameId::Hexen2;
    match (version.kind, bsp) {
        (VariantKind::Bsp29, BspVariant::Bsp29(doc)) => Ok(doc.serialize_lumps(hexen2)),
        (VariantKind::Bsp2Rmq, BspVariant::Bsp2Rmq(doc)) => Ok(doc.serialize_lumps(hexen2)),
        (VariantKind::Bsp2, BspVariant::Bsp2(doc)) => Ok(doc.serialize_lumps(hexen2)),
        (VariantKind::Q2, BspVariant::Q2(doc)) => Ok(doc.serialize_lumps()),
        (VariantKind::Qbism, BspVariant::Qbism(doc)) => Ok(doc.serialize_lumps()),
        _ => Err(BspError::VariantFormatMismatch {
            expected: version.short_name,
            actual: bsp.name(),
        }),
    }
}

/// Serialize the document and write it to disk: header, lump directory,
/// each lump 4-aligned in table order, then the BSPX section when any
/// extension entries exist.
pub fn write_bsp_file(path: &Path, bspdata: &BspData) -> BspResult<()> {
    validate_format_registry()?;
    let version = bspdata.version;
    let blobs = serialize_variant(&bspdata.bsp, version)?;

    let mut out = Vec::new();
    put_i32(&mut out, version.ident);
    if let Some(v) = version.version {
        put_i32(&mut out, v);
    }
    let dir_pos = out.len();
    out.resize(dir_pos + blobs.len() * Lump::DISK_SIZE, 0);

    let mut dir = Vec::with_capacity(blobs.len());
    for blob in &blobs {
        align4(&mut out);
        dir.push(Lump {
            fileofs: out.len() as i32,
            filelen: blob.len() as i32,
        });
        out.extend_from_slice(blob);
    }
    bspdata.bspx.write(&mut out);

    let mut dir_bytes = Vec::with_capacity(dir.len() * Lump::DISK_SIZE);
    write_records(&dir, &mut dir_bytes);
    out[dir_pos..dir_pos + dir_bytes.len()].copy_from_slice(&dir_bytes);

    log::debug!("writing {} ({} bytes)", path.display(), out.len());
    std::fs::write(path, &out)?;
    Ok(())
}

// ============================================================
// Convert
// ============================================================

/// Re-express the document in another format. Returns false when the
/// target is unreachable: cross-game conversions have no documented
/// mapping, and downgrades fail when a value outgrows the narrower
/// fields. False is a normal outcome the caller must check.
pub fn convert_bsp_format(bspdata: &mut BspData, to_version: &'static BspVersion) -> bool {
    if std::ptr::eq(bspdata.version, to_version) {
        return true;
    }

    // every conversion routes through the generic document
    let mbsp = match &bspdata.bsp {
        BspVariant::None => {
            log::warn!("no BSP data to convert");
            return false;
        }
        BspVariant::M(m) => m.clone(),
        BspVariant::Bsp29(b) => b.to_mbsp(),
        BspVariant::Bsp2Rmq(b) => b.to_mbsp(),
        BspVariant::Bsp2(b) => b.to_mbsp(),
        BspVariant::Q2(b) => b.to_mbsp(),
        BspVariant::Qbism(b) => b.to_mbsp(),
    };

    if to_version.kind != VariantKind::Generic {
        let from_game = bspdata.loadversion.game.id();
        let to_game = to_version.game.id();
        if from_game != GameId::Unknown && to_game != GameId::Unknown && from_game != to_game {
            log::warn!(
                "cannot convert {} to {}: different games",
                bspdata.loadversion.name,
                to_version.name
            );
            return false;
        }
    }

    let converted = match to_version.kind {
        VariantKind::Generic => Ok(BspVariant::M(mbsp)),
        VariantKind::Bsp29 => Bsp29::from_mbsp(&mbsp).map(BspVariant::Bsp29),
        VariantKind::Bsp2Rmq => Bsp2Rmq::from_mbsp(&mbsp).map(BspVariant::Bsp2Rmq),
        VariantKind::Bsp2 => Bsp2::from_mbsp(&mbsp).map(BspVariant::Bsp2),
        VariantKind::Q2 => Q2Bsp::from_mbsp(&mbsp).map(BspVariant::Q2),
        VariantKind::Qbism => QbismBsp::from_mbsp(&mbsp).map(BspVariant::Qbism),
    };

    match converted {
        Ok(bsp) => {
            bspdata.bsp = bsp;
            bspdata.version = to_version;
            true
        }
        Err(err) => {
            log::warn!(
                "cannot convert {} to {}: {}",
                bspdata.version.name,
                to_version.name,
                err
            );
            false
        }
    }
}

// ============================================================
// Size reporting
// ============================================================

/// Per-lump record counts and byte sizes, with usage against the classic
/// tool limits where the format has them. Extended tiers show a dash.
pub fn print_bsp_file_sizes(bspdata: &BspData) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    match &bspdata.bsp {
        BspVariant::None => {
            let _ = writeln!(out, "no BSP data");
        }
        BspVariant::M(m) => {
            // the generic document has no on-disk lump table; list counts
            let rows: &[(&str, usize)] = &[
                ("models", m.dmodels.len()),
                ("planes", m.dplanes.len()),
                ("vertexes", m.dvertexes.len()),
                ("nodes", m.dnodes.len()),
                ("texinfo", m.texinfo.len()),
                ("faces", m.dfaces.len()),
                ("clipnodes", m.dclipnodes.len()),
                ("leafs", m.dleafs.len()),
                ("marksurfaces", m.dmarksurfaces.len()),
                ("edges", m.dedges.len()),
                ("surfedges", m.dsurfedges.len()),
                ("brushes", m.dbrushes.len()),
                ("brushsides", m.dbrushsides.len()),
                ("leafbrushes", m.dleafbrushes.len()),
                ("areas", m.dareas.len()),
                ("areaportals", m.dareaportals.len()),
            ];
            for (name, count) in rows {
                let _ = writeln!(out, "{:>8} {:<14}", count, name);
            }
            let _ = writeln!(out, "{:>8} {:<14} {:>10}", "", "entities", m.dentdata.len());
            let _ = writeln!(out, "{:>8} {:<14} {:>10}", "", "textures", m.dtexdata.len());
            let _ = writeln!(out, "{:>8} {:<14} {:>10}", "", "lighting", m.dlightdata.len());
            let _ = writeln!(out, "{:>8} {:<14} {:>10}", "", "visibility", m.dvisdata.len());
        }
        _ => match serialize_variant(&bspdata.bsp, bspdata.version) {
            Ok(blobs) => {
                for (spec, blob) in bspdata.version.lumps.iter().zip(&blobs) {
                    let (count_col, units) = if spec.size > 1 {
                        let count = blob.len() / spec.size;
                        (count.to_string(), count)
                    } else {
                        (String::new(), blob.len())
                    };
                    let pct_col = match spec.limit {
                        Some(limit) if limit > 0 => {
                            format!("{:.1}%", units as f64 * 100.0 / limit as f64)
                        }
                        _ => "-".to_string(),
                    };
                    let _ = writeln!(
                        out,
                        "{:>8} {:<14} {:>10} {:>7}",
                        count_col,
                        spec.name,
                        blob.len(),
                        pct_col
                    );
                }
            }
            Err(err) => {
                let _ = writeln!(out, "{}", err);
            }
        },
    }

    if !bspdata.bspx.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "BSPX lumps:");
        for (name, data) in bspdata.bspx.iter() {
            let _ = writeln!(out, "{:>8} {:<24} {:>10}", "", name, data.len());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bspfile_generic::MModel;
    use crate::bspfile_q2::texname_to_bytes;
    use crate::q_shared::{CONTENTS_SOLID, Q2_CONTENTS_SOLID};

    fn tiny_bsp29(message: Option<&str>) -> Bsp29 {
        let entdata = match message {
            Some(m) => format!("{{\n\"classname\" \"worldspawn\"\n\"message\" \"{}\"\n}}\n", m),
            None => "{\n\"classname\" \"worldspawn\"\n}\n".to_string(),
        };
        Bsp29 {
            dmodels: vec![MModel {
                maxs: [128.0, 128.0, 64.0],
                visleafs: 1,
                numfaces: 1,
                ..MModel::default()
            }],
            dvisdata: vec![0x01],
            dlightdata: vec![0xff; 6],
            dtexdata: vec![0; 4],
            dentdata: entdata,
            dleafs: vec![DLeaf29 {
                contents: CONTENTS_SOLID,
                visofs: -1,
                mins: [-128, -128, -64],
                maxs: [128, 128, 64],
                firstmarksurface: 0,
                nummarksurfaces: 1,
                ambient_level: [0; 4],
            }],
            dplanes: vec![DPlane {
                normal: [0.0, 0.0, 1.0],
                dist: 64.0,
                plane_type: PLANE_Z,
            }],
            dvertexes: vec![DVertex {
                point: [16.0, 16.0, 64.0],
            }],
            dnodes: vec![DNode29 {
                planenum: 0,
                children: [-1, -2],
                mins: [-128, -128, -64],
                maxs: [128, 128, 64],
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
            dedges: vec![DEdge { v: [0, 0] }],
            dmarksurfaces: vec![0],
            dsurfedges: vec![1, -1],
        }
    }

    fn tiny_q2bsp() -> Q2Bsp {
        Q2Bsp {
            dmodels: vec![DModelQ2 {
                maxs: [64.0, 64.0, 64.0],
                numfaces: 1,
                ..DModelQ2::default()
            }],
            dvisdata: Vec::new(),
            dlightdata: vec![0x80; 3],
            dentdata: "{\n\"classname\" \"worldspawn\"\n}\n".to_string(),
            dleafs: vec![DLeafQ2 {
                contents: Q2_CONTENTS_SOLID,
                cluster: -1,
                area: 0,
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
                plane_type: PLANE_X,
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
                lightofs: -1,
            }],
            dedges: vec![DEdge { v: [0, 0] }],
            dleaffaces: vec![0],
            dleafbrushes: vec![0],
            dsurfedges: vec![1],
            dareas: vec![DArea {
                numareaportals: 0,
                firstareaportal: 0,
            }],
            dareaportals: Vec::new(),
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
    fn test_registry_is_unambiguous() {
        assert!(validate_format_registry().is_ok());
        assert!(find_registry_conflict(&BSPVERSIONS).is_none());
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        static FAKE_A: BspVersion = BspVersion {
            ident: 99,
            version: None,
            short_name: "fake_a",
            name: "fake A",
            lumps: &LUMPS_GENERIC,
            game: &GAME_QUAKE,
            extended: None,
            kind: VariantKind::Bsp29,
        };
        static FAKE_B: BspVersion = BspVersion {
            ident: 99,
            version: None,
            short_name: "fake_b",
            name: "fake B",
            lumps: &LUMPS_GENERIC,
            game: &GAME_QUAKE,
            extended: None,
            kind: VariantKind::Bsp29,
        };
        let conflict = find_registry_conflict(&[&FAKE_A, &FAKE_B]);
        assert_eq!(conflict, Some(("fake_a", "fake_b")));

        // the Quake / Hexen II shell sharing is the documented exception
        assert!(find_registry_conflict(&[&BSPVER_29, &BSPVER_H2]).is_none());
    }

    #[test]
    fn test_version_display() {
        assert_eq!(BSPVER_29.to_string(), "bsp29");
        assert_eq!(BSPVER_2RMQ.to_string(), "bsp2rmq");
        assert_eq!(BSPVER_Q2.to_string(), "IBSP:38");
        assert_eq!(BSPVER_QBISM.to_string(), "QBSP:38");
    }

    #[test]
    fn test_extended_tier_links() {
        assert!(std::ptr::eq(BSPVER_29.extended.unwrap(), &BSPVER_2));
        assert!(std::ptr::eq(BSPVER_2RMQ.extended.unwrap(), &BSPVER_2));
        assert!(std::ptr::eq(BSPVER_H2.extended.unwrap(), &BSPVER_H2_2));
        assert!(std::ptr::eq(BSPVER_Q2.extended.unwrap(), &BSPVER_QBISM));
        assert!(BSPVER_2.extended.is_none());
        assert!(BSPVER_QBISM.extended.is_none());
        // extended tiers stay within the same game
        for v in BSPVERSIONS {
            if let Some(ext) = v.extended {
                assert_eq!(v.game.id(), ext.game.id());
            }
        }
    }

    #[test]
    fn test_lookup_is_deterministic() {
        assert!(std::ptr::eq(lookup_version(BSPVERSION, None).unwrap(), &BSPVER_29));
        assert!(std::ptr::eq(lookup_version(BSPHLVERSION, None).unwrap(), &BSPVER_HL));
        assert!(std::ptr::eq(lookup_version(BSP2VERSION, None).unwrap(), &BSPVER_2));
        assert!(std::ptr::eq(lookup_version(BSP2RMQVERSION, None).unwrap(), &BSPVER_2RMQ));
        assert!(std::ptr::eq(
            lookup_version(IDBSPHEADER, Some(38)).unwrap(),
            &BSPVER_Q2
        ));
        assert!(std::ptr::eq(
            lookup_version(QBISMHEADER, Some(38)).unwrap(),
            &BSPVER_QBISM
        ));
        assert!(lookup_version(12345, None).is_none());
        assert!(lookup_version(IDBSPHEADER, Some(39)).is_none());
    }

    #[test]
    fn test_bsp29_write_load_roundtrip() {
        let doc = tiny_bsp29(Some("The Slipgate Complex"));
        let mut bspdata = BspData::new(&BSPVER_29, BspVariant::Bsp29(doc.clone()));
        bspdata.bspx.copy("RTLIGHTS", &[1, 2, 3, 4, 5]);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.bsp");
        write_bsp_file(&path, &bspdata).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &29i32.to_le_bytes());

        let (loaded, message) = load_bsp_file(&path).unwrap();
        assert!(std::ptr::eq(loaded.version, &BSPVER_29));
        assert!(std::ptr::eq(loaded.loadversion, &BSPVER_29));
        assert_eq!(loaded.bsp, BspVariant::Bsp29(doc));
        assert_eq!(loaded.bspx, bspdata.bspx);
        assert_eq!(message.as_deref(), Some("The Slipgate Complex"));
    }

    #[test]
    fn test_half_life_roundtrip() {
        let doc = tiny_bsp29(None);
        let bspdata = BspData::new(&BSPVER_HL, BspVariant::Bsp29(doc.clone()));

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.bsp");
        write_bsp_file(&path, &bspdata).unwrap();

        let (loaded, message) = load_bsp_file(&path).unwrap();
        assert!(std::ptr::eq(loaded.version, &BSPVER_HL));
        assert_eq!(loaded.bsp, BspVariant::Bsp29(doc));
        assert_eq!(message, None);
    }

    #[test]
    fn test_hexen2_detected_from_models_stride() {
        let doc = tiny_bsp29(None);
        let bspdata = BspData::new(&BSPVER_H2, BspVariant::Bsp29(doc.clone()));

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.bsp");
        write_bsp_file(&path, &bspdata).unwrap();

        // one model serialized at the Hexen II stride
        let (loaded, _) = load_bsp_file(&path).unwrap();
        assert!(std::ptr::eq(loaded.version, &BSPVER_H2));
        assert_eq!(loaded.bsp, BspVariant::Bsp29(doc));
    }

    #[test]
    fn test_quake_not_mistaken_for_hexen2() {
        let bspdata = BspData::new(&BSPVER_29, BspVariant::Bsp29(tiny_bsp29(None)));
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.bsp");
        write_bsp_file(&path, &bspdata).unwrap();
        let (loaded, _) = load_bsp_file(&path).unwrap();
        assert!(std::ptr::eq(loaded.version, &BSPVER_29));
    }

    #[test]
    fn test_q2_and_qbism_roundtrip() {
        let doc = tiny_q2bsp();
        let bspdata = BspData::new(&BSPVER_Q2, BspVariant::Q2(doc.clone()));

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.bsp");
        write_bsp_file(&path, &bspdata).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"IBSP");
        assert_eq!(&bytes[4..8], &38i32.to_le_bytes());

        let (loaded, message) = load_bsp_file(&path).unwrap();
        assert!(std::ptr::eq(loaded.version, &BSPVER_Q2));
        assert_eq!(loaded.bsp, BspVariant::Q2(doc));
        assert_eq!(message, None);

        // upgrade and roundtrip the qbism tier too
        let mut bspdata = loaded;
        assert!(convert_bsp_format(&mut bspdata, &BSPVER_QBISM));
        write_bsp_file(&path, &bspdata).unwrap();
        let (loaded, _) = load_bsp_file(&path).unwrap();
        assert!(std::ptr::eq(loaded.version, &BSPVER_QBISM));
        assert_eq!(loaded.bsp, bspdata.bsp);
    }

    #[test]
    fn test_lumps_are_aligned() {
        let bspdata = BspData::new(&BSPVER_29, BspVariant::Bsp29(tiny_bsp29(None)));
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.bsp");
        write_bsp_file(&path, &bspdata).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let mut r = BspReader::new(&bytes);
        r.seek(4).unwrap();
        for _ in 0..Q1_HEADER_LUMPS {
            let lump = Lump::read(&mut r).unwrap();
            assert!(lump.fileofs >= 0);
            assert!(lump.fileofs as usize % 4 == 0);
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bogus.bsp");
        let mut bytes = 12345i32.to_le_bytes().to_vec();
        bytes.resize(256, 0);
        std::fs::write(&path, &bytes).unwrap();

        let err = load_bsp_file(&path).unwrap_err();
        assert!(matches!(
            err,
            BspError::FormatUnrecognized {
                ident: 12345,
                version: None
            }
        ));
    }

    #[test]
    fn test_truncated_lump_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("short.bsp");

        // valid bsp29 header whose planes lump runs past end of file
        let mut bytes = 29i32.to_le_bytes().to_vec();
        bytes.resize(4 + Q1_HEADER_LUMPS * 8, 0);
        bytes[12..16].copy_from_slice(&200i32.to_le_bytes()); // planes fileofs
        bytes[16..20].copy_from_slice(&40i32.to_le_bytes()); // planes filelen
        std::fs::write(&path, &bytes).unwrap();

        let err = load_bsp_file(&path).unwrap_err();
        assert!(matches!(err, BspError::TruncatedFile { lump: "planes", .. }));
    }

    #[test]
    fn test_funny_lump_size_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("funny.bsp");

        let header = 4 + Q1_HEADER_LUMPS * 8;
        let mut bytes = 29i32.to_le_bytes().to_vec();
        bytes.resize(header + 21, 0);
        bytes[12..16].copy_from_slice(&(header as i32).to_le_bytes());
        bytes[16..20].copy_from_slice(&21i32.to_le_bytes()); // not a multiple of 20
        std::fs::write(&path, &bytes).unwrap();

        let err = load_bsp_file(&path).unwrap_err();
        assert!(matches!(
            err,
            BspError::LumpSizeMismatch {
                lump: "planes",
                length: 21,
                record_size: 20
            }
        ));
    }

    #[test]
    fn test_convert_noop_is_identity() {
        let mut bspdata = BspData::new(&BSPVER_29, BspVariant::Bsp29(tiny_bsp29(None)));
        let before = bspdata.bsp.clone();
        assert!(convert_bsp_format(&mut bspdata, &BSPVER_29));
        assert_eq!(bspdata.bsp, before);
        assert!(std::ptr::eq(bspdata.version, &BSPVER_29));
    }

    #[test]
    fn test_convert_upgrade_and_back() {
        let doc = tiny_bsp29(None);
        let mut bspdata = BspData::new(&BSPVER_29, BspVariant::Bsp29(doc.clone()));
        bspdata.bspx.copy("LMSHIFT", &[4]);

        assert!(convert_bsp_format(&mut bspdata, &BSPVER_2));
        assert!(std::ptr::eq(bspdata.version, &BSPVER_2));
        assert!(matches!(bspdata.bsp, BspVariant::Bsp2(_)));
        // the load format survives conversion
        assert!(std::ptr::eq(bspdata.loadversion, &BSPVER_29));
        // so does the extension table
        assert_eq!(bspdata.bspx.entry("LMSHIFT"), Some(&[4u8][..]));

        assert!(convert_bsp_format(&mut bspdata, &BSPVER_29));
        assert_eq!(bspdata.bsp, BspVariant::Bsp29(doc));
    }

    #[test]
    fn test_convert_via_generic() {
        let doc = tiny_q2bsp();
        let mut bspdata = BspData::new(&BSPVER_Q2, BspVariant::Q2(doc.clone()));

        assert!(convert_bsp_format(&mut bspdata, &BSPVER_GENERIC));
        assert!(matches!(bspdata.bsp, BspVariant::M(_)));

        assert!(convert_bsp_format(&mut bspdata, &BSPVER_QBISM));
        assert!(matches!(bspdata.bsp, BspVariant::Qbism(_)));

        assert!(convert_bsp_format(&mut bspdata, &BSPVER_Q2));
        assert_eq!(bspdata.bsp, BspVariant::Q2(doc));
    }

    #[test]
    fn test_convert_rejects_cross_game() {
        let mut bspdata = BspData::new(&BSPVER_Q2, BspVariant::Q2(tiny_q2bsp()));
        let before = bspdata.bsp.clone();

        assert!(!convert_bsp_format(&mut bspdata, &BSPVER_29));
        assert!(!convert_bsp_format(&mut bspdata, &BSPVER_HL));
        // the document is untouched by a failed conversion
        assert_eq!(bspdata.bsp, before);
        assert!(std::ptr::eq(bspdata.version, &BSPVER_Q2));
    }

    #[test]
    fn test_convert_downgrade_overflow_fails() {
        let mut doc = Bsp2::from_mbsp(&tiny_bsp29(None).to_mbsp()).unwrap();
        doc.dnodes[0].children = [40000, -2];
        let mut bspdata = BspData::new(&BSPVER_2, BspVariant::Bsp2(doc));

        assert!(!convert_bsp_format(&mut bspdata, &BSPVER_29));
        assert!(std::ptr::eq(bspdata.version, &BSPVER_2));
        // the RMQ tier has 32-bit children, so that conversion succeeds
        assert!(convert_bsp_format(&mut bspdata, &BSPVER_2RMQ));
    }

    #[test]
    fn test_worldspawn_message() {
        assert_eq!(
            worldspawn_message("{\n\"message\" \"the Necropolis\"\n}\n").as_deref(),
            Some("the Necropolis")
        );
        assert_eq!(
            worldspawn_message("{ \"classname\" \"worldspawn\" }"),
            None
        );
        assert_eq!(worldspawn_message(""), None);
        assert_eq!(worldspawn_message("not an entity block"), None);
        // only the first block is scanned
        assert_eq!(
            worldspawn_message("{ \"classname\" \"worldspawn\" } { \"message\" \"nope\" }"),
            None
        );
    }

    #[test]
    fn test_print_sizes_native() {
        let bspdata = BspData::new(&BSPVER_29, BspVariant::Bsp29(tiny_bsp29(None)));
        let report = print_bsp_file_sizes(&bspdata);
        // one plane of 20 bytes against the classic limit
        assert!(report.contains("planes"));
        assert!(report.contains("20"));
        assert!(report.contains('%'));
    }

    #[test]
    fn test_print_sizes_extended_shows_dash() {
        let mut bspdata = BspData::new(&BSPVER_29, BspVariant::Bsp29(tiny_bsp29(None)));
        assert!(convert_bsp_format(&mut bspdata, &BSPVER_2));
        bspdata.bspx.copy("DECOUPLED_LM", &[0; 32]);
        let report = print_bsp_file_sizes(&bspdata);
        assert!(report.contains('-'));
        assert!(!report.contains('%'));
        assert!(report.contains("BSPX"));
        assert!(report.contains("DECOUPLED_LM"));
    }
}
