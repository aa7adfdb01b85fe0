// q_shared.rs - foundational types and constants shared by all modules

use crate::error::{BspError, BspResult};

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];
pub type Vec3b = [u8; 3];

pub const MAX_TOKEN_CHARS: usize = 128;

/// Axis-aligned box, used for per-game collision hull dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Aabb {
    pub const fn new(mins: Vec3, maxs: Vec3) -> Self {
        Aabb { mins, maxs }
    }

    /// The zero-size box used for hull 0 (point hull).
    pub const ZERO: Aabb = Aabb::new([0.0; 3], [0.0; 3]);

    pub fn size(&self) -> Vec3 {
        [
            self.maxs[0] - self.mins[0],
            self.maxs[1] - self.mins[1],
            self.maxs[2] - self.mins[2],
        ]
    }
}

// ============================================================
// Quake / Hexen II / Half-Life content values
// ============================================================
// Leaf contents in the Quake family are small negative codes, one per
// leaf. CLIP and ORIGIN exist only inside the compiler and must be
// remapped before they reach disk.

pub const CONTENTS_EMPTY: i32 = -1;
pub const CONTENTS_SOLID: i32 = -2;
pub const CONTENTS_WATER: i32 = -3;
pub const CONTENTS_SLIME: i32 = -4;
pub const CONTENTS_LAVA: i32 = -5;
pub const CONTENTS_SKY: i32 = -6;
pub const CONTENTS_CLIP: i32 = -7;
pub const CONTENTS_ORIGIN: i32 = -8;

/// Quake texinfo flag: no lightmap, no subdivision (sky and liquids).
pub const TEX_SPECIAL: i32 = 1;

// ============================================================
// Quake II content bitflags
// ============================================================
// Quake II leaf/brush contents are a bitmask. Lower bits are the
// visible content types, upper bits are behavior modifiers.

pub const Q2_CONTENTS_SOLID: i32 = 1;
pub const Q2_CONTENTS_WINDOW: i32 = 2;
pub const Q2_CONTENTS_AUX: i32 = 4;
pub const Q2_CONTENTS_LAVA: i32 = 8;
pub const Q2_CONTENTS_SLIME: i32 = 16;
pub const Q2_CONTENTS_WATER: i32 = 32;
pub const Q2_CONTENTS_MIST: i32 = 64;
pub const Q2_LAST_VISIBLE_CONTENTS: i32 = 64;

pub const Q2_CONTENTS_AREAPORTAL: i32 = 0x8000;
pub const Q2_CONTENTS_PLAYERCLIP: i32 = 0x10000;
pub const Q2_CONTENTS_MONSTERCLIP: i32 = 0x20000;

pub const Q2_CONTENTS_CURRENT_0: i32 = 0x40000;
pub const Q2_CONTENTS_CURRENT_90: i32 = 0x80000;
pub const Q2_CONTENTS_CURRENT_180: i32 = 0x100000;
pub const Q2_CONTENTS_CURRENT_270: i32 = 0x200000;
pub const Q2_CONTENTS_CURRENT_UP: i32 = 0x400000;
pub const Q2_CONTENTS_CURRENT_DOWN: i32 = 0x800000;

pub const Q2_CONTENTS_ORIGIN: i32 = 0x1000000;
pub const Q2_CONTENTS_MONSTER: i32 = 0x2000000;
pub const Q2_CONTENTS_DEADMONSTER: i32 = 0x4000000;
pub const Q2_CONTENTS_DETAIL: i32 = 0x8000000;
pub const Q2_CONTENTS_TRANSLUCENT: i32 = 0x10000000;
pub const Q2_CONTENTS_LADDER: i32 = 0x20000000;

/// All visible content type bits plus DETAIL; the bits that decide what
/// kind of space a brush occupies, as opposed to behavior modifiers.
pub const Q2_CONTENTS_TYPE_MASK: i32 = Q2_CONTENTS_SOLID
    | Q2_CONTENTS_WINDOW
    | Q2_CONTENTS_AUX
    | Q2_CONTENTS_LAVA
    | Q2_CONTENTS_SLIME
    | Q2_CONTENTS_WATER
    | Q2_CONTENTS_MIST
    | Q2_CONTENTS_DETAIL;

pub const Q2_CONTENTS_LIQUID: i32 = Q2_CONTENTS_LAVA | Q2_CONTENTS_SLIME | Q2_CONTENTS_WATER;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Q2Contents: i32 {
        const SOLID        = Q2_CONTENTS_SOLID;
        const WINDOW       = Q2_CONTENTS_WINDOW;
        const AUX          = Q2_CONTENTS_AUX;
        const LAVA         = Q2_CONTENTS_LAVA;
        const SLIME        = Q2_CONTENTS_SLIME;
        const WATER        = Q2_CONTENTS_WATER;
        const MIST         = Q2_CONTENTS_MIST;
        const AREAPORTAL   = Q2_CONTENTS_AREAPORTAL;
        const PLAYERCLIP   = Q2_CONTENTS_PLAYERCLIP;
        const MONSTERCLIP  = Q2_CONTENTS_MONSTERCLIP;
        const CURRENT_0    = Q2_CONTENTS_CURRENT_0;
        const CURRENT_90   = Q2_CONTENTS_CURRENT_90;
        const CURRENT_180  = Q2_CONTENTS_CURRENT_180;
        const CURRENT_270  = Q2_CONTENTS_CURRENT_270;
        const CURRENT_UP   = Q2_CONTENTS_CURRENT_UP;
        const CURRENT_DOWN = Q2_CONTENTS_CURRENT_DOWN;
        const ORIGIN       = Q2_CONTENTS_ORIGIN;
        const MONSTER      = Q2_CONTENTS_MONSTER;
        const DEADMONSTER  = Q2_CONTENTS_DEADMONSTER;
        const DETAIL       = Q2_CONTENTS_DETAIL;
        const TRANSLUCENT  = Q2_CONTENTS_TRANSLUCENT;
        const LADDER       = Q2_CONTENTS_LADDER;
    }
}

// ============================================================
// Quake II surface flags
// ============================================================

pub const Q2_SURF_LIGHT: i32 = 0x1;
pub const Q2_SURF_SLICK: i32 = 0x2;
pub const Q2_SURF_SKY: i32 = 0x4;
pub const Q2_SURF_WARP: i32 = 0x8;
pub const Q2_SURF_TRANS33: i32 = 0x10;
pub const Q2_SURF_TRANS66: i32 = 0x20;
pub const Q2_SURF_FLOWING: i32 = 0x40;
pub const Q2_SURF_NODRAW: i32 = 0x80;
pub const Q2_SURF_HINT: i32 = 0x100;
pub const Q2_SURF_SKIP: i32 = 0x200;

// ============================================================
// Checked numeric casts
// ============================================================
// Downcasting to the 16-bit formats must fail loudly when a map has
// outgrown them; every cast carries the field name for the report.

pub fn numeric_cast_i16(value: i64, field: &'static str) -> BspResult<i16> {
    i16::try_from(value).map_err(|_| BspError::NumericOverflow {
        field,
        value: value as f64,
        target: "i16",
    })
}

pub fn numeric_cast_u16(value: i64, field: &'static str) -> BspResult<u16> {
    u16::try_from(value).map_err(|_| BspError::NumericOverflow {
        field,
        value: value as f64,
        target: "u16",
    })
}

pub fn numeric_cast_i32(value: i64, field: &'static str) -> BspResult<i32> {
    i32::try_from(value).map_err(|_| BspError::NumericOverflow {
        field,
        value: value as f64,
        target: "i32",
    })
}

pub fn numeric_cast_u32(value: i64, field: &'static str) -> BspResult<u32> {
    u32::try_from(value).map_err(|_| BspError::NumericOverflow {
        field,
        value: value as f64,
        target: "u32",
    })
}

fn bounds_component_i16(value: f32, field: &'static str) -> BspResult<i16> {
    if value.is_finite() && (i16::MIN as f32..=i16::MAX as f32).contains(&value) {
        Ok(value as i16)
    } else {
        Err(BspError::NumericOverflow {
            field,
            value: value as f64,
            target: "i16",
        })
    }
}

/// Narrow a float bounding-box corner to the 16-bit on-disk form,
/// rounding mins down so the stored box never shrinks.
pub fn bounds_floor_i16(v: &Vec3, field: &'static str) -> BspResult<[i16; 3]> {
    Ok([
        bounds_component_i16(v[0].floor(), field)?,
        bounds_component_i16(v[1].floor(), field)?,
        bounds_component_i16(v[2].floor(), field)?,
    ])
}

/// Narrow a float bounding-box corner to the 16-bit on-disk form,
/// rounding maxs up so the stored box never shrinks.
pub fn bounds_ceil_i16(v: &Vec3, field: &'static str) -> BspResult<[i16; 3]> {
    Ok([
        bounds_component_i16(v[0].ceil(), field)?,
        bounds_component_i16(v[1].ceil(), field)?,
        bounds_component_i16(v[2].ceil(), field)?,
    ])
}

/// Widen a 16-bit on-disk bounding-box corner back to floats.
pub fn bounds_widen(v: &[i16; 3]) -> Vec3 {
    [v[0] as f32, v[1] as f32, v[2] as f32]
}

// ============================================================
// String helpers
// ============================================================

/// Case-insensitive string equality check.
/// Returns true if strings are equal (ignoring ASCII case).
pub fn q_streq_nocase(s1: &str, s2: &str) -> bool {
    s1.eq_ignore_ascii_case(s2)
}

// ============================================================
// Token parser
// ============================================================

/// Parse one whitespace-delimited token from `data`, handling // comments
/// and "quoted strings". Returns `(token, remaining)` or `(token, None)`
/// if end of data.
pub fn com_parse(data: &str) -> (String, Option<&str>) {
    let mut chars = data.as_bytes();
    let mut token = String::new();

    // skip whitespace
    loop {
        while !chars.is_empty() && chars[0] <= b' ' {
            if chars[0] == 0 {
                return (String::new(), None);
            }
            chars = &chars[1..];
        }
        if chars.is_empty() {
            return (String::new(), None);
        }

        // skip // comments
        if chars.len() >= 2 && chars[0] == b'/' && chars[1] == b'/' {
            while !chars.is_empty() && chars[0] != b'\n' {
                chars = &chars[1..];
            }
            continue;
        }
        break;
    }

    // handle quoted strings
    if chars[0] == b'"' {
        chars = &chars[1..];
        while !chars.is_empty() && chars[0] != b'"' {
            if token.len() < MAX_TOKEN_CHARS {
                token.push(chars[0] as char);
            }
            chars = &chars[1..];
        }
        if !chars.is_empty() {
            chars = &chars[1..]; // skip closing quote
        }
        let offset = data.len() - chars.len();
        let remaining = if chars.is_empty() {
            None
        } else {
            Some(&data[offset..])
        };
        return (token, remaining);
    }

    // parse regular word
    while !chars.is_empty() && chars[0] > b' ' {
        if token.len() < MAX_TOKEN_CHARS {
            token.push(chars[0] as char);
        }
        chars = &chars[1..];
    }
    if token.len() >= MAX_TOKEN_CHARS {
        token.clear();
    }

    let offset = data.len() - chars.len();
    let remaining = if chars.is_empty() {
        None
    } else {
        Some(&data[offset..])
    };
    (token, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q1_contents_values() {
        assert_eq!(CONTENTS_EMPTY, -1);
        assert_eq!(CONTENTS_SKY, -6);
        // compiler-internal values sit past the engine's known range
        assert!(CONTENTS_CLIP < CONTENTS_SKY);
        assert!(CONTENTS_ORIGIN < CONTENTS_CLIP);
    }

    #[test]
    fn test_q2_type_mask() {
        assert_eq!(Q2_CONTENTS_TYPE_MASK & Q2_CONTENTS_PLAYERCLIP, 0);
        assert_eq!(Q2_CONTENTS_TYPE_MASK & Q2_CONTENTS_CURRENT_90, 0);
        assert_ne!(Q2_CONTENTS_TYPE_MASK & Q2_CONTENTS_MIST, 0);
        assert_ne!(Q2_CONTENTS_TYPE_MASK & Q2_CONTENTS_DETAIL, 0);
    }

    #[test]
    fn test_numeric_cast_ok() {
        assert_eq!(numeric_cast_i16(-32768, "x").unwrap(), -32768);
        assert_eq!(numeric_cast_u16(65535, "x").unwrap(), 65535);
        assert_eq!(numeric_cast_u32(0, "x").unwrap(), 0);
    }

    #[test]
    fn test_numeric_cast_overflow() {
        let err = numeric_cast_u16(65536, "dedge_t::v").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("dedge_t::v"));
        assert!(msg.contains("65536"));
        assert!(numeric_cast_i16(32768, "x").is_err());
        assert!(numeric_cast_u32(-1, "x").is_err());
    }

    #[test]
    fn test_bounds_rounding() {
        let mins = bounds_floor_i16(&[-12.5, 3.0, -0.1], "mins").unwrap();
        assert_eq!(mins, [-13, 3, -1]);
        let maxs = bounds_ceil_i16(&[12.5, 3.0, 0.1], "maxs").unwrap();
        assert_eq!(maxs, [13, 3, 1]);
        assert!(bounds_floor_i16(&[40000.0, 0.0, 0.0], "mins").is_err());
        assert!(bounds_ceil_i16(&[f32::NAN, 0.0, 0.0], "maxs").is_err());
    }

    #[test]
    fn test_com_parse() {
        let (token, rest) = com_parse("hello world");
        assert_eq!(token, "hello");
        assert_eq!(rest, Some(" world"));

        let (token, rest) = com_parse("\"quoted string\" next");
        assert_eq!(token, "quoted string");
        assert_eq!(rest, Some(" next"));

        let (token, rest) = com_parse("// comment line\ntoken");
        assert_eq!(token, "token");
        assert_eq!(rest, None);

        let (token, rest) = com_parse("   ");
        assert_eq!(token, "");
        assert_eq!(rest, None);
    }

    #[test]
    fn test_aabb() {
        let hull = Aabb::new([-16.0, -16.0, -32.0], [16.0, 16.0, 24.0]);
        assert_eq!(hull.size(), [32.0, 32.0, 56.0]);
        assert_eq!(Aabb::ZERO.size(), [0.0, 0.0, 0.0]);
    }
}
