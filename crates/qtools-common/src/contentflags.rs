// contentflags.rs - game-independent content and surface flag values

use std::cmp::Ordering;

use crate::gamedef::GameDef;
use crate::q_shared::Vec3b;

// ============================================================
// Content flags
// ============================================================

/// Per-game extension data attached to a content value. The Quake
/// family tracks which detail variety a brush was, since the native
/// value alone cannot (detail solid exports as plain SOLID).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GameData {
    #[default]
    None,
    Q1(Q1Detail),
}

/// Detail tier for Quake-family contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Q1Detail {
    Solid,
    Fence,
    Illusionary,
}

/// The contents of a brush or leaf, as one game understands it.
/// `native` is what reaches the BSP; the rest steers the compiler.
/// All semantic questions go through the game definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentFlags {
    /// native flags value; what's written to the BSP basically
    pub native: i32,

    /// extra data supplied by the game
    pub game_data: GameData,

    /// set directly from `_mirrorinside` on the brush, if present.
    /// don't check this directly, use `is_mirrored` so the game decides.
    pub mirror_inside: Option<bool>,

    /// don't clip the same content type. mostly intended for detail
    /// illusionary. checked through `will_clip_same_type`.
    pub clips_same_type: Option<bool>,

    /// always blocks vis, even if it normally wouldn't
    pub illusionary_visblocker: bool,
}

impl ContentFlags {
    pub fn from_native(native: i32) -> Self {
        ContentFlags {
            native,
            ..Default::default()
        }
    }

    pub fn set_mirrored(mut self, mirror_inside: Option<bool>) -> Self {
        self.mirror_inside = mirror_inside;
        self
    }

    pub fn set_clips_same_type(mut self, clips_same_type: Option<bool>) -> Self {
        self.clips_same_type = clips_same_type;
        self
    }

    pub fn equals(&self, game: &dyn GameDef, other: &ContentFlags) -> bool {
        game.contents_are_equal(self, other)
    }

    /// Content type match, ignoring on/off style modifier bits. The
    /// detail tier always participates.
    pub fn types_equal(&self, game: &dyn GameDef, other: &ContentFlags) -> bool {
        game.contents_are_type_equal(self, other)
    }

    /// Is any kind of detail? (solid, fence, illusionary)
    pub fn is_any_detail(&self, game: &dyn GameDef) -> bool {
        game.contents_are_any_detail(self)
    }

    pub fn is_detail_solid(&self, game: &dyn GameDef) -> bool {
        game.contents_are_detail_solid(self)
    }

    pub fn is_detail_fence(&self, game: &dyn GameDef) -> bool {
        game.contents_are_detail_fence(self)
    }

    pub fn is_detail_illusionary(&self, game: &dyn GameDef) -> bool {
        game.contents_are_detail_illusionary(self)
    }

    pub fn is_mirrored(&self, game: &dyn GameDef) -> bool {
        game.contents_are_mirrored(self)
    }

    pub fn will_clip_same_type(&self, game: &dyn GameDef) -> bool {
        self.will_clip_same_type_with(game, self)
    }

    pub fn will_clip_same_type_with(&self, game: &dyn GameDef, other: &ContentFlags) -> bool {
        game.contents_clip_same_type(self, other)
    }

    pub fn is_empty(&self, game: &dyn GameDef) -> bool {
        game.contents_are_empty(self)
    }

    /// Detail solid or structural solid.
    pub fn is_any_solid(&self, game: &dyn GameDef) -> bool {
        self.is_solid(game) || self.is_detail_solid(game)
    }

    /// Solid, not detail or any other extended content type.
    pub fn is_solid(&self, game: &dyn GameDef) -> bool {
        game.contents_are_solid(self)
    }

    pub fn is_sky(&self, game: &dyn GameDef) -> bool {
        game.contents_are_sky(self)
    }

    pub fn is_liquid(&self, game: &dyn GameDef) -> bool {
        game.contents_are_liquid(self)
    }

    pub fn is_clip(&self, game: &dyn GameDef) -> bool {
        game.contents_are_clip(self)
    }

    pub fn is_origin(&self, game: &dyn GameDef) -> bool {
        game.contents_are_origin(self)
    }

    /// Detail fence or detail illusionary.
    pub fn is_fence(&self, game: &dyn GameDef) -> bool {
        self.is_detail_fence(game) || self.is_detail_illusionary(game)
    }

    pub fn is_valid(&self, game: &dyn GameDef, strict: bool) -> bool {
        game.contents_are_valid(self, strict)
    }

    pub fn make_valid(&mut self, game: &dyn GameDef) {
        game.contents_make_valid(self)
    }

    /// When multiple brushes contribute to a leaf, the higher priority
    /// one determines the leaf contents.
    pub fn priority(&self, game: &dyn GameDef) -> i32 {
        game.contents_priority(self)
    }

    /// Whether this chops lower priority brushes during CSG. True only
    /// for solid and opaque content types.
    pub fn chops(&self, game: &dyn GameDef) -> bool {
        game.chops(self)
    }

    pub fn display(&self, game: &dyn GameDef) -> String {
        game.get_contents_display(self)
    }
}

// ============================================================
// Surface flags
// ============================================================

/// Per-face compiler flags. `native` is the Quake II SURF_* bitmask
/// (zero for the Quake family); everything else is tool-side state
/// carried between compile stages.
#[derive(Debug, Clone, Copy)]
pub struct SurfFlags {
    /// native flags value; what's written to the BSP basically
    pub native: i32,

    /// an invisible surface
    pub is_skip: bool,

    /// hint surface
    pub is_hint: bool,

    /// don't receive dirtmapping
    pub no_dirt: bool,

    /// don't cast a shadow
    pub no_shadow: bool,

    /// light doesn't bounce off this face
    pub no_bounce: bool,

    /// opt out of minlight on this face
    pub no_minlight: bool,

    /// don't expand this face for larger clip hulls
    pub no_expand: bool,

    /// this face doesn't receive light
    pub light_ignore: bool,

    /// if non zero, enables phong shading and gives the angle threshold
    pub phong_angle: f32,

    /// if non zero, overrides phong_angle for concave joints
    pub phong_angle_concave: f32,

    /// minlight value for this face
    pub minlight: f32,

    /// minlight color for this face
    pub minlight_color: Vec3b,

    /// custom opacity
    pub light_alpha: f32,
}

impl Default for SurfFlags {
    fn default() -> Self {
        SurfFlags {
            native: 0,
            is_skip: false,
            is_hint: false,
            no_dirt: false,
            no_shadow: false,
            no_bounce: false,
            no_minlight: false,
            no_expand: false,
            light_ignore: false,
            phong_angle: 0.0,
            phong_angle_concave: 0.0,
            minlight: 0.0,
            minlight_color: [0; 3],
            light_alpha: 0.0,
        }
    }
}

impl SurfFlags {
    pub fn from_native(native: i32) -> Self {
        SurfFlags {
            native,
            ..Default::default()
        }
    }

    /// True when any extension field diverges from its default and the
    /// flags must be serialized to an extended texinfo sidecar. The
    /// native bits and skip/hint markers live elsewhere and don't count.
    pub fn needs_write(&self) -> bool {
        self.no_dirt
            || self.no_shadow
            || self.no_bounce
            || self.no_minlight
            || self.no_expand
            || self.light_ignore
            || self.phong_angle != 0.0
            || self.phong_angle_concave != 0.0
            || self.minlight != 0.0
            || self.minlight_color != [0; 3]
            || self.light_alpha != 0.0
    }

    pub fn is_valid(&self, game: &dyn GameDef) -> bool {
        game.surfflags_are_valid(self)
    }
}

// Sorting follows field declaration order, like a tuple comparison,
// so de-duplication maps keyed on flags stay stable.
impl Ord for SurfFlags {
    fn cmp(&self, other: &Self) -> Ordering {
        self.native
            .cmp(&other.native)
            .then(self.is_skip.cmp(&other.is_skip))
            .then(self.is_hint.cmp(&other.is_hint))
            .then(self.no_dirt.cmp(&other.no_dirt))
            .then(self.no_shadow.cmp(&other.no_shadow))
            .then(self.no_bounce.cmp(&other.no_bounce))
            .then(self.no_minlight.cmp(&other.no_minlight))
            .then(self.no_expand.cmp(&other.no_expand))
            .then(self.light_ignore.cmp(&other.light_ignore))
            .then(self.phong_angle.total_cmp(&other.phong_angle))
            .then(self.phong_angle_concave.total_cmp(&other.phong_angle_concave))
            .then(self.minlight.total_cmp(&other.minlight))
            .then(self.minlight_color.cmp(&other.minlight_color))
            .then(self.light_alpha.total_cmp(&other.light_alpha))
    }
}

impl PartialOrd for SurfFlags {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SurfFlags {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SurfFlags {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_flags_default() {
        let c = ContentFlags::default();
        assert_eq!(c.native, 0);
        assert_eq!(c.game_data, GameData::None);
        assert_eq!(c.mirror_inside, None);
        assert_eq!(c.clips_same_type, None);
        assert!(!c.illusionary_visblocker);
    }

    #[test]
    fn test_set_chaining() {
        let c = ContentFlags::from_native(-3)
            .set_mirrored(Some(true))
            .set_clips_same_type(Some(false));
        assert_eq!(c.native, -3);
        assert_eq!(c.mirror_inside, Some(true));
        assert_eq!(c.clips_same_type, Some(false));
    }

    #[test]
    fn test_needs_write_default_false() {
        let f = SurfFlags::default();
        assert!(!f.needs_write());
    }

    #[test]
    fn test_needs_write_each_extension_field() {
        let base = SurfFlags::default();

        // native, skip, and hint never force an extended write
        let mut f = base;
        f.native = 0x40;
        f.is_skip = true;
        f.is_hint = true;
        assert!(!f.needs_write());

        let mut f = base;
        f.no_dirt = true;
        assert!(f.needs_write());

        let mut f = base;
        f.phong_angle = 45.0;
        assert!(f.needs_write());

        let mut f = base;
        f.minlight_color = [16, 0, 0];
        assert!(f.needs_write());

        let mut f = base;
        f.light_alpha = 0.5;
        assert!(f.needs_write());
    }

    #[test]
    fn test_surfflags_ordering() {
        let a = SurfFlags::default();
        let mut b = SurfFlags::default();
        b.native = 1;
        assert!(a < b);

        let mut c = SurfFlags::default();
        c.phong_angle = 30.0;
        assert!(a < c);
        assert!(c < b); // native compares before the floats

        assert_eq!(a, SurfFlags::default());
    }
}
