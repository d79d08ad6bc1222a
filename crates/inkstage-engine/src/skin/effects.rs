use std::ops::{BitOr, BitOrAssign};

/// Set of active drawable effects, one bit per entry in [`EFFECTS`].
///
/// Skins only test membership; they never interpret what an effect does.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct EffectMask(u32);

impl EffectMask {
    pub const NONE: EffectMask = EffectMask(0);
    pub const COLOR: EffectMask = EffectMask(1 << 0);
    pub const FISHEYE: EffectMask = EffectMask(1 << 1);
    pub const WHIRL: EffectMask = EffectMask(1 << 2);
    pub const PIXELATE: EffectMask = EffectMask(1 << 3);
    pub const MOSAIC: EffectMask = EffectMask(1 << 4);
    pub const BRIGHTNESS: EffectMask = EffectMask(1 << 5);
    pub const GHOST: EffectMask = EffectMask(1 << 6);

    /// Effects that move pixels around; point sampling makes them look worse.
    pub const DISTORTIONS: EffectMask =
        EffectMask(Self::FISHEYE.0 | Self::WHIRL.0 | Self::PIXELATE.0 | Self::MOSAIC.0);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// All bits of `other` are set.
    #[inline]
    pub const fn contains(self, other: EffectMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any bit of `other` is set.
    #[inline]
    pub const fn intersects(self, other: EffectMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Mask for a list of effect names; unknown names are ignored.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(Effect::by_name)
            .fold(Self::NONE, |mask, effect| mask | effect.mask)
    }
}

impl BitOr for EffectMask {
    type Output = EffectMask;
    #[inline]
    fn bitor(self, rhs: EffectMask) -> EffectMask {
        EffectMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for EffectMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: EffectMask) {
        self.0 |= rhs.0;
    }
}

/// A named effect and its bit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Effect {
    pub name: &'static str,
    pub mask: EffectMask,
}

impl Effect {
    pub fn by_name(name: &str) -> Option<Effect> {
        EFFECTS.iter().copied().find(|e| e.name == name)
    }
}

pub const EFFECTS: [Effect; 7] = [
    Effect { name: "color", mask: EffectMask::COLOR },
    Effect { name: "fisheye", mask: EffectMask::FISHEYE },
    Effect { name: "whirl", mask: EffectMask::WHIRL },
    Effect { name: "pixelate", mask: EffectMask::PIXELATE },
    Effect { name: "mosaic", mask: EffectMask::MOSAIC },
    Effect { name: "brightness", mask: EffectMask::BRIGHTNESS },
    Effect { name: "ghost", mask: EffectMask::GHOST },
];
