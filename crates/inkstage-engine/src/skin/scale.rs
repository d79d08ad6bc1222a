/// Per-axis display scale in percent (`100` = native size).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub const NATIVE: Scale = Scale { x: 100.0, y: 100.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn uniform(percent: f32) -> Self {
        Self { x: percent, y: percent }
    }

    /// Larger unsigned component.
    #[inline]
    pub fn max_abs(self) -> f32 {
        self.x.abs().max(self.y.abs())
    }

    /// Larger signed component.
    #[inline]
    pub fn max_element(self) -> f32 {
        self.x.max(self.y)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::NATIVE
    }
}

impl From<[f32; 2]> for Scale {
    #[inline]
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

/// Mip level holding native (1×) resolution. Level 0 is 1/256×.
pub const NATIVE_MIP_LEVEL: u8 = 8;

/// Scale factor to rasterize at, clamped to the texture budget.
#[inline]
pub fn requested_scale(scale: Option<Scale>, max_texture_scale: f32) -> f32 {
    let scale_max = scale.map_or(100.0, Scale::max_abs);
    (scale_max / 100.0).min(max_texture_scale)
}

/// Smallest level whose scale is at least `requested`.
#[inline]
pub fn mip_level(requested: f32) -> u8 {
    // NaN and -inf both land on level 0.
    let level = requested.log2().ceil() + f32::from(NATIVE_MIP_LEVEL);
    level.max(0.0).min(f32::from(u8::MAX)) as u8
}

/// Rasterization scale of `level`.
#[inline]
pub fn mip_scale(level: u8) -> f32 {
    2f32.powi(i32::from(level) - i32::from(NATIVE_MIP_LEVEL))
}
