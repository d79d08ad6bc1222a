/// Per-texel alpha map of a skin, for pixel-accurate hit testing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Silhouette {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl Silhouette {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds from premultiplied RGBA8 pixels. Returns an empty silhouette if
    /// the buffer does not match the size.
    pub fn from_rgba(width: u32, height: u32, pixels: &[u8]) -> Self {
        if pixels.len() != width as usize * height as usize * 4 {
            log::warn!(
                "silhouette: {} bytes do not match {width}x{height}; dropping",
                pixels.len()
            );
            return Self::empty();
        }
        Self {
            width,
            height,
            alpha: pixels.chunks_exact(4).map(|px| px[3]).collect(),
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.alpha.is_empty()
    }

    /// Alpha of the texel nearest to `(u, v)`, or `None` outside `[0, 1)`.
    pub fn alpha_at(&self, u: f32, v: f32) -> Option<u8> {
        if self.is_empty() || !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return None;
        }
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.alpha.get((y * self.width + x) as usize).copied()
    }

    /// True when the texel under `(u, v)` is not fully transparent.
    #[inline]
    pub fn is_touching(&self, u: f32, v: f32) -> bool {
        self.alpha_at(u, v).is_some_and(|a| a > 0)
    }
}
