use resvg::tiny_skia;

use crate::normalize::NormalizedSvg;

/// Premultiplied RGBA8 pixels, tightly packed, row-major, top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// Alpha channel only, one byte per pixel.
    pub fn alpha(&self) -> Vec<u8> {
        self.pixels.chunks_exact(4).map(|px| px[3]).collect()
    }
}

/// Pixel extent of `units` scene units at `scale`, never below one pixel.
#[inline]
pub fn scaled_extent(units: f32, scale: f32) -> u32 {
    let px = (units * scale).ceil();
    if px.is_finite() && px >= 1.0 { px as u32 } else { 1 }
}

impl NormalizedSvg {
    /// Rasterizes the content bounds at a uniform `scale`.
    ///
    /// Returns `None` when no pixmap of that size can be allocated.
    pub fn rasterize(&self, scale: f32) -> Option<RasterImage> {
        let bounds = self.bounds();
        let width = scaled_extent(bounds.width, scale);
        let height = scaled_extent(bounds.height, scale);

        let mut pixmap = tiny_skia::Pixmap::new(width, height)?;
        let transform =
            tiny_skia::Transform::from_scale(scale, scale).pre_translate(-bounds.x, -bounds.y);
        resvg::render(self.tree(), transform, &mut pixmap.as_mut());

        Some(RasterImage { width, height, pixels: pixmap.take() })
    }
}
