use std::fmt;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Opaque handle to a texture owned by a [`RenderBackend`].
///
/// Handles are never reused within one backend, so a stale handle can be
/// detected instead of silently aliasing a newer texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(pub(crate) u32);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// A scoped period during which one render target and one program are bound.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DrawRegion {
    /// Target bound with the line program and the unit-quad geometry.
    DrawingLine,
    /// Target bound for whole-buffer operations (clear).
    UsingBuffer,
}

/// Texture allocation or GPU-side failure. Recoverable: callers degrade to a
/// coarser texture or the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("texture {width}x{height} exceeds the device limit of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("texture has a zero dimension")]
    ZeroSized,

    #[error("unknown texture {0}")]
    UnknownTexture(TextureId),

    #[error("operation requires an active draw region")]
    NoActiveRegion,

    #[error("device error: {0}")]
    Device(String),
}

/// Misuse of the draw-region discipline. A programming error, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    #[error("cannot enter {requested:?} while {active:?} is active")]
    AlreadyActive { active: DrawRegion, requested: DrawRegion },

    #[error("cannot bind unknown render target {0}")]
    UnknownTarget(TextureId),
}

/// One pen segment, as uploaded to the line program.
///
/// Layout (48 bytes):
///
///  offset  0  endpoints [f32; 4]   loc 1  (x0, y0, x1, y1) in texels
///  offset 16  color     [f32; 4]   loc 2  premultiplied
///  offset 32  diameter  f32        loc 3
///  offset 36  _pad      [f32; 3]
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineInstance {
    pub endpoints: [f32; 4],
    pub color: [f32; 4],
    pub diameter: f32,
    pub _pad: [f32; 3],
}

impl LineInstance {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32, diameter: f32, color: [f32; 4]) -> Self {
        Self {
            endpoints: [x0, y0, x1, y1],
            color,
            diameter,
            _pad: [0.0; 3],
        }
    }
}

/// Explicit rendering context for skins.
///
/// Owns every texture it hands out and the single "currently bound" render
/// destination. At most one [`DrawRegion`] is active at a time; entering a
/// second one fails. Prefer [`RegionGuard`](super::RegionGuard) over calling
/// `enter_region`/`exit_region` by hand.
pub trait RenderBackend {
    /// A 1×1 transparent texture that is always valid and never released.
    fn placeholder(&self) -> TextureId;

    /// Largest width or height a single texture may have.
    fn max_texture_dimension(&self) -> u32;

    /// Uploads premultiplied RGBA8 pixels (`width * height * 4` bytes) as a
    /// sampleable texture.
    fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureId, ResourceError>;

    /// Allocates a render target cleared to transparent.
    fn create_render_target(&mut self, width: u32, height: u32)
        -> Result<TextureId, ResourceError>;

    /// Releases a texture. Unknown handles and the placeholder are ignored.
    fn release_texture(&mut self, id: TextureId);

    /// Region currently active, if any.
    fn active_region(&self) -> Option<DrawRegion>;

    /// Binds `target` as the destination for `region`, remembering the
    /// previous binding.
    fn enter_region(&mut self, region: DrawRegion, target: TextureId) -> Result<(), RegionError>;

    /// Flushes the region's work and restores the previous binding.
    fn exit_region(&mut self, region: DrawRegion);

    /// Clears the bound target to transparent black.
    fn clear_target(&mut self) -> Result<(), ResourceError>;

    /// Draws one line segment into the bound target.
    fn draw_line(&mut self, line: &LineInstance) -> Result<(), ResourceError>;

    /// Reads a texture back as premultiplied RGBA8 (tightly packed rows).
    fn read_target(&mut self, target: TextureId) -> Result<Vec<u8>, ResourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_instance_is_48_bytes() {
        assert_eq!(std::mem::size_of::<LineInstance>(), 48);
    }
}
