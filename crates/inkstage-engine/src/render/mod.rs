//! GPU rendering subsystem.
//!
//! Skins never touch wgpu directly. They talk to a [`RenderBackend`], the
//! explicit rendering context that owns every texture and the single active
//! draw region. [`WgpuBackend`] is the production implementation; tests use a
//! CPU mock.
//!
//! Convention:
//! - CPU geometry is in texels (top-left origin, +Y down).
//! - Vertex shaders convert to NDC using a viewport uniform.
//! - Texture data is premultiplied RGBA8.

mod backend;
mod common;
mod compositor;
mod ctx;
mod region;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{
    DrawRegion, LineInstance, RegionError, RenderBackend, ResourceError, TextureId,
};
pub use compositor::{SkinDraw, SkinRenderer};
pub use ctx::{RenderCtx, RenderTarget};
pub use region::RegionGuard;
pub use wgpu_backend::WgpuBackend;
