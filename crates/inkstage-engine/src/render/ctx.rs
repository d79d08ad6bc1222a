use crate::coords::Viewport;

use super::WgpuBackend;

/// Device handles plus the format and size of the surface being drawn into.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub target_format: wgpu::TextureFormat,
    pub viewport: Viewport, // texels
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        target_format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Self {
        Self { device, queue, target_format, viewport }
    }

    /// Context for drawing into a render target owned by `backend`.
    pub fn for_backend(backend: &'a WgpuBackend, viewport: Viewport) -> Self {
        Self::new(backend.device(), backend.queue(), backend.texture_format(), viewport)
    }
}

/// Command encoder and the color attachment a pass writes to.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}
