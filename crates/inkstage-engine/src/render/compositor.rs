use bytemuck::{Pod, Zeroable};

use crate::coords::Rect;
use crate::render::{RenderCtx, RenderTarget, TextureId, WgpuBackend};

use super::common::{quad_pipeline, viewport_ubo_layout_entry, QuadBuffers, ViewportUniform};

/// One drawable's appearance for this frame.
///
/// `texture` comes from `Skin::get_texture`, `nearest` from `Skin::use_nearest`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SkinDraw {
    pub texture: TextureId,
    /// Destination in stage pixels.
    pub rect: Rect,
    pub nearest: bool,
    pub opacity: f32,
}

/// Draws skin textures as axis-aligned quads, back to front.
///
/// Each draw binds its own texture, with a point or linear sampler depending
/// on `SkinDraw::nearest`.
#[derive(Default)]
pub struct SkinRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,

    viewport_ubo: Option<wgpu::Buffer>,
    linear_sampler: Option<wgpu::Sampler>,
    nearest_sampler: Option<wgpu::Sampler>,

    quad: Option<QuadBuffers>,
    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl SkinRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        backend: &WgpuBackend,
        draws: &[SkinDraw],
    ) {
        let visible: Vec<&SkinDraw> = draws
            .iter()
            .filter(|d| !d.rect.is_empty() && d.opacity > 0.0)
            .collect();
        let instances: Vec<SkinInstance> = visible
            .iter()
            .map(|d| SkinInstance {
                dst_min: [d.rect.origin.x, d.rect.origin.y],
                dst_max: [d.rect.max().x, d.rect.max().y],
                opacity: d.opacity.min(1.0),
                _pad: 0.0,
            })
            .collect();
        if instances.is_empty() || !ctx.viewport.is_valid() {
            return;
        }

        self.ensure_pipeline(ctx);
        self.ensure_resources(ctx);
        self.ensure_instance_capacity(ctx, instances.len());

        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let Some(ubo) = self.viewport_ubo.as_ref() else { return };
        let Some(linear) = self.linear_sampler.as_ref() else { return };
        let Some(nearest) = self.nearest_sampler.as_ref() else { return };
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(quad) = self.quad.as_ref() else { return };

        ctx.queue.write_buffer(
            ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform::new(ctx.viewport.width, ctx.viewport.height)),
        );
        ctx.queue.write_buffer(instance_vbo, 0, bytemuck::cast_slice(&instances));

        let bind_groups: Vec<wgpu::BindGroup> = visible
            .iter()
            .map(|d| {
                let sampler = if d.nearest { nearest } else { linear };
                ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("inkstage skin bind group"),
                    layout: bgl,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(backend.view(d.texture)),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                    ],
                })
            })
            .collect();

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("inkstage skin pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, quad.vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad.ibo.slice(..), wgpu::IndexFormat::Uint16);
        for (i, bind_group) in bind_groups.iter().enumerate() {
            let i = i as u32;
            rpass.set_bind_group(0, bind_group, &[]);
            rpass.draw_indexed(0..6, 0, i..i + 1);
        }
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.target_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("inkstage skin shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/skin.wgsl").into()),
        });

        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("inkstage skin bgl"),
            entries: &[
                viewport_ubo_layout_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline = quad_pipeline(
            ctx.device,
            "inkstage skin",
            &shader,
            &bgl,
            SkinInstance::layout(),
            ctx.target_format,
        );

        self.pipeline_format = Some(ctx.target_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bgl);
    }

    fn ensure_resources(&mut self, ctx: &RenderCtx<'_>) {
        if self.viewport_ubo.is_none() {
            self.viewport_ubo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("inkstage skin viewport ubo"),
                size: std::mem::size_of::<ViewportUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        if self.linear_sampler.is_none() {
            self.linear_sampler = Some(sampler(ctx.device, wgpu::FilterMode::Linear));
        }
        if self.nearest_sampler.is_none() {
            self.nearest_sampler = Some(sampler(ctx.device, wgpu::FilterMode::Nearest));
        }
        if self.quad.is_none() {
            self.quad = Some(QuadBuffers::new(ctx.device, "inkstage skin"));
        }
    }

    fn ensure_instance_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(64);
        self.instance_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("inkstage skin instance vbo"),
            size: (new_cap * std::mem::size_of::<SkinInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }
}

fn sampler(device: &wgpu::Device, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(match filter {
            wgpu::FilterMode::Nearest => "inkstage skin nearest sampler",
            wgpu::FilterMode::Linear => "inkstage skin linear sampler",
        }),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Instance data layout (24 bytes):
///
///  offset  0  dst_min  [f32; 2]   loc 1
///  offset  8  dst_max  [f32; 2]   loc 2
///  offset 16  opacity  f32        loc 3
///  offset 20  _pad     f32
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SkinInstance {
    dst_min: [f32; 2],
    dst_max: [f32; 2],
    opacity: f32,
    _pad: f32,
}

impl SkinInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x2, // dst_min
        2 => Float32x2, // dst_max
        3 => Float32    // opacity
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SkinInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}
