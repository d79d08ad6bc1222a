use std::collections::HashMap;

use super::backend::{DrawRegion, LineInstance, RegionError, RenderBackend, ResourceError, TextureId};
use super::common::{
    quad_pipeline, viewport_ubo_layout_entry, QuadBuffers, ViewportUniform, SKIN_TEXTURE_FORMAT,
};

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Work recorded while a draw region is active. Submitted on exit.
struct ActiveRegion {
    region: DrawRegion,
    target: TextureId,
    previous: Option<TextureId>,
    encoder: wgpu::CommandEncoder,
    lines: Vec<LineInstance>,
}

/// Line program: unit quad extruded around each segment by the vertex shader.
struct LineProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    viewport_ubo: wgpu::Buffer,
    quad: QuadBuffers,
    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

/// [`RenderBackend`] over a wgpu device.
///
/// All textures are `Rgba8Unorm` holding premultiplied alpha. Work issued inside
/// a draw region is recorded into one encoder and submitted when the region
/// exits; lines drawn in the same region are batched into one instanced draw.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    textures: HashMap<TextureId, GpuTexture>,
    next_id: u32,
    placeholder: TextureId,

    bound_target: Option<TextureId>,
    active: Option<ActiveRegion>,

    line: Option<LineProgram>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let mut backend = Self {
            device,
            queue,
            textures: HashMap::new(),
            next_id: 0,
            placeholder: TextureId(0),
            bound_target: None,
            active: None,
            line: None,
        };
        let placeholder = backend.allocate(
            1,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            "inkstage placeholder",
        );
        backend.write_pixels(placeholder, &[0; 4]);
        backend.placeholder = placeholder;
        backend
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// View for sampling a texture. Unknown handles resolve to the placeholder.
    pub fn view(&self, id: TextureId) -> &wgpu::TextureView {
        self.textures
            .get(&id)
            .or_else(|| self.textures.get(&self.placeholder))
            .map(|t| &t.view)
            .expect("placeholder texture lives as long as the backend")
    }

    /// Size of a live texture in texels.
    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).map(|t| (t.width, t.height))
    }

    /// Format of every texture and render target this backend creates.
    pub fn texture_format(&self) -> wgpu::TextureFormat {
        SKIN_TEXTURE_FORMAT
    }

    // ── allocation ─────────────────────────────────────────────────────────

    fn check_size(&self, width: u32, height: u32) -> Result<(), ResourceError> {
        if width == 0 || height == 0 {
            return Err(ResourceError::ZeroSized);
        }
        let max = self.max_texture_dimension();
        if width > max || height > max {
            return Err(ResourceError::TooLarge { width, height, max });
        }
        Ok(())
    }

    fn allocate(
        &mut self,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> TextureId {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SKIN_TEXTURE_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = TextureId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.textures.insert(id, GpuTexture { texture, view, width, height });
        id
    }

    fn write_pixels(&self, id: TextureId, pixels: &[u8]) {
        let Some(tex) = self.textures.get(&id) else { return };
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(tex.width * 4),
                rows_per_image: Some(tex.height),
            },
            wgpu::Extent3d { width: tex.width, height: tex.height, depth_or_array_layers: 1 },
        );
    }

    // ── line program ───────────────────────────────────────────────────────

    fn ensure_line_program(&mut self) {
        if self.line.is_some() {
            return;
        }

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("inkstage line shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/line.wgsl").into()),
        });

        let bgl = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("inkstage line bgl"),
            entries: &[viewport_ubo_layout_entry(0)],
        });

        let pipeline = quad_pipeline(
            &self.device,
            "inkstage line",
            &shader,
            &bgl,
            line_instance_layout(),
            SKIN_TEXTURE_FORMAT,
        );

        let viewport_ubo = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("inkstage line viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("inkstage line bind group"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        self.line = Some(LineProgram {
            pipeline,
            bind_group,
            viewport_ubo,
            quad: QuadBuffers::new(&self.device, "inkstage line"),
            instance_vbo: None,
            instance_capacity: 0,
        });
    }

    /// Encodes the batched lines of a finished `DrawingLine` region.
    fn encode_lines(&mut self, active: &mut ActiveRegion) {
        if active.lines.is_empty() {
            return;
        }
        self.ensure_line_program();
        let Some(tex) = self.textures.get(&active.target) else { return };
        let Some(line) = self.line.as_mut() else { return };

        if active.lines.len() > line.instance_capacity || line.instance_vbo.is_none() {
            let cap = active.lines.len().next_power_of_two().max(64);
            line.instance_vbo = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("inkstage line instance vbo"),
                size: (cap * std::mem::size_of::<LineInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            line.instance_capacity = cap;
        }
        let Some(instance_vbo) = line.instance_vbo.as_ref() else { return };

        self.queue.write_buffer(
            &line.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform::new(tex.width as f32, tex.height as f32)),
        );
        self.queue.write_buffer(instance_vbo, 0, bytemuck::cast_slice(&active.lines));

        let mut rpass = active.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("inkstage line pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &tex.view,
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

        rpass.set_pipeline(&line.pipeline);
        rpass.set_bind_group(0, &line.bind_group, &[]);
        rpass.set_vertex_buffer(0, line.quad.vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(line.quad.ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..active.lines.len() as u32);
    }
}

fn line_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x4, // endpoints
        2 => Float32x4, // color
        3 => Float32    // diameter
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LineInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRS,
    }
}

impl RenderBackend for WgpuBackend {
    fn placeholder(&self) -> TextureId {
        self.placeholder
    }

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureId, ResourceError> {
        self.check_size(width, height)?;
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            return Err(ResourceError::Device(format!(
                "expected {} bytes for {width}x{height}, got {}",
                width as usize * height as usize * 4,
                pixels.len()
            )));
        }
        let id = self.allocate(
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            "inkstage skin texture",
        );
        self.write_pixels(id, pixels);
        Ok(id)
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<TextureId, ResourceError> {
        self.check_size(width, height)?;
        // New textures are zero-initialized by wgpu, i.e. transparent black.
        Ok(self.allocate(
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            "inkstage render target",
        ))
    }

    fn release_texture(&mut self, id: TextureId) {
        if id == self.placeholder {
            return;
        }
        if let Some(tex) = self.textures.remove(&id) {
            tex.texture.destroy();
        }
    }

    fn active_region(&self) -> Option<DrawRegion> {
        self.active.as_ref().map(|a| a.region)
    }

    fn enter_region(&mut self, region: DrawRegion, target: TextureId) -> Result<(), RegionError> {
        if let Some(active) = &self.active {
            log::error!("draw region {region:?} entered while {:?} is active", active.region);
            return Err(RegionError::AlreadyActive { active: active.region, requested: region });
        }
        if !self.textures.contains_key(&target) {
            return Err(RegionError::UnknownTarget(target));
        }

        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(match region {
                DrawRegion::DrawingLine => "inkstage line encoder",
                DrawRegion::UsingBuffer => "inkstage buffer encoder",
            }),
        });

        self.active = Some(ActiveRegion {
            region,
            target,
            previous: self.bound_target,
            encoder,
            lines: Vec::new(),
        });
        self.bound_target = Some(target);
        Ok(())
    }

    fn exit_region(&mut self, region: DrawRegion) {
        let Some(mut active) = self.active.take() else {
            log::error!("exit of {region:?} without an active draw region");
            return;
        };
        if active.region != region {
            log::error!("exit of {region:?} while {:?} is active", active.region);
        }

        if active.region == DrawRegion::DrawingLine {
            self.encode_lines(&mut active);
        }

        self.queue.submit(std::iter::once(active.encoder.finish()));
        self.bound_target = active.previous;
    }

    fn clear_target(&mut self) -> Result<(), ResourceError> {
        let active = self.active.as_mut().ok_or(ResourceError::NoActiveRegion)?;
        let tex = self
            .textures
            .get(&active.target)
            .ok_or(ResourceError::UnknownTexture(active.target))?;

        // Lines queued earlier in this region would be lost by the clear.
        active.lines.clear();

        let _rpass = active.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("inkstage clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &tex.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    fn draw_line(&mut self, line: &LineInstance) -> Result<(), ResourceError> {
        match self.active.as_mut() {
            Some(active) if active.region == DrawRegion::DrawingLine => {
                active.lines.push(*line);
                Ok(())
            }
            _ => Err(ResourceError::NoActiveRegion),
        }
    }

    fn read_target(&mut self, target: TextureId) -> Result<Vec<u8>, ResourceError> {
        let tex = self.textures.get(&target).ok_or(ResourceError::UnknownTexture(target))?;

        let unpadded = tex.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("inkstage readback"),
            size: padded as u64 * tex.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("inkstage readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(tex.height),
                },
            },
            wgpu::Extent3d { width: tex.width, height: tex.height, depth_or_array_layers: 1 },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| ResourceError::Device(e.to_string()))?;
        rx.recv()
            .map_err(|e| ResourceError::Device(e.to_string()))?
            .map_err(|e| ResourceError::Device(e.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded * tex.height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        Ok(pixels)
    }
}
