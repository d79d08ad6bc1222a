//! CPU-only [`RenderBackend`] for tests.
//!
//! Tracks allocations and draw-region balance, rasterizes lines into plain
//! byte buffers, and can be told to fail uploads or draws.

use std::collections::HashMap;

use super::{DrawRegion, LineInstance, RegionError, RenderBackend, ResourceError, TextureId};

struct MockTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

pub(crate) struct MockBackend {
    next_id: u32,
    placeholder: TextureId,
    textures: HashMap<TextureId, MockTexture>,
    max_dimension: u32,

    bound: Option<TextureId>,
    active: Option<(DrawRegion, Option<TextureId>)>,
    depth: i32,
    enters: usize,
    exits: usize,

    uploads: usize,
    released: Vec<TextureId>,
    lines: Vec<(TextureId, LineInstance)>,
    clears: usize,

    /// Every upload fails.
    pub fail_uploads: bool,
    /// Uploads wider or taller than this fail.
    pub fail_uploads_above: Option<u32>,
    /// Every `draw_line` fails.
    pub fail_draws: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        let mut backend = Self {
            next_id: 0,
            placeholder: TextureId(0),
            textures: HashMap::new(),
            max_dimension: 8192,
            bound: None,
            active: None,
            depth: 0,
            enters: 0,
            exits: 0,
            uploads: 0,
            released: Vec::new(),
            lines: Vec::new(),
            clears: 0,
            fail_uploads: false,
            fail_uploads_above: None,
            fail_draws: false,
        };
        backend.placeholder = backend.insert(1, 1, vec![0; 4]);
        backend
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension, ..Self::new() }
    }

    fn insert(&mut self, width: u32, height: u32, pixels: Vec<u8>) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(id, MockTexture { width, height, pixels });
        id
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), ResourceError> {
        if width == 0 || height == 0 {
            return Err(ResourceError::ZeroSized);
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(ResourceError::TooLarge { width, height, max: self.max_dimension });
        }
        Ok(())
    }

    // ── inspection ────────────────────────────────────────────────────────

    /// Live textures, excluding the placeholder.
    pub fn live_textures(&self) -> usize {
        self.textures.len() - 1
    }

    pub fn is_live(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).map(|t| (t.width, t.height))
    }

    pub fn uploads(&self) -> usize {
        self.uploads
    }

    pub fn released(&self) -> &[TextureId] {
        &self.released
    }

    pub fn lines(&self) -> &[(TextureId, LineInstance)] {
        &self.lines
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn region_depth(&self) -> i32 {
        self.depth
    }

    pub fn enter_count(&self) -> usize {
        self.enters
    }

    pub fn exit_count(&self) -> usize {
        self.exits
    }

    pub fn bound_target(&self) -> Option<TextureId> {
        self.bound
    }
}

impl RenderBackend for MockBackend {
    fn placeholder(&self) -> TextureId {
        self.placeholder
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureId, ResourceError> {
        self.check_size(width, height)?;
        if self.fail_uploads || self.fail_uploads_above.is_some_and(|max| width > max || height > max) {
            return Err(ResourceError::Device("out of memory".into()));
        }
        assert_eq!(pixels.len(), (width * height * 4) as usize, "upload size mismatch");
        self.uploads += 1;
        Ok(self.insert(width, height, pixels.to_vec()))
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<TextureId, ResourceError> {
        self.check_size(width, height)?;
        Ok(self.insert(width, height, vec![0; (width * height * 4) as usize]))
    }

    fn release_texture(&mut self, id: TextureId) {
        if id == self.placeholder {
            return;
        }
        if self.textures.remove(&id).is_some() {
            self.released.push(id);
        }
    }

    fn active_region(&self) -> Option<DrawRegion> {
        self.active.map(|(region, _)| region)
    }

    fn enter_region(&mut self, region: DrawRegion, target: TextureId) -> Result<(), RegionError> {
        if let Some((active, _)) = self.active {
            return Err(RegionError::AlreadyActive { active, requested: region });
        }
        if !self.textures.contains_key(&target) {
            return Err(RegionError::UnknownTarget(target));
        }
        self.active = Some((region, self.bound));
        self.bound = Some(target);
        self.depth += 1;
        self.enters += 1;
        Ok(())
    }

    fn exit_region(&mut self, region: DrawRegion) {
        match self.active.take() {
            Some((active, previous)) if active == region => {
                self.bound = previous;
                self.depth -= 1;
                self.exits += 1;
            }
            other => panic!("unbalanced exit of {region:?}; active was {other:?}"),
        }
    }

    fn clear_target(&mut self) -> Result<(), ResourceError> {
        let target = self.bound.filter(|_| self.active.is_some()).ok_or(ResourceError::NoActiveRegion)?;
        let tex = self.textures.get_mut(&target).ok_or(ResourceError::UnknownTexture(target))?;
        tex.pixels.fill(0);
        self.clears += 1;
        Ok(())
    }

    fn draw_line(&mut self, line: &LineInstance) -> Result<(), ResourceError> {
        match self.active {
            Some((DrawRegion::DrawingLine, _)) => {}
            _ => return Err(ResourceError::NoActiveRegion),
        }
        if self.fail_draws {
            return Err(ResourceError::Device("draw failed".into()));
        }
        let target = self.bound.ok_or(ResourceError::NoActiveRegion)?;
        let tex = self.textures.get_mut(&target).ok_or(ResourceError::UnknownTexture(target))?;
        stamp_line(tex, line);
        self.lines.push((target, *line));
        Ok(())
    }

    fn read_target(&mut self, target: TextureId) -> Result<Vec<u8>, ResourceError> {
        self.textures
            .get(&target)
            .map(|t| t.pixels.clone())
            .ok_or(ResourceError::UnknownTexture(target))
    }
}

/// Fills every texel whose center lies within `diameter / 2` of the segment.
fn stamp_line(tex: &mut MockTexture, line: &LineInstance) {
    let [x0, y0, x1, y1] = line.endpoints;
    let radius = (line.diameter * 0.5).max(0.5);
    let color = line.color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);

    let (dx, dy) = (x1 - x0, y1 - y0);
    let len_sq = dx * dx + dy * dy;

    for y in 0..tex.height {
        for x in 0..tex.width {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let t = if len_sq > 0.0 {
                (((px - x0) * dx + (py - y0) * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (cx, cy) = (x0 + dx * t, y0 + dy * t);
            if (px - cx).powi(2) + (py - cy).powi(2) <= radius * radius {
                let i = ((y * tex.width + x) * 4) as usize;
                tex.pixels[i..i + 4].copy_from_slice(&color);
            }
        }
    }
}
