use crate::paint::Color;
use crate::render::{DrawRegion, LineInstance, RegionGuard, RenderBackend, ResourceError, TextureId};

use super::{EffectMask, Scale, Silhouette, Skin, SkinBase, SkinError, SkinId};

/// Pen diameter when none is given.
pub const DEFAULT_PEN_DIAMETER: f32 = 1.0;
/// Pen color (straight RGBA) when none is given.
pub const DEFAULT_PEN_COLOR: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Pen settings for one draw call. Unset fields use the defaults, and a
/// diameter that is not positive counts as unset.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PenAttributes {
    pub diameter: Option<f32>,
    /// Straight (non-premultiplied) RGBA in `[0, 1]`.
    pub color: Option<[f32; 4]>,
}

impl PenAttributes {
    pub fn new(diameter: f32, color: [f32; 4]) -> Self {
        Self { diameter: Some(diameter), color: Some(color) }
    }
}

/// Endpoint shift that keeps 1 and 3 texel hairlines on texel centers.
#[inline]
pub fn pixel_alignment_offset(diameter: f32) -> f32 {
    if diameter == 1.0 || diameter == 3.0 { 0.5 } else { 0.0 }
}

/// Skin for the pen layer: one persistent render target the size of the
/// stage, accumulating lines and points until cleared.
///
/// Every draw runs inside a scoped [`DrawRegion`]:
///
/// ```text
/// Idle ──clear()──────► UsingBuffer ──► Idle
/// Idle ──draw_line()──► DrawingLine ──► Idle
/// ```
///
/// The region exits on every path out of the call, errors included.
pub struct StrokeSkin {
    base: SkinBase,
    canvas_size: [u32; 2],
    /// `None` while either canvas dimension is zero.
    target: Option<TextureId>,
    content_dirty: bool,
    silhouette: Silhouette,
    /// Reused for every draw call.
    line: LineInstance,
}

impl StrokeSkin {
    /// Creates the skin and allocates its target at `canvas_size` texels.
    pub fn new(
        id: SkinId,
        backend: &mut dyn RenderBackend,
        canvas_size: [u32; 2],
    ) -> Result<Self, SkinError> {
        let target = alloc_target(backend, canvas_size)?;
        Ok(Self {
            base: SkinBase::new(id, true),
            canvas_size,
            target,
            content_dirty: false,
            silhouette: Silhouette::empty(),
            line: LineInstance::new(0.0, 0.0, 0.0, 0.0, DEFAULT_PEN_DIAMETER, DEFAULT_PEN_COLOR),
        })
    }

    pub fn canvas_size(&self) -> [u32; 2] {
        self.canvas_size
    }

    pub fn target(&self) -> Option<TextureId> {
        self.target
    }

    /// Strokes were drawn since the silhouette was last refreshed.
    pub fn content_dirty(&self) -> bool {
        self.content_dirty
    }

    /// Target to draw into, or `None` when draws should be skipped.
    fn draw_target(&self) -> Option<TextureId> {
        if self.base.disposed {
            log::debug!("{}: draw after dispose ignored", self.base.id);
            return None;
        }
        self.target
    }

    /// Clears the whole layer to transparent.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) -> Result<(), SkinError> {
        let Some(target) = self.draw_target() else {
            return Ok(());
        };

        let result = enter_region(backend, DrawRegion::UsingBuffer, target, self.base.id)
            .and_then(|mut region| region.clear_target().map_err(SkinError::from));
        self.content_dirty = true;
        result
    }

    #[inline]
    pub fn draw_point(
        &mut self,
        backend: &mut dyn RenderBackend,
        attrs: &PenAttributes,
        x: f32,
        y: f32,
    ) -> Result<(), SkinError> {
        self.draw_line(backend, attrs, x, y, x, y)
    }

    /// Draws a round-capped segment. Coordinates are texels from the
    /// top-left corner of the layer.
    pub fn draw_line(
        &mut self,
        backend: &mut dyn RenderBackend,
        attrs: &PenAttributes,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
    ) -> Result<(), SkinError> {
        let Some(target) = self.draw_target() else {
            return Ok(());
        };

        let diameter = attrs.diameter.filter(|d| *d > 0.0).unwrap_or(DEFAULT_PEN_DIAMETER);
        let offset = pixel_alignment_offset(diameter);
        let color = Color::from_straight_array(attrs.color.unwrap_or(DEFAULT_PEN_COLOR));

        self.line.endpoints = [x0 + offset, y0 + offset, x1 + offset, y1 + offset];
        self.line.diameter = diameter;
        self.line.color = color.to_array();

        let line = &self.line;
        let result = enter_region(backend, DrawRegion::DrawingLine, target, self.base.id)
            .and_then(|mut region| region.draw_line(line).map_err(SkinError::from));
        self.content_dirty = true;
        result
    }

    /// Reallocates the layer for a new stage size. Prior strokes are lost.
    pub fn on_native_size_changed(
        &mut self,
        backend: &mut dyn RenderBackend,
        size: [u32; 2],
    ) -> Result<(), SkinError> {
        self.base.ensure_live()?;
        debug_assert!(backend.active_region().is_none(), "resize inside a draw region");

        if let Some(old) = self.target.take() {
            backend.release_texture(old);
        }
        self.canvas_size = size;
        self.content_dirty = false;
        self.silhouette = Silhouette::empty();

        self.target = alloc_target(backend, size)?;
        log::debug!("{}: pen layer reallocated at {}x{}", self.base.id, size[0], size[1]);
        Ok(())
    }

    /// Hit-test map of the layer, read back from the target when strokes
    /// were drawn since the last refresh.
    pub fn silhouette(&mut self, backend: &mut dyn RenderBackend) -> Result<&Silhouette, SkinError> {
        self.base.ensure_live()?;
        if self.content_dirty {
            if let Some(target) = self.target {
                let pixels = backend.read_target(target)?;
                let [w, h] = self.canvas_size;
                self.silhouette = Silhouette::from_rgba(w, h, &pixels);
                log::debug!("{}: silhouette refreshed from {target}", self.base.id);
            }
            self.content_dirty = false;
        }
        Ok(&self.silhouette)
    }
}

impl Skin for StrokeSkin {
    fn id(&self) -> SkinId {
        self.base.id
    }

    fn size(&self) -> [f32; 2] {
        [self.canvas_size[0] as f32, self.canvas_size[1] as f32]
    }

    fn get_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        _scale: Option<Scale>,
    ) -> Result<TextureId, SkinError> {
        self.base.ensure_live()?;
        Ok(self.target.unwrap_or_else(|| backend.placeholder()))
    }

    /// Point-sample when magnifying to keep strokes crisp; smooth when
    /// minifying so thin lines do not break up.
    fn use_nearest(&self, scale: Scale, _effects: EffectMask, _rotation_degrees: f32) -> bool {
        scale.max_element() >= 100.0
    }

    fn is_touching(
        &mut self,
        backend: &mut dyn RenderBackend,
        u: f32,
        v: f32,
    ) -> Result<bool, SkinError> {
        Ok(self.silhouette(backend)?.is_touching(u, v))
    }

    fn visible(&self) -> bool {
        self.base.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.base.visible = visible;
    }

    fn is_disposed(&self) -> bool {
        self.base.disposed
    }

    fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        if self.base.disposed {
            return;
        }
        if let Some(target) = self.target.take() {
            log::debug!("{}: releasing pen layer {target}", self.base.id);
            backend.release_texture(target);
        }
        self.silhouette = Silhouette::empty();
        self.content_dirty = false;
        self.base.disposed = true;
    }
}

fn alloc_target(
    backend: &mut dyn RenderBackend,
    [width, height]: [u32; 2],
) -> Result<Option<TextureId>, ResourceError> {
    if width == 0 || height == 0 {
        return Ok(None);
    }
    backend.create_render_target(width, height).map(Some)
}

fn enter_region<'a>(
    backend: &'a mut dyn RenderBackend,
    region: DrawRegion,
    target: TextureId,
    id: SkinId,
) -> Result<RegionGuard<'a>, SkinError> {
    RegionGuard::enter(backend, region, target).map_err(|err| {
        log::error!("{id}: {err}");
        SkinError::from(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mock::MockBackend;
    use crate::render::RegionError;

    fn skin(backend: &mut MockBackend) -> StrokeSkin {
        StrokeSkin::new(SkinId::new(7), backend, [16, 8]).unwrap()
    }

    fn pen(diameter: f32) -> PenAttributes {
        PenAttributes { diameter: Some(diameter), color: None }
    }

    fn assert_balanced(backend: &MockBackend) {
        assert_eq!(backend.active_region(), None);
        assert_eq!(backend.region_depth(), 0);
        assert_eq!(backend.enter_count(), backend.exit_count());
        assert_eq!(backend.bound_target(), None);
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn creates_one_transparent_target() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        assert_eq!(backend.live_textures(), 1);
        assert_eq!(skin.size(), [16.0, 8.0]);
        assert!(skin.visible());

        let target = skin.get_texture(&mut backend, None).unwrap();
        assert_eq!(Some(target), skin.target());
        assert_eq!(backend.texture_size(target), Some((16, 8)));
        assert!(backend.read_target(target).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn resize_replaces_target_and_resets_state() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        let old = skin.target().unwrap();
        skin.draw_point(&mut backend, &pen(4.0), 3.0, 3.0).unwrap();
        assert!(skin.content_dirty());

        skin.on_native_size_changed(&mut backend, [32, 24]).unwrap();
        let new = skin.target().unwrap();
        assert_ne!(new, old);
        assert!(!backend.is_live(old));
        assert_eq!(backend.live_textures(), 1);
        assert_eq!(backend.texture_size(new), Some((32, 24)));
        assert_eq!(skin.size(), [32.0, 24.0]);
        assert!(!skin.content_dirty());
        assert!(backend.read_target(new).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn dispose_releases_target() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        skin.dispose(&mut backend);
        skin.dispose(&mut backend);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(skin.get_texture(&mut backend, None), Err(SkinError::Disposed(skin.id())));
        assert_eq!(
            skin.on_native_size_changed(&mut backend, [4, 4]),
            Err(SkinError::Disposed(skin.id()))
        );
    }

    // ── drawing ───────────────────────────────────────────────────────────

    #[test]
    fn hairline_diameters_snap_to_texel_centers() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        for diameter in [1.0, 3.0, 2.0] {
            skin.draw_line(&mut backend, &pen(diameter), 10.0, 10.0, 10.0, 10.0).unwrap();
        }
        let endpoints: Vec<[f32; 4]> = backend.lines().iter().map(|(_, l)| l.endpoints).collect();
        assert_eq!(endpoints[0], [10.5, 10.5, 10.5, 10.5]);
        assert_eq!(endpoints[1], endpoints[0]);
        assert_eq!(endpoints[2], [10.0, 10.0, 10.0, 10.0]);
    }

    #[test]
    fn defaults_fill_unset_attributes() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        skin.draw_line(&mut backend, &PenAttributes::default(), 0.0, 0.0, 4.0, 0.0).unwrap();

        let (target, line) = backend.lines()[0];
        assert_eq!(Some(target), skin.target());
        assert_eq!(line.diameter, DEFAULT_PEN_DIAMETER);
        assert_eq!(line.color, DEFAULT_PEN_COLOR);
        assert_eq!(line.endpoints, [0.5, 0.5, 4.5, 0.5]);
    }

    #[test]
    fn degenerate_diameter_uses_default() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        for diameter in [0.0, -2.0, f32::NAN] {
            skin.draw_point(&mut backend, &pen(diameter), 4.0, 4.0).unwrap();
        }

        assert_eq!(backend.lines().len(), 3);
        for (_, line) in backend.lines() {
            assert_eq!(line.diameter, DEFAULT_PEN_DIAMETER);
            assert_eq!(line.endpoints, [4.5; 4]);
        }
    }

    #[test]
    fn pen_color_is_premultiplied() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        let attrs = PenAttributes::new(5.0, [1.0, 0.5, 0.0, 0.5]);
        skin.draw_point(&mut backend, &attrs, 2.0, 2.0).unwrap();
        assert_eq!(backend.lines()[0].1.color, [0.5, 0.25, 0.0, 0.5]);
    }

    #[test]
    fn draws_mark_content_dirty() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        assert!(!skin.content_dirty());
        skin.draw_point(&mut backend, &pen(1.0), 1.0, 1.0).unwrap();
        assert!(skin.content_dirty());
    }

    #[test]
    fn clear_wipes_the_layer() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        let target = skin.target().unwrap();
        skin.draw_line(&mut backend, &pen(3.0), 0.0, 0.0, 15.0, 7.0).unwrap();
        assert!(backend.read_target(target).unwrap().iter().any(|&b| b != 0));

        skin.clear(&mut backend).unwrap();
        assert_eq!(backend.clears(), 1);
        assert!(backend.read_target(target).unwrap().iter().all(|&b| b == 0));
        assert!(skin.content_dirty());
        assert_balanced(&backend);
    }

    // ── draw regions ──────────────────────────────────────────────────────

    #[test]
    fn regions_stay_balanced_across_operations() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        skin.clear(&mut backend).unwrap();
        skin.draw_point(&mut backend, &pen(2.0), 1.0, 1.0).unwrap();
        skin.draw_line(&mut backend, &pen(1.0), 1.0, 1.0, 9.0, 4.0).unwrap();
        skin.clear(&mut backend).unwrap();
        assert_eq!(backend.enter_count(), 4);
        assert_balanced(&backend);
    }

    #[test]
    fn failed_draw_still_exits_region() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        backend.fail_draws = true;

        let err = skin.draw_line(&mut backend, &pen(1.0), 0.0, 0.0, 3.0, 3.0).unwrap_err();
        assert!(matches!(err, SkinError::Resource(ResourceError::Device(_))));
        assert_eq!(backend.enter_count(), 1);
        assert_balanced(&backend);

        backend.fail_draws = false;
        skin.draw_point(&mut backend, &pen(1.0), 0.0, 0.0).unwrap();
        assert_balanced(&backend);
    }

    #[test]
    fn nested_region_is_rejected() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        let target = skin.target().unwrap();
        backend.enter_region(DrawRegion::UsingBuffer, target).unwrap();

        let err = skin.draw_point(&mut backend, &pen(1.0), 0.0, 0.0).unwrap_err();
        assert_eq!(
            err,
            SkinError::Region(RegionError::AlreadyActive {
                active: DrawRegion::UsingBuffer,
                requested: DrawRegion::DrawingLine,
            })
        );
        assert!(backend.lines().is_empty());
        assert_eq!(backend.region_depth(), 1);

        backend.exit_region(DrawRegion::UsingBuffer);
        assert_balanced(&backend);
    }

    // ── degenerate states ─────────────────────────────────────────────────

    #[test]
    fn zero_canvas_draws_are_no_ops() {
        let mut backend = MockBackend::new();
        let mut skin = StrokeSkin::new(SkinId::new(1), &mut backend, [0, 10]).unwrap();
        assert_eq!(skin.target(), None);
        assert_eq!(backend.live_textures(), 0);

        skin.clear(&mut backend).unwrap();
        skin.draw_line(&mut backend, &pen(2.0), 0.0, 0.0, 5.0, 5.0).unwrap();
        assert!(backend.lines().is_empty());
        assert_eq!(backend.enter_count(), 0);
        assert!(!skin.content_dirty());
        assert_eq!(skin.get_texture(&mut backend, None).unwrap(), backend.placeholder());
    }

    #[test]
    fn draws_after_dispose_are_no_ops() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        skin.dispose(&mut backend);

        skin.draw_point(&mut backend, &pen(1.0), 1.0, 1.0).unwrap();
        skin.clear(&mut backend).unwrap();
        assert!(backend.lines().is_empty());
        assert_eq!(backend.enter_count(), 0);
        assert!(!skin.content_dirty());
    }

    // ── silhouette ────────────────────────────────────────────────────────

    #[test]
    fn silhouette_refreshes_lazily_from_target() {
        let mut backend = MockBackend::new();
        let mut skin = skin(&mut backend);
        assert!(!skin.is_touching(&mut backend, 0.5, 0.5).unwrap());

        // Diameter 1 at (2, 2) lands on texel (2, 2).
        skin.draw_point(&mut backend, &pen(1.0), 2.0, 2.0).unwrap();
        assert!(skin.content_dirty());
        assert!(skin.is_touching(&mut backend, 2.5 / 16.0, 2.5 / 8.0).unwrap());
        assert!(!skin.content_dirty());
        assert!(!skin.is_touching(&mut backend, 0.9, 0.9).unwrap());
        assert_eq!(skin.silhouette(&mut backend).unwrap().size(), (16, 8));
    }

    // ── sampling ──────────────────────────────────────────────────────────

    #[test]
    fn nearest_when_magnifying() {
        let mut backend = MockBackend::new();
        let skin = skin(&mut backend);
        assert!(skin.use_nearest(Scale::NATIVE, EffectMask::NONE, 0.0));
        assert!(skin.use_nearest(Scale::new(250.0, 40.0), EffectMask::WHIRL, 33.0));
        assert!(!skin.use_nearest(Scale::uniform(99.0), EffectMask::NONE, 0.0));
    }
}
