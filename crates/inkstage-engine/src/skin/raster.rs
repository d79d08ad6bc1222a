use std::collections::BTreeMap;

use inkstage_svg::{normalize, NormalizedSvg};

use crate::render::{RenderBackend, TextureId};

use super::scale::{mip_level, mip_scale, requested_scale};
use super::{Scale, Silhouette, Skin, SkinBase, SkinConfig, SkinError, SkinId};

/// Skin for vector content, rasterized on demand into a mip cache.
///
/// Each cached level `L` holds the content rasterized at `2^(L - 8)`; a
/// request is served from the smallest level at least as large as the
/// requested scale, so a texel never covers more than one screen pixel and
/// the texture is never more than twice as large as needed.
///
/// Invariants:
/// - every cached texture was rasterized from the current content
/// - `max_texture_scale` caps requested scales at the texture budget ([`SkinConfig`])
pub struct RasterSkin {
    base: SkinBase,
    max_texture_dimension: u32,

    svg: Option<NormalizedSvg>,
    natural_size: [f32; 2],
    max_texture_scale: f32,

    mips: BTreeMap<u8, TextureId>,
    /// Largest mip scale rasterized since the last reset.
    largest_mip_scale: f32,
    silhouette: Silhouette,

    /// Pending content-ready notification.
    ready: Option<[f32; 2]>,
}

impl RasterSkin {
    pub fn new(id: SkinId, config: &SkinConfig) -> Self {
        Self {
            base: SkinBase::new(id, false),
            max_texture_dimension: config.max_texture_dimension,
            svg: None,
            natural_size: [0.0, 0.0],
            max_texture_scale: 1.0,
            mips: BTreeMap::new(),
            largest_mip_scale: 0.0,
            silhouette: Silhouette::empty(),
            ready: None,
        }
    }

    /// Replaces the content with `markup`.
    ///
    /// On error nothing changes: the previous content, size and cache stay.
    pub fn set_content(
        &mut self,
        backend: &mut dyn RenderBackend,
        markup: &str,
    ) -> Result<(), SkinError> {
        self.base.ensure_live()?;
        let svg = normalize(markup)?;

        self.reset_mips(backend);

        let natural_size = svg.natural_size();
        let largest = natural_size[0].max(natural_size[1]);
        self.max_texture_scale = (self.max_texture_dimension as f32 / largest).min(1.0);
        self.natural_size = natural_size;
        self.svg = Some(svg);
        self.silhouette = Silhouette::empty();
        self.ready = Some(natural_size);

        log::debug!(
            "{}: content set, natural size {}x{}, max texture scale {}",
            self.base.id,
            natural_size[0],
            natural_size[1],
            self.max_texture_scale
        );
        Ok(())
    }

    /// Releases every cached level and forgets the silhouette high-water mark.
    pub fn reset_mips(&mut self, backend: &mut dyn RenderBackend) {
        let mips = std::mem::take(&mut self.mips);
        if !mips.is_empty() {
            log::debug!("{}: releasing {} mip level(s)", self.base.id, mips.len());
        }
        for texture in mips.into_values() {
            backend.release_texture(texture);
        }
        self.largest_mip_scale = 0.0;
    }

    /// Content is loaded and textures can be produced.
    pub fn is_ready(&self) -> bool {
        !self.base.disposed && self.svg.is_some()
    }

    /// The natural size, once per successful [`set_content`](Self::set_content).
    ///
    /// A disposed skin drops any pending notification.
    pub fn take_ready(&mut self) -> Option<[f32; 2]> {
        if self.base.disposed {
            if self.ready.take().is_some() {
                log::debug!("{}: ignoring ready notification after dispose", self.base.id);
            }
            return None;
        }
        self.ready.take()
    }

    pub fn max_texture_scale(&self) -> f32 {
        self.max_texture_scale
    }

    /// Number of cached mip levels.
    pub fn mip_count(&self) -> usize {
        self.mips.len()
    }

    pub fn silhouette(&self) -> &Silhouette {
        &self.silhouette
    }

    fn create_mip(&mut self, backend: &mut dyn RenderBackend, level: u8) -> TextureId {
        let scale = mip_scale(level);
        let Some(image) = self.svg.as_ref().and_then(|svg| svg.rasterize(scale)) else {
            log::warn!("{}: could not rasterize level {level} at {scale}", self.base.id);
            return self.fallback(backend, level);
        };

        let texture = match backend.upload_texture(image.width, image.height, &image.pixels) {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!(
                    "{}: level {level} ({}x{}) unavailable: {err}",
                    self.base.id,
                    image.width,
                    image.height
                );
                return self.fallback(backend, level);
            }
        };

        log::debug!(
            "{}: mip level {level} at {scale} -> {}x{} {texture}",
            self.base.id,
            image.width,
            image.height
        );

        if scale > self.largest_mip_scale {
            self.largest_mip_scale = scale;
            self.silhouette = Silhouette::from_rgba(image.width, image.height, &image.pixels);
            log::debug!("{}: silhouette refreshed at {scale}", self.base.id);
        }

        self.mips.insert(level, texture);
        texture
    }

    /// Nearest cached level coarser than `level`, else the placeholder.
    fn fallback(&self, backend: &dyn RenderBackend, level: u8) -> TextureId {
        self.mips
            .range(..level)
            .next_back()
            .map(|(_, &texture)| texture)
            .unwrap_or_else(|| backend.placeholder())
    }
}

impl Skin for RasterSkin {
    fn id(&self) -> SkinId {
        self.base.id
    }

    fn size(&self) -> [f32; 2] {
        self.natural_size
    }

    fn get_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        scale: Option<Scale>,
    ) -> Result<TextureId, SkinError> {
        self.base.ensure_live()?;
        if self.svg.is_none() {
            return Ok(backend.placeholder());
        }

        let level = mip_level(requested_scale(scale, self.max_texture_scale));
        if let Some(&texture) = self.mips.get(&level) {
            return Ok(texture);
        }
        Ok(self.create_mip(backend, level))
    }

    fn is_touching(
        &mut self,
        _backend: &mut dyn RenderBackend,
        u: f32,
        v: f32,
    ) -> Result<bool, SkinError> {
        self.base.ensure_live()?;
        Ok(self.silhouette.is_touching(u, v))
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
        log::debug!("{}: disposing", self.base.id);
        self.reset_mips(backend);
        self.svg = None;
        self.silhouette = Silhouette::empty();
        self.base.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use inkstage_svg::ContentFormatError;

    use super::*;
    use crate::render::mock::MockBackend;
    use crate::skin::EffectMask;

    /// 32×32 opaque square once measured.
    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64"><rect x="16" y="16" width="32" height="32" fill="#ff0000"/></svg>"##;

    /// Circle of radius 10; its bounding-box corners are transparent.
    const DOT: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="40"><circle cx="20" cy="20" r="10" fill="#000"/></svg>"##;

    fn skin() -> RasterSkin {
        RasterSkin::new(SkinId::new(1), &SkinConfig::default())
    }

    fn loaded(backend: &mut MockBackend, markup: &str) -> RasterSkin {
        let mut skin = skin();
        skin.set_content(backend, markup).unwrap();
        skin
    }

    // ── content ───────────────────────────────────────────────────────────

    #[test]
    fn empty_skin_serves_placeholder() {
        let mut backend = MockBackend::new();
        let mut skin = skin();
        assert!(!skin.is_ready());
        assert_eq!(skin.size(), [0.0, 0.0]);
        let texture = skin.get_texture(&mut backend, None).unwrap();
        assert_eq!(texture, backend.placeholder());
        assert_eq!(backend.uploads(), 0);
    }

    #[test]
    fn set_content_measures_natural_size() {
        let mut backend = MockBackend::new();
        let skin = loaded(&mut backend, SQUARE);
        assert!(skin.is_ready());
        assert_eq!(skin.size(), [32.0, 32.0]);
        assert_eq!(skin.max_texture_scale(), 1.0);
    }

    #[test]
    fn texture_budget_limits_max_scale() {
        let mut backend = MockBackend::new();
        let mut skin = RasterSkin::new(SkinId::new(1), &SkinConfig { max_texture_dimension: 16 });
        skin.set_content(&mut backend, SQUARE).unwrap();
        assert_eq!(skin.max_texture_scale(), 0.5);

        let texture = skin.get_texture(&mut backend, Some(Scale::uniform(400.0))).unwrap();
        assert_eq!(backend.texture_size(texture), Some((16, 16)));
    }

    #[test]
    fn texture_budget_rounds_up_to_next_level() {
        let mut backend = MockBackend::new();
        let mut skin = RasterSkin::new(SkinId::new(1), &SkinConfig { max_texture_dimension: 24 });
        skin.set_content(&mut backend, SQUARE).unwrap();
        assert_eq!(skin.max_texture_scale(), 0.75);

        let texture = skin.get_texture(&mut backend, Some(Scale::uniform(400.0))).unwrap();
        assert_eq!(backend.texture_size(texture), Some((32, 32)));
    }

    #[test]
    fn malformed_content_changes_nothing() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        let before = skin.get_texture(&mut backend, None).unwrap();
        assert_eq!(skin.take_ready(), Some([32.0, 32.0]));

        let err = skin.set_content(&mut backend, "<html><body/></html>").unwrap_err();
        assert_eq!(
            err,
            SkinError::ContentFormat(ContentFormatError::NotSvg { root: "html".into() })
        );
        let err = skin.set_content(&mut backend, "<svg").unwrap_err();
        assert!(matches!(err, SkinError::ContentFormat(ContentFormatError::Malformed(_))));

        assert_eq!(skin.size(), [32.0, 32.0]);
        assert_eq!(skin.mip_count(), 1);
        assert_eq!(skin.take_ready(), None);
        assert_eq!(skin.get_texture(&mut backend, None).unwrap(), before);
        assert_eq!(backend.uploads(), 1);
    }

    #[test]
    fn new_content_releases_old_levels() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        let old = skin.get_texture(&mut backend, None).unwrap();
        skin.get_texture(&mut backend, Some(Scale::uniform(50.0))).unwrap();

        skin.set_content(&mut backend, DOT).unwrap();
        assert_eq!(skin.mip_count(), 0);
        assert!(!backend.is_live(old));
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(skin.size(), [20.0, 20.0]);
    }

    // ── ready notification ────────────────────────────────────────────────

    #[test]
    fn ready_fires_once_per_content() {
        let mut backend = MockBackend::new();
        let mut skin = skin();
        assert_eq!(skin.take_ready(), None);

        skin.set_content(&mut backend, SQUARE).unwrap();
        assert_eq!(skin.take_ready(), Some([32.0, 32.0]));
        assert_eq!(skin.take_ready(), None);

        skin.set_content(&mut backend, DOT).unwrap();
        assert_eq!(skin.take_ready(), Some([20.0, 20.0]));
    }

    #[test]
    fn ready_is_dropped_after_dispose() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        skin.dispose(&mut backend);
        assert_eq!(skin.take_ready(), None);
        assert!(!skin.is_ready());
    }

    // ── mip cache ─────────────────────────────────────────────────────────

    #[test]
    fn ready_content_yields_cached_texture() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        assert!(skin.take_ready().is_some());

        let first = skin.get_texture(&mut backend, Some(Scale::NATIVE)).unwrap();
        assert_ne!(first, backend.placeholder());
        assert_eq!(backend.texture_size(first), Some((32, 32)));

        let second = skin.get_texture(&mut backend, Some(Scale::NATIVE)).unwrap();
        assert_eq!(second, first);
        assert_eq!(backend.uploads(), 1);
    }

    #[test]
    fn nearby_scales_share_a_level() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        let a = skin.get_texture(&mut backend, Some(Scale::uniform(60.0))).unwrap();
        let b = skin.get_texture(&mut backend, Some(Scale::new(-90.0, 20.0))).unwrap();
        let c = skin.get_texture(&mut backend, None).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(backend.uploads(), 1);
    }

    #[test]
    fn magnification_is_clamped_to_native() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        let native = skin.get_texture(&mut backend, None).unwrap();
        let zoomed = skin.get_texture(&mut backend, Some(Scale::uniform(300.0))).unwrap();
        assert_eq!(native, zoomed);
    }

    #[test]
    fn minified_level_is_smaller() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        let quarter = skin.get_texture(&mut backend, Some(Scale::uniform(25.0))).unwrap();
        assert_eq!(backend.texture_size(quarter), Some((8, 8)));
        assert_eq!(skin.mip_count(), 1);
    }

    #[test]
    fn reset_forces_fresh_texture() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        let before = skin.get_texture(&mut backend, None).unwrap();

        skin.reset_mips(&mut backend);
        assert_eq!(skin.mip_count(), 0);
        assert_eq!(backend.released(), &[before]);

        let after = skin.get_texture(&mut backend, None).unwrap();
        assert_ne!(after, before);
        assert_eq!(backend.uploads(), 2);
    }

    // ── resource exhaustion ───────────────────────────────────────────────

    #[test]
    fn failed_level_falls_back_to_coarser() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        let half = skin.get_texture(&mut backend, Some(Scale::uniform(50.0))).unwrap();

        backend.fail_uploads_above = Some(16);
        let native = skin.get_texture(&mut backend, None).unwrap();
        assert_eq!(native, half);
        assert_eq!(skin.mip_count(), 1);
    }

    #[test]
    fn failed_level_without_coarser_uses_placeholder() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, DOT);

        backend.fail_uploads = true;
        let texture = skin.get_texture(&mut backend, None).unwrap();
        assert_eq!(texture, backend.placeholder());
        assert_eq!(skin.mip_count(), 0);

        backend.fail_uploads = false;
        let texture = skin.get_texture(&mut backend, None).unwrap();
        assert_ne!(texture, backend.placeholder());
    }

    // ── silhouette ────────────────────────────────────────────────────────

    #[test]
    fn silhouette_refreshes_on_new_high_water_mark() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        assert!(skin.silhouette().is_empty());

        skin.get_texture(&mut backend, Some(Scale::uniform(50.0))).unwrap();
        assert_eq!(skin.silhouette().size(), (16, 16));

        skin.get_texture(&mut backend, None).unwrap();
        assert_eq!(skin.silhouette().size(), (32, 32));

        skin.get_texture(&mut backend, Some(Scale::uniform(25.0))).unwrap();
        assert_eq!(skin.silhouette().size(), (32, 32));
    }

    #[test]
    fn hit_test_follows_content_shape() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, DOT);
        assert!(!skin.is_touching(&mut backend, 0.5, 0.5).unwrap());

        skin.get_texture(&mut backend, None).unwrap();
        assert!(skin.is_touching(&mut backend, 0.5, 0.5).unwrap());
        assert!(!skin.is_touching(&mut backend, 0.02, 0.02).unwrap());
    }

    // ── sampling ──────────────────────────────────────────────────────────

    #[test]
    fn use_nearest_truth_table() {
        let skin = skin();
        let native = Scale::NATIVE;
        assert!(!skin.use_nearest(native, EffectMask::WHIRL, 0.0));
        assert!(!skin.use_nearest(Scale::uniform(150.0), EffectMask::WHIRL, 90.0));
        assert!(!skin.use_nearest(native, EffectMask::NONE, 45.0));
        assert!(skin.use_nearest(native, EffectMask::NONE, 0.0));
        assert!(!skin.use_nearest(Scale::uniform(150.0), EffectMask::NONE, 0.0));
    }

    #[test]
    fn use_nearest_band_edges() {
        let skin = skin();
        assert!(skin.use_nearest(Scale::new(99.5, -100.5), EffectMask::NONE, 180.0));
        assert!(!skin.use_nearest(Scale::new(99.0, 100.0), EffectMask::NONE, 0.0));
        assert!(!skin.use_nearest(Scale::new(100.0, 101.0), EffectMask::NONE, -90.0));
        assert!(skin.use_nearest(Scale::NATIVE, EffectMask::GHOST | EffectMask::COLOR, 270.0));
    }

    // ── dispose ───────────────────────────────────────────────────────────

    #[test]
    fn dispose_releases_everything_and_fails_fast() {
        let mut backend = MockBackend::new();
        let mut skin = loaded(&mut backend, SQUARE);
        skin.get_texture(&mut backend, None).unwrap();
        skin.get_texture(&mut backend, Some(Scale::uniform(10.0))).unwrap();
        assert_eq!(backend.live_textures(), 2);

        skin.dispose(&mut backend);
        skin.dispose(&mut backend);
        assert!(skin.is_disposed());
        assert_eq!(backend.live_textures(), 0);

        let id = skin.id();
        assert_eq!(skin.get_texture(&mut backend, None), Err(SkinError::Disposed(id)));
        assert_eq!(skin.set_content(&mut backend, SQUARE), Err(SkinError::Disposed(id)));
        assert_eq!(skin.is_touching(&mut backend, 0.5, 0.5), Err(SkinError::Disposed(id)));
    }
}
