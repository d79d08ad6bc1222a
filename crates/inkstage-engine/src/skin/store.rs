use std::collections::HashMap;

use crate::coords::Rect;
use crate::render::{RenderBackend, SkinDraw, TextureId};

use super::{EffectMask, RasterSkin, Scale, Skin, SkinError, SkinId, StrokeSkin};

/// Settings shared by every skin in a store.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SkinConfig {
    /// Texture edge budget for raster skins, in texels.
    ///
    /// Soft: the scale cap is `max_texture_dimension / largest natural edge`,
    /// and a request is still rounded up to the next power-of-two level. A
    /// cap between levels can therefore produce an edge up to twice the
    /// budget. Caps that are already a power of two stay within it.
    pub max_texture_dimension: u32,
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self { max_texture_dimension: 2048 }
    }
}

/// A skin of either kind.
pub enum AnySkin {
    Raster(RasterSkin),
    Stroke(StrokeSkin),
}

impl AnySkin {
    pub fn as_skin(&self) -> &dyn Skin {
        match self {
            AnySkin::Raster(skin) => skin,
            AnySkin::Stroke(skin) => skin,
        }
    }

    pub fn as_skin_mut(&mut self) -> &mut dyn Skin {
        match self {
            AnySkin::Raster(skin) => skin,
            AnySkin::Stroke(skin) => skin,
        }
    }
}

/// Stage-side registry of skins.
///
/// Drawables hold [`SkinId`]s, not skins. An id that was destroyed, or whose
/// skin was disposed, resolves to the placeholder texture.
pub struct SkinStore {
    config: SkinConfig,
    native_size: [u32; 2],
    next_id: u32,
    skins: HashMap<SkinId, AnySkin>,
}

impl SkinStore {
    pub fn new(native_size: [u32; 2], config: SkinConfig) -> Self {
        Self { config, native_size, next_id: 1, skins: HashMap::new() }
    }

    pub fn config(&self) -> SkinConfig {
        self.config
    }

    /// Stage size in texels; new stroke skins are allocated at this size.
    pub fn native_size(&self) -> [u32; 2] {
        self.native_size
    }

    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }

    fn allocate_id(&mut self) -> SkinId {
        let id = SkinId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn create_raster_skin(&mut self) -> SkinId {
        let id = self.allocate_id();
        self.skins.insert(id, AnySkin::Raster(RasterSkin::new(id, &self.config)));
        log::debug!("{id}: raster skin created");
        id
    }

    pub fn create_stroke_skin(
        &mut self,
        backend: &mut dyn RenderBackend,
    ) -> Result<SkinId, SkinError> {
        let id = self.allocate_id();
        let skin = StrokeSkin::new(id, backend, self.native_size)?;
        self.skins.insert(id, AnySkin::Stroke(skin));
        log::debug!("{id}: stroke skin created");
        Ok(id)
    }

    pub fn get(&self, id: SkinId) -> Option<&AnySkin> {
        self.skins.get(&id)
    }

    pub fn get_mut(&mut self, id: SkinId) -> Option<&mut AnySkin> {
        self.skins.get_mut(&id)
    }

    pub fn raster_mut(&mut self, id: SkinId) -> Result<&mut RasterSkin, SkinError> {
        match self.skins.get_mut(&id) {
            Some(AnySkin::Raster(skin)) => Ok(skin),
            _ => Err(SkinError::UnknownSkin(id)),
        }
    }

    pub fn stroke_mut(&mut self, id: SkinId) -> Result<&mut StrokeSkin, SkinError> {
        match self.skins.get_mut(&id) {
            Some(AnySkin::Stroke(skin)) => Ok(skin),
            _ => Err(SkinError::UnknownSkin(id)),
        }
    }

    /// Texture for `id`, or the placeholder when there is nothing to show.
    pub fn get_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        id: SkinId,
        scale: Option<Scale>,
    ) -> TextureId {
        let Some(skin) = self.skins.get_mut(&id).map(AnySkin::as_skin_mut) else {
            return backend.placeholder();
        };
        if skin.is_disposed() {
            return backend.placeholder();
        }
        match skin.get_texture(backend, scale) {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!("{id}: {err}; drawing nothing");
                backend.placeholder()
            }
        }
    }

    /// Resolves everything the compositor needs to draw `id` into `rect`.
    pub fn draw(
        &mut self,
        backend: &mut dyn RenderBackend,
        id: SkinId,
        rect: Rect,
        scale: Scale,
        effects: EffectMask,
        rotation_degrees: f32,
    ) -> SkinDraw {
        let texture = self.get_texture(backend, id, Some(scale));
        let nearest = self
            .skins
            .get(&id)
            .is_some_and(|skin| skin.as_skin().use_nearest(scale, effects, rotation_degrees));
        SkinDraw { texture, rect, nearest, opacity: 1.0 }
    }

    /// Disposes and forgets `id`.
    pub fn destroy(&mut self, backend: &mut dyn RenderBackend, id: SkinId) -> Result<(), SkinError> {
        let mut skin = self.skins.remove(&id).ok_or(SkinError::UnknownSkin(id))?;
        skin.as_skin_mut().dispose(backend);
        log::debug!("{id}: destroyed");
        Ok(())
    }

    /// Fans a stage resize out to every live stroke skin.
    ///
    /// Every skin is visited; the first failure is returned.
    pub fn native_size_changed(
        &mut self,
        backend: &mut dyn RenderBackend,
        size: [u32; 2],
    ) -> Result<(), SkinError> {
        self.native_size = size;
        let mut first_err = None;
        for skin in self.skins.values_mut() {
            let AnySkin::Stroke(stroke) = skin else { continue };
            if stroke.is_disposed() {
                continue;
            }
            if let Err(err) = stroke.on_native_size_changed(backend, size) {
                log::warn!("{}: resize failed: {err}", stroke.id());
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Disposes every skin and empties the store.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for (_, mut skin) in self.skins.drain() {
            skin.as_skin_mut().dispose(backend);
        }
    }
}
