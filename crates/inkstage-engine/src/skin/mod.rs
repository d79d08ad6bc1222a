//! Skins: the resource objects behind a drawable's appearance.
//!
//! A skin turns a vector document or an accumulated pen layer into a GPU
//! texture the compositor can sample. The compositor needs only three things
//! from a skin: [`Skin::get_texture`], [`Skin::size`] and [`Skin::use_nearest`].
//!
//! | Kind | Content | Texture |
//! |------|---------|---------|
//! | [`RasterSkin`] | normalized SVG markup | scale-quantized mip cache |
//! | [`StrokeSkin`] | pen lines and points | one persistent render target |
//!
//! Skins never reach for ambient GPU state. Every operation that touches
//! textures takes the [`RenderBackend`] explicitly.

mod effects;
mod raster;
mod scale;
mod silhouette;
mod store;
mod stroke;

use std::fmt;

use thiserror::Error;

use inkstage_svg::ContentFormatError;

use crate::render::{RegionError, RenderBackend, ResourceError, TextureId};

pub use effects::{Effect, EffectMask, EFFECTS};
pub use raster::RasterSkin;
pub use scale::{mip_level, mip_scale, requested_scale, Scale, NATIVE_MIP_LEVEL};
pub use silhouette::Silhouette;
pub use store::{AnySkin, SkinConfig, SkinStore};
pub use stroke::{
    pixel_alignment_offset, PenAttributes, StrokeSkin, DEFAULT_PEN_COLOR, DEFAULT_PEN_DIAMETER,
};

/// Stage-unique skin identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SkinId(pub(crate) u32);

impl SkinId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SkinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skin#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkinError {
    #[error(transparent)]
    ContentFormat(#[from] ContentFormatError),

    #[error("{0} has been disposed")]
    Disposed(SkinId),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("no skin {0} of the requested kind")]
    UnknownSkin(SkinId),
}

/// Capability shared by every skin kind.
pub trait Skin {
    fn id(&self) -> SkinId;

    /// Natural `[width, height]` in scene units. Available before any
    /// texture exists.
    fn size(&self) -> [f32; 2];

    /// A texture for drawing at `scale` (percent per axis, `None` = native).
    ///
    /// Never blocks. Returns the backend placeholder while there is nothing
    /// to show; fails only on a disposed skin.
    fn get_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        scale: Option<Scale>,
    ) -> Result<TextureId, SkinError>;

    /// Whether the compositor should point-sample this skin.
    fn use_nearest(&self, scale: Scale, effects: EffectMask, rotation_degrees: f32) -> bool {
        if effects.intersects(EffectMask::DISTORTIONS) {
            return false;
        }
        if rotation_degrees % 90.0 != 0.0 {
            return false;
        }
        let near_native = |percent: f32| percent.abs() > 99.0 && percent.abs() < 101.0;
        near_native(scale.x) && near_native(scale.y)
    }

    /// Hit test in normalized texture coordinates (`0..1`, top-left origin).
    fn is_touching(
        &mut self,
        backend: &mut dyn RenderBackend,
        u: f32,
        v: f32,
    ) -> Result<bool, SkinError>;

    fn visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    fn is_disposed(&self) -> bool;

    /// Releases every GPU resource the skin owns. Later calls are no-ops;
    /// every other operation then fails with [`SkinError::Disposed`].
    fn dispose(&mut self, backend: &mut dyn RenderBackend);
}

/// State common to all skin kinds.
#[derive(Debug)]
pub(crate) struct SkinBase {
    pub id: SkinId,
    pub visible: bool,
    pub disposed: bool,
}

impl SkinBase {
    pub fn new(id: SkinId, visible: bool) -> Self {
        Self { id, visible, disposed: false }
    }

    pub fn ensure_live(&self) -> Result<(), SkinError> {
        if self.disposed {
            log::error!("{} used after dispose", self.id);
            return Err(SkinError::Disposed(self.id));
        }
        Ok(())
    }
}
