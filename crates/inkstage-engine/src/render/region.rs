use std::ops::{Deref, DerefMut};

use super::{DrawRegion, RegionError, RenderBackend, TextureId};

/// Scoped draw-region acquisition.
///
/// Entering binds the target; dropping the guard exits the region and
/// restores the previous binding. Drop runs on every exit path, including `?`
/// early returns and unwinding, so enter/exit always balance.
///
/// ```ignore
/// let mut region = RegionGuard::enter(backend, DrawRegion::DrawingLine, target)?;
/// region.draw_line(&line)?;
/// // region exits here
/// ```
pub struct RegionGuard<'a> {
    backend: &'a mut dyn RenderBackend,
    region: DrawRegion,
}

impl<'a> RegionGuard<'a> {
    pub fn enter(
        backend: &'a mut dyn RenderBackend,
        region: DrawRegion,
        target: TextureId,
    ) -> Result<Self, RegionError> {
        backend.enter_region(region, target)?;
        Ok(Self { backend, region })
    }

    #[inline]
    pub fn region(&self) -> DrawRegion {
        self.region
    }
}

impl<'a> Deref for RegionGuard<'a> {
    type Target = dyn RenderBackend + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl<'a> DerefMut for RegionGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}

impl Drop for RegionGuard<'_> {
    fn drop(&mut self) {
        self.backend.exit_region(self.region);
    }
}
