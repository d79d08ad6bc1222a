//! inkstage engine crate.
//!
//! Turns vector content and accumulated pen strokes into GPU textures that a
//! stage compositor can sample, and owns the caches and render targets behind
//! them.

pub mod device;
pub mod logging;
pub mod coords;
pub mod paint;
pub mod render;
pub mod skin;
pub mod overlay;
