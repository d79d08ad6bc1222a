//! Paint model shared by the pen layer, overlay and renderers.
//!
//! Colors are linear premultiplied alpha.

pub mod color;

pub use color::Color;
