//! Vector markup normalization for **inkstage** raster skins.
//!
//! Raw SVG coming from an editor or an asset store is not safe to hand to a
//! rasterizer as-is: it may lack its namespace, carry scripts, or declare a
//! canvas that does not match its drawn geometry. [`normalize`] cleans the
//! markup, checks that the root element is `<svg>`, parses it, and measures the
//! stroke-inclusive bounds that become the skin's natural size. Those bounds
//! are written back into the root tag as `width`, `height` and `viewBox`.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`error`] | `ContentFormatError` |
//! | [`fixup`] | textual repairs applied before parsing |
//! | [`normalize`] | `normalize` entry point, `NormalizedSvg`, `Bounds` |
//! | [`raster`] | `RasterImage`, CPU rasterization at a uniform scale |
//!
//! # Quick start
//!
//! ```rust
//! use inkstage_svg::normalize;
//!
//! let svg = normalize(r#"<svg width="20" height="20"><rect x="5" y="5" width="10" height="10"/></svg>"#)
//!     .unwrap();
//! assert_eq!(svg.bounds().width, 10.0);
//! let image = svg.rasterize(2.0).unwrap();
//! assert_eq!((image.width, image.height), (20, 20));
//! ```

mod bake;
pub mod error;
pub mod fixup;
pub mod normalize;
pub mod raster;

pub use error::ContentFormatError;
pub use normalize::{normalize, Bounds, NormalizedSvg};
pub use raster::RasterImage;
