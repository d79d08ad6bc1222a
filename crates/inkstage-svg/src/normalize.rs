use std::fmt;

use resvg::usvg;

use crate::bake::bake_bounds;
use crate::error::ContentFormatError;
use crate::fixup::fix_markup;

/// Content bounds in scene units (canvas space of the parsed document).
///
/// Stroke-inclusive: a 10×10 square with a 2-unit stroke measures 12×12.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Renderer-safe vector content.
///
/// Invariants:
/// - the markup declares its namespace and carries no script content
/// - the markup's root canvas is `bounds`
/// - the root element is `<svg>`
/// - `bounds` is the measured drawing area, never zero-sized
pub struct NormalizedSvg {
    markup: String,
    tree: usvg::Tree,
    bounds: Bounds,
}

impl NormalizedSvg {
    /// Cleaned markup whose root `width`, `height` and `viewBox` are the
    /// measured bounds.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Natural size `[width, height]` in scene units.
    pub fn natural_size(&self) -> [f32; 2] {
        [self.bounds.width, self.bounds.height]
    }

    pub(crate) fn tree(&self) -> &usvg::Tree {
        &self.tree
    }
}

impl fmt::Debug for NormalizedSvg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedSvg")
            .field("bounds", &self.bounds)
            .field("markup_len", &self.markup.len())
            .finish()
    }
}

/// Cleans, validates, parses and measures raw vector markup.
///
/// Pure: the same input always yields the same result, and nothing outside
/// the returned value is touched.
pub fn normalize(raw: &str) -> Result<NormalizedSvg, ContentFormatError> {
    if raw.trim().is_empty() {
        return Err(ContentFormatError::Empty);
    }

    let markup = fix_markup(raw);

    match root_element_name(&markup) {
        Some(name) if local_name(name) == "svg" => {}
        Some(name) => return Err(ContentFormatError::NotSvg { root: name.to_owned() }),
        None => return Err(ContentFormatError::Malformed("no root element".to_owned())),
    }

    let tree = usvg::Tree::from_str(&markup, &usvg::Options::default())
        .map_err(|e| ContentFormatError::Malformed(e.to_string()))?;

    let bounds = measure(&tree);
    let markup = bake_bounds(&markup, bounds, tree.size());
    log::debug!(
        "normalized svg: {}x{} at ({}, {})",
        bounds.width,
        bounds.height,
        bounds.x,
        bounds.y
    );

    Ok(NormalizedSvg { markup, tree, bounds })
}

/// Stroke-inclusive bounds of everything drawn. Empty extents fall back to one
/// unit so downstream scale math never divides by zero.
fn measure(tree: &usvg::Tree) -> Bounds {
    let bbox = tree.root().abs_stroke_bounding_box();
    let (x, y) = if bbox.x().is_finite() && bbox.y().is_finite() {
        (bbox.x(), bbox.y())
    } else {
        (0.0, 0.0)
    };
    Bounds {
        x,
        y,
        width: non_empty_extent(bbox.width()),
        height: non_empty_extent(bbox.height()),
    }
}

#[inline]
fn non_empty_extent(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 { v } else { 1.0 }
}

#[inline]
fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

/// Finds the name of the document element, skipping the prolog
/// (XML declaration, processing instructions, comments, DOCTYPE).
fn root_element_name(markup: &str) -> Option<&str> {
    let mut rest = markup.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("<?") {
            rest = &after[after.find("?>")? + 2..];
        } else if let Some(after) = rest.strip_prefix("<!--") {
            rest = &after[after.find("-->")? + 3..];
        } else if let Some(after) = rest.strip_prefix("<!") {
            rest = skip_doctype(after)?;
        } else if let Some(after) = rest.strip_prefix('<') {
            let end = after
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(after.len());
            let name = &after[..end];
            return if name.is_empty() { None } else { Some(name) };
        } else {
            return None;
        }
    }
}

/// Skips a DOCTYPE body, including a bracketed internal subset.
fn skip_doctype(body: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => return Some(&body[i + 1..]),
            _ => {}
        }
    }
    None
}
