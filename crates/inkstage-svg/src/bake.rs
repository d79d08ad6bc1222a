//! Writes measured bounds back into the root `<svg>` tag.

use std::sync::LazyLock;

use regex::Regex;
use resvg::usvg;

use crate::normalize::Bounds;

static ROOT_SVG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:[A-Za-z_][\w.-]*:)?svg\b[^>]*>").unwrap());
static SIZE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s(?:width|height|viewBox)\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap()
});
static VIEW_BOX_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sviewBox\s*=\s*["']([^"']*)["']"#).unwrap());
static ASPECT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\spreserveAspectRatio\s*=\s*["']([^"']*)["']"#).unwrap());

/// Replaces the root tag's `width`, `height` and `viewBox` so the document's
/// own canvas is exactly the measured drawing.
///
/// `canvas` is in canvas units (what the document renders at); the viewBox
/// is the same region in the document's user units.
pub(crate) fn bake_bounds(markup: &str, canvas: Bounds, canvas_size: usvg::Size) -> String {
    let Some(tag) = ROOT_SVG_TAG.find(markup) else {
        return markup.to_owned();
    };
    let user = user_space_bounds(tag.as_str(), canvas, canvas_size);

    let stripped = SIZE_ATTR.replace_all(tag.as_str(), "");
    let name_end = stripped
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(stripped.len());

    let mut out = String::with_capacity(markup.len() + 64);
    out.push_str(&markup[..tag.start()]);
    out.push_str(&stripped[..name_end]);
    out.push_str(&format!(
        " width=\"{}\" height=\"{}\" viewBox=\"{} {} {} {}\"",
        canvas.width, canvas.height, user.x, user.y, user.width, user.height
    ));
    out.push_str(&stripped[name_end..]);
    out.push_str(&markup[tag.end()..]);
    out
}

/// Maps canvas bounds back through the root `viewBox` mapping, if any.
fn user_space_bounds(root_tag: &str, canvas: Bounds, canvas_size: usvg::Size) -> Bounds {
    let Some(ts) = view_box_transform(root_tag, canvas_size) else {
        return canvas;
    };
    let (sx, sy, tx, ty) = (ts.sx, ts.sy, ts.tx, ts.ty);
    Bounds {
        x: (canvas.x - tx) / sx,
        y: (canvas.y - ty) / sy,
        width: canvas.width / sx,
        height: canvas.height / sy,
    }
}

/// User-to-canvas transform implied by `viewBox` and `preserveAspectRatio`.
fn view_box_transform(root_tag: &str, canvas_size: usvg::Size) -> Option<usvg::Transform> {
    let values: Vec<f32> = VIEW_BOX_ATTR
        .captures(root_tag)?
        .get(1)?
        .as_str()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    let [vx, vy, vw, vh] = values[..] else { return None };
    if !(vw > 0.0 && vh > 0.0) {
        return None;
    }

    let aspect = ASPECT_ATTR
        .captures(root_tag)
        .and_then(|c| c.get(1))
        .map_or("xMidYMid meet", |m| m.as_str());

    let mut sx = canvas_size.width() / vw;
    let mut sy = canvas_size.height() / vh;
    let align = aspect.split_whitespace().next().unwrap_or("xMidYMid");
    if align != "none" {
        let s = if aspect.contains("slice") { sx.max(sy) } else { sx.min(sy) };
        sx = s;
        sy = s;
    }

    let x = -vx * sx;
    let y = -vy * sy;
    let free_w = canvas_size.width() - vw * sx;
    let free_h = canvas_size.height() - vh * sy;
    let tx = if align.starts_with("xMid") {
        x + free_w / 2.0
    } else if align.starts_with("xMax") {
        x + free_w
    } else {
        x
    };
    let ty = if align.contains("YMid") {
        y + free_h / 2.0
    } else if align.contains("YMax") {
        y + free_h
    } else {
        y
    };

    Some(usvg::Transform::from_row(sx, 0.0, 0.0, sy, tx, ty))
}
