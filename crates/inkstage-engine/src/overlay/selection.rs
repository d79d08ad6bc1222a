use crate::coords::{Rect, Vec2};
use crate::paint::Color;

/// How much larger than the skin the frame is drawn.
pub const ZOOM_RATIO: f32 = 1.1;
pub const BORDER_WIDTH: f32 = 2.0;
pub const CORNER_RADIUS: f32 = 5.0;
pub const HANDLE_RADIUS: f32 = 5.0;
/// Frame border, `#dddddd`.
pub const BORDER_COLOR: u32 = 0xdddddd;

/// Corner a resize handle sits on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HandleDirection {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl HandleDirection {
    /// Clockwise from top-left, matching [`Rect::corners`].
    pub const ALL: [HandleDirection; 4] = [
        HandleDirection::TopLeft,
        HandleDirection::TopRight,
        HandleDirection::BottomRight,
        HandleDirection::BottomLeft,
    ];

    /// CSS cursor shown while hovering the handle.
    pub fn cursor(self) -> &'static str {
        match self {
            HandleDirection::TopLeft | HandleDirection::BottomRight => "nwse-resize",
            HandleDirection::TopRight | HandleDirection::BottomLeft => "nesw-resize",
        }
    }
}

/// Round resize handle. `center` is relative to the selection's position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Handle {
    pub direction: HandleDirection,
    pub center: Vec2,
    pub radius: f32,
    pub border_width: f32,
    pub border_color: Color,
    pub fill: Color,
}

/// Rounded frame around the selection, centered on its position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SelectionFrame {
    /// Relative to the selection's position.
    pub rect: Rect,
    pub corner_radius: f32,
    pub border_width: f32,
    pub border_color: Color,
    pub fill: Color,
}

/// What an [`SelectionOverlay::update`] changed.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct OverlayUpdate {
    /// Frame and handles were rebuilt for a new size.
    pub frame_rebuilt: bool,
    /// Position, rotation or visibility moved.
    pub placement_changed: bool,
}

/// Selection decoration for one drawable.
///
/// Geometry is kept in local coordinates around the drawable's position and
/// rebuilt only when the enlarged size changes; moving or rotating the
/// selection just updates its placement.
#[derive(Debug, Clone, Default)]
pub struct SelectionOverlay {
    enlarged: Option<Vec2>,
    frame: Option<SelectionFrame>,
    handles: Vec<Handle>,

    position: Vec2,
    rotation_degrees: f32,
    visible: bool,
}

impl SelectionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows a skin of `size` at `position`, rotated clockwise by
    /// `rotation_degrees`.
    pub fn update(
        &mut self,
        size: [f32; 2],
        visible: bool,
        position: Vec2,
        rotation_degrees: f32,
    ) -> OverlayUpdate {
        let mut change = OverlayUpdate::default();

        let enlarged = enlarged_size(size);
        if self.enlarged != Some(enlarged) {
            self.rebuild(enlarged);
            change.frame_rebuilt = true;
        }

        if self.position != position
            || self.rotation_degrees != rotation_degrees
            || self.visible != visible
        {
            self.position = position;
            self.rotation_degrees = rotation_degrees;
            self.visible = visible;
            change.placement_changed = true;
        }

        change
    }

    fn rebuild(&mut self, enlarged: Vec2) {
        let rect = Rect::from_center_size(Vec2::zero(), enlarged);
        self.frame = Some(SelectionFrame {
            rect,
            corner_radius: CORNER_RADIUS,
            border_width: BORDER_WIDTH,
            border_color: Color::from_hex(BORDER_COLOR, 1.0),
            fill: Color::transparent(),
        });
        self.handles = HandleDirection::ALL
            .iter()
            .zip(rect.corners())
            .map(|(&direction, center)| Handle {
                direction,
                center,
                radius: HANDLE_RADIUS,
                border_width: BORDER_WIDTH,
                border_color: Color::from_hex(BORDER_COLOR, 1.0),
                fill: Color::from_hex(0xffffff, 1.0),
            })
            .collect();
        self.enlarged = Some(enlarged);
        log::debug!("selection frame rebuilt at {}x{}", enlarged.x, enlarged.y);
    }

    pub fn frame(&self) -> Option<&SelectionFrame> {
        self.frame.as_ref()
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Maps a local point to stage coordinates.
    pub fn to_stage(&self, local: Vec2) -> Vec2 {
        self.position + rotate(local, self.rotation_degrees)
    }

    /// Handle under the stage point `p`, if any.
    pub fn handle_at(&self, p: Vec2) -> Option<HandleDirection> {
        if !self.visible {
            return None;
        }
        let local = rotate(p - self.position, -self.rotation_degrees);
        self.handles
            .iter()
            .find(|h| {
                let d = local - h.center;
                d.x * d.x + d.y * d.y <= h.radius * h.radius
            })
            .map(|h| h.direction)
    }
}

/// Frame size for a skin of `size`: scaled by [`ZOOM_RATIO`], rounded up.
pub fn enlarged_size([width, height]: [f32; 2]) -> Vec2 {
    Vec2::new((width * ZOOM_RATIO).ceil(), (height * ZOOM_RATIO).ceil())
}

/// Clockwise rotation (screen space, +Y down).
fn rotate(v: Vec2, degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}
