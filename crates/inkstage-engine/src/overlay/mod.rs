//! Editor decorations drawn over the stage.
//!
//! Overlays compute geometry only; they own no GPU resources.

mod selection;

pub use selection::{
    Handle, HandleDirection, OverlayUpdate, SelectionFrame, SelectionOverlay, BORDER_COLOR,
    BORDER_WIDTH, CORNER_RADIUS, HANDLE_RADIUS, ZOOM_RATIO,
};
