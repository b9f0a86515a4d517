//! Pending selection state and the host's selection capability

use super::types::{AnchorPoint, Bounds};

/// Text selection as reported by the host surface.
///
/// `bounds` is in the same absolute coordinate space as
/// [`SelectionSource::viewport_bounds`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlatformSelection {
    pub text: String,
    pub bounds: Bounds,
}

/// Narrow view of the host's native text selection.
///
/// The terminal UI implements this over mouse-drag state; tests substitute a
/// scripted fake.
pub trait SelectionSource {
    /// Current selection, or `None` when nothing is selected
    fn current_selection(&self) -> Option<PlatformSelection>;

    /// Bounding rectangle of the document viewport
    fn viewport_bounds(&self) -> Bounds;

    /// Drop the native selection highlight
    fn clear_selection(&mut self);
}

/// Candidate annotation waiting for confirm or cancel.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSelection {
    pub text: String,
    /// Selection rectangle relative to the viewport
    pub anchor: Bounds,
}

/// Confirmation popup placement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Popup {
    pub visible: bool,
    pub anchor: AnchorPoint,
}

impl Popup {
    #[must_use]
    pub fn hidden() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at(anchor: AnchorPoint) -> Self {
        Self {
            visible: true,
            anchor,
        }
    }
}
