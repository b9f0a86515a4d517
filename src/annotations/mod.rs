//! Selection capture and the annotation lifecycle

mod manager;
mod selection;
mod types;

pub use manager::{AnnotationManager, DEFAULT_CLEAR_DELAY};
pub use selection::{PendingSelection, PlatformSelection, Popup, SelectionSource};
pub use types::{AnchorPoint, Annotation, AnnotationId, Bounds};
