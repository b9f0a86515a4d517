pub mod annotation_sidebar;
pub mod confirm_popup;
pub mod hud_message;
pub mod image_overlay;

pub use annotation_sidebar::AnnotationSidebar;
pub use confirm_popup::{ConfirmPopup, ConfirmPopupAction};
pub use hud_message::{HudMessage, HudMode};
pub use image_overlay::{ImageOverlay, ImageOverlayAction};
