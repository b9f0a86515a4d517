pub mod annotations;
pub mod app;
pub mod document;
pub mod event_source;
pub mod illustration;
pub mod panic_handler;
pub mod session;
pub mod settings;
pub mod terminal_selection;
pub mod theme;
pub mod widget;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{App, AppAction, FocusedPanel, run_app_with_event_source};
pub use session::ViewerSession;
