//! Document host: loaded document, page position and the render worker

mod renderer;
mod request;
mod service;
mod state;

#[cfg(feature = "pdf")]
pub use renderer::PdfRenderer;
pub use renderer::{
    DEFAULT_LINES_PER_PAGE, DocumentRenderer, PlainTextRenderer, RenderError, RendererFactory,
    default_renderers,
};
pub use request::{RenderRequest, RenderResponse, RequestId};
pub use service::{RenderService, render_worker};
pub use state::{Availability, Command, DocumentHandle, Effect, HostState};
