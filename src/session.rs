//! Viewer session: wires the document host, the annotation manager and the
//! illustration service together.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{debug, info, warn};

use crate::annotations::{Annotation, AnnotationId, AnnotationManager, SelectionSource};
use crate::document::{
    Command, DocumentHandle, Effect, HostState, RenderResponse, RendererFactory, RenderService,
    RequestId,
};
use crate::illustration::{IllustrationService, IllustrationSlot, ImageGenerator};
use crate::settings::Settings;

/// Everything the UI needs for one open document.
///
/// The UI drives it with user actions and calls [`ViewerSession::tick`]
/// once per frame to fold in worker answers.
pub struct ViewerSession {
    host: HostState,
    render: RenderService,
    annotations: AnnotationManager,
    illustrations: IllustrationService,
    open_request: Option<RequestId>,
    page_request: Option<RequestId>,
    page_text: Option<String>,
}

impl ViewerSession {
    #[must_use]
    pub fn new(
        settings: &Settings,
        renderers: RendererFactory,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            host: HostState::new(),
            render: RenderService::new(renderers),
            annotations: AnnotationManager::new(settings.selection.clear_delay()),
            illustrations: IllustrationService::new(generator, settings.illustration.workers),
            open_request: None,
            page_request: None,
            page_text: None,
        }
    }

    fn apply(&mut self, cmd: Command) {
        for effect in self.host.apply(cmd) {
            match effect {
                Effect::ResetAnnotations => {
                    self.annotations.reset();
                    self.illustrations.reset();
                    self.page_text = None;
                }
                Effect::DecodeDocument => {
                    if let Some(document) = &self.host.document {
                        info!("Decoding {} ({} bytes)", document.name, document.size);
                        self.page_text = None;
                        self.page_request = None;
                        self.open_request = Some(self.render.open(document.path.clone()));
                    }
                }
                Effect::RenderCurrentPage => {
                    let page = self.host.current_page;
                    debug!("Requesting text for page {page}");
                    self.page_request = Some(self.render.request_page(page));
                }
            }
        }
    }

    /// Pick a new document. Ignored until the render worker is ready.
    pub fn open_document(&mut self, path: &Path) -> Result<()> {
        let handle = DocumentHandle::from_path(path)?;
        if !self.host.is_ready() {
            warn!("Ignoring {}: renderer not ready", handle.name);
            return Ok(());
        }
        info!("Opening {}", handle.path.display());
        self.apply(Command::SelectDocument(handle));
        Ok(())
    }

    /// Re-submit the current document after a failed load
    pub fn retry(&mut self) {
        self.apply(Command::Retry);
    }

    pub fn next_page(&mut self) {
        self.apply(Command::NextPage);
    }

    pub fn prev_page(&mut self) {
        self.apply(Command::PrevPage);
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.apply(Command::GoToPage(page));
    }

    /// Pointer released over the document viewport
    pub fn pointer_released(&mut self, source: &dyn SelectionSource) {
        if !self.host.is_loaded() {
            return;
        }
        self.annotations.capture_selection(source);
    }

    /// Turn the pending selection into an annotation on the current page
    pub fn confirm_selection(&mut self, now: Instant) -> Option<AnnotationId> {
        let page = self.host.current_page;
        let id = self.annotations.confirm(page, now)?;
        info!(
            "Added annotation {id} on page {page} ({} total)",
            self.annotations.len()
        );
        Some(id)
    }

    pub fn cancel_selection(&mut self, now: Instant) {
        self.annotations.cancel(now);
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> bool {
        let removed = self.annotations.remove(id);
        if removed {
            info!("Removed annotation {id}");
        }
        removed
    }

    /// Drop every annotation. Illustration slots are left alone.
    pub fn clear_annotations(&mut self) {
        let count = self.annotations.len();
        self.annotations.clear_all();
        info!("Cleared {count} annotations");
    }

    /// Request an image for an annotation; unknown ids are ignored.
    pub fn generate_illustration(&mut self, id: AnnotationId) -> Option<RequestId> {
        let Some(annotation) = self.annotations.get(id) else {
            warn!("Generate requested for unknown annotation {id}");
            return None;
        };
        self.illustrations.request(annotation)
    }

    /// Current page's annotations, newest first
    pub fn visible_annotations(&self) -> Vec<&Annotation> {
        self.annotations.for_page(self.host.current_page)
    }

    pub fn illustration(&self, id: AnnotationId) -> &IllustrationSlot {
        self.illustrations.slot(id)
    }

    /// Fold in worker answers and run the deferred selection clear.
    ///
    /// Returns true when anything visible changed.
    pub fn tick(&mut self, now: Instant, source: &mut dyn SelectionSource) -> bool {
        let mut changed = false;

        for response in self.render.poll_responses() {
            changed |= self.handle_render_response(response);
        }

        for id in self.illustrations.poll_responses() {
            if self.annotations.get(id).is_none() {
                debug!("Illustration for {id} landed after its annotation was removed");
            }
            changed = true;
        }

        changed |= self.annotations.tick(now, source);
        changed
    }

    fn handle_render_response(&mut self, response: RenderResponse) -> bool {
        match response {
            RenderResponse::Ready => {
                self.apply(Command::WorkerReady);
                true
            }
            RenderResponse::Unavailable(message) => {
                self.apply(Command::WorkerUnavailable(message));
                true
            }
            RenderResponse::Opened { id, page_count } => {
                if self.open_request != Some(id) {
                    debug!("Ignoring stale decode {id:?}");
                    return false;
                }
                self.open_request = None;
                info!("Document decoded: {page_count} pages");
                self.apply(Command::LoadSucceeded(page_count));
                true
            }
            RenderResponse::OpenFailed { id, error } => {
                if self.open_request != Some(id) {
                    return false;
                }
                self.open_request = None;
                warn!("Failed to decode document: {error}");
                self.apply(Command::LoadFailed(error.to_string()));
                true
            }
            RenderResponse::PageText { id, page, text } => {
                if self.page_request != Some(id) {
                    debug!("Ignoring stale text for page {page}");
                    return false;
                }
                self.page_request = None;
                self.page_text = Some(text);
                true
            }
            RenderResponse::Error { id, error } => {
                if self.page_request != Some(id) {
                    return false;
                }
                self.page_request = None;
                warn!("Failed to render page {}: {error}", self.host.current_page);
                self.page_text = None;
                self.host.error = Some(format!("Failed to render page: {error}"));
                true
            }
        }
    }

    pub fn host(&self) -> &HostState {
        &self.host
    }

    pub fn annotations(&self) -> &AnnotationManager {
        &self.annotations
    }

    pub fn illustrations(&self) -> &IllustrationService {
        &self.illustrations
    }

    /// Text of the current page, once the renderer has delivered it
    pub fn page_text(&self) -> Option<&str> {
        self.page_text.as_deref()
    }

    /// A page or decode request is outstanding
    pub fn is_busy(&self) -> bool {
        self.open_request.is_some() || self.page_request.is_some()
    }
}
