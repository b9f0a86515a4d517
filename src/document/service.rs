//! Render service - owns the render worker thread

use std::collections::HashMap;
use std::path::PathBuf;

use flume::{Receiver, Sender};
use log::{debug, error, info, warn};

use super::renderer::{DocumentRenderer, RenderError, RendererFactory};
use super::request::{RenderRequest, RenderResponse, RequestId};

#[derive(Debug)]
enum PendingRequest {
    Open,
    PageText(usize),
}

/// Runs document backends on a worker thread and hands back their answers.
///
/// Decoding and text extraction never block the caller; answers are picked
/// up with [`RenderService::poll_responses`].
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    pending_requests: HashMap<RequestId, PendingRequest>,
}

impl RenderService {
    /// Spawn the worker and queue the availability probe.
    #[must_use]
    pub fn new(factory: RendererFactory) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let spawn_failed = response_tx.clone();
        if let Err(e) = std::thread::Builder::new()
            .name("render-worker".to_string())
            .spawn(move || {
                render_worker(factory(), request_rx, response_tx);
            })
        {
            error!("Failed to spawn render worker: {e}");
            let _ = spawn_failed.send(RenderResponse::Unavailable(format!(
                "Cannot start render worker: {e}"
            )));
        }

        let _ = request_tx.send(RenderRequest::Probe);

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            pending_requests: HashMap::new(),
        }
    }

    /// Decode a document
    pub fn open(&mut self, path: PathBuf) -> RequestId {
        let id = self.next_id();
        let _ = self.request_tx.send(RenderRequest::Open { id, path });
        self.pending_requests.insert(id, PendingRequest::Open);
        id
    }

    /// Fetch one page's text
    pub fn request_page(&mut self, page: usize) -> RequestId {
        let id = self.next_id();
        let _ = self.request_tx.send(RenderRequest::PageText { id, page });
        self.pending_requests
            .insert(id, PendingRequest::PageText(page));
        id
    }

    /// Poll for completed worker responses
    pub fn poll_responses(&mut self) -> Vec<RenderResponse> {
        let mut responses = vec![];

        while let Ok(response) = self.response_rx.try_recv() {
            match &response {
                RenderResponse::Opened { id, .. }
                | RenderResponse::OpenFailed { id, .. }
                | RenderResponse::PageText { id, .. }
                | RenderResponse::Error { id, .. } => {
                    if let Some(pending) = self.pending_requests.remove(id) {
                        debug!("Request {id:?} ({pending:?}) answered");
                    }
                }
                RenderResponse::Ready | RenderResponse::Unavailable(_) => {}
            }
            responses.push(response);
        }

        responses
    }

    pub fn pending(&self) -> usize {
        self.pending_requests.len()
    }

    pub fn shutdown(&self) {
        let _ = self.request_tx.send(RenderRequest::Shutdown);
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn probe(renderers: &[Box<dyn DocumentRenderer>]) -> RenderResponse {
    let mut failures = Vec::new();
    for renderer in renderers {
        match renderer.probe() {
            Ok(()) => debug!("{} backend available", renderer.name()),
            Err(e) => failures.push(format!("{}: {e}", renderer.name())),
        }
    }

    if renderers.is_empty() {
        return RenderResponse::Unavailable("No document backends available".to_string());
    }
    if failures.len() == renderers.len() {
        return RenderResponse::Unavailable(format!(
            "Document renderer not available: {}",
            failures.join("; ")
        ));
    }
    for failure in &failures {
        warn!("Renderer backend degraded: {failure}");
    }
    RenderResponse::Ready
}

/// Render worker loop: the active backend is the one that opened the
/// current document.
pub fn render_worker(
    mut renderers: Vec<Box<dyn DocumentRenderer>>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    let mut active: Option<usize> = None;

    for request in requests {
        match request {
            RenderRequest::Probe => {
                let response = probe(&renderers);
                match &response {
                    RenderResponse::Ready => info!("Render worker ready"),
                    RenderResponse::Unavailable(msg) => warn!("Render worker unavailable: {msg}"),
                    _ => {}
                }
                let _ = responses.send(response);
            }

            RenderRequest::Open { id, path } => {
                active = None;
                let Some(index) = renderers.iter().position(|r| r.supports(&path)) else {
                    let ext = path
                        .extension()
                        .map(|e| e.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    let _ = responses.send(RenderResponse::OpenFailed {
                        id,
                        error: RenderError::Unsupported(ext),
                    });
                    continue;
                };

                match renderers[index].open(&path) {
                    Ok(page_count) => {
                        info!(
                            "Opened {} with the {} backend",
                            path.display(),
                            renderers[index].name()
                        );
                        active = Some(index);
                        let _ = responses.send(RenderResponse::Opened { id, page_count });
                    }
                    Err(error) => {
                        let _ = responses.send(RenderResponse::OpenFailed { id, error });
                    }
                }
            }

            RenderRequest::PageText { id, page } => {
                let result = match active {
                    Some(index) => renderers[index].page_text(page),
                    None => Err(RenderError::NotOpen),
                };
                let _ = match result {
                    Ok(text) => responses.send(RenderResponse::PageText { id, page, text }),
                    Err(error) => responses.send(RenderResponse::Error { id, error }),
                };
            }

            RenderRequest::Shutdown => break,
        }
    }
}
