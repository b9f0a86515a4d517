//! Illustration service - worker threads issuing image requests

use std::collections::HashMap;
use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, error, info, warn};

use crate::annotations::{Annotation, AnnotationId};
use crate::document::RequestId;

use super::client::{GenerationError, ImageGenerator};
use super::image_ref::ImageRef;
use super::slot::{Completion, IllustrationSlot, SlotMap};

pub const DEFAULT_WORKERS: usize = 2;

/// Request sent to illustration workers
#[derive(Debug)]
pub enum IllustrationRequest {
    Generate {
        id: RequestId,
        annotation: AnnotationId,
        generation: u64,
        epoch: u64,
        text: String,
    },
    Shutdown,
}

/// Response from illustration workers
#[derive(Debug)]
pub struct IllustrationResponse {
    pub id: RequestId,
    pub annotation: AnnotationId,
    pub generation: u64,
    pub epoch: u64,
    pub result: Result<ImageRef, GenerationError>,
}

/// Issues one fire-and-forget request per generate action and folds the
/// results back into per-annotation slots.
pub struct IllustrationService {
    generator: Arc<dyn ImageGenerator>,
    request_tx: Sender<IllustrationRequest>,
    response_rx: Receiver<IllustrationResponse>,
    slots: SlotMap,
    in_flight: HashMap<RequestId, AnnotationId>,
    next_request_id: u64,
    epoch: u64,
    num_workers: usize,
}

impl IllustrationService {
    #[must_use]
    pub fn new(generator: Arc<dyn ImageGenerator>, num_workers: usize) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        for index in 0..num_workers.max(1) {
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let generator = Arc::clone(&generator);

            if let Err(e) = std::thread::Builder::new()
                .name(format!("illustration-worker-{index}"))
                .spawn(move || {
                    illustration_worker(generator.as_ref(), rx, tx);
                })
            {
                error!("Failed to spawn illustration worker {index}: {e}");
            }
        }

        Self {
            generator,
            request_tx,
            response_rx,
            slots: SlotMap::new(),
            in_flight: HashMap::new(),
            next_request_id: 1,
            epoch: 0,
            num_workers: num_workers.max(1),
        }
    }

    /// Start generating an image for `annotation`.
    ///
    /// A missing credential fails the slot immediately without a request.
    /// Requesting again while a request is in flight is allowed; whichever
    /// response arrives last ends up in the slot.
    pub fn request(&mut self, annotation: &Annotation) -> Option<RequestId> {
        let annotation_id = annotation.id();

        if let Err(err) = self.generator.check_ready() {
            warn!("Illustration for {annotation_id} not requested: {err}");
            self.slots.fail_fast(annotation_id, err.to_string());
            return None;
        }

        let id = self.next_id();
        let generation = self.slots.begin(annotation_id);
        let _ = self.request_tx.send(IllustrationRequest::Generate {
            id,
            annotation: annotation_id,
            generation,
            epoch: self.epoch,
            text: annotation.text().to_string(),
        });
        self.in_flight.insert(id, annotation_id);

        info!("Requested illustration for {annotation_id} (attempt {generation})");
        Some(id)
    }

    /// Drain finished requests into their slots; returns the touched ids.
    pub fn poll_responses(&mut self) -> Vec<AnnotationId> {
        let mut updated = Vec::new();

        while let Ok(response) = self.response_rx.try_recv() {
            self.in_flight.remove(&response.id);

            if response.epoch != self.epoch {
                debug!(
                    "Dropping illustration for {} from a previous document",
                    response.annotation
                );
                continue;
            }

            let result = match response.result {
                Ok(image) => {
                    info!("Illustration ready for {}", response.annotation);
                    Ok(image)
                }
                Err(err) => {
                    warn!("Illustration failed for {}: {err}", response.annotation);
                    Err(err.to_string())
                }
            };

            let completion = self
                .slots
                .complete(response.annotation, response.generation, result);
            if completion == Completion::Superseded {
                debug!(
                    "Attempt {} for {} landed after a newer request",
                    response.generation, response.annotation
                );
            }
            updated.push(response.annotation);
        }

        updated
    }

    pub fn slot(&self, annotation: AnnotationId) -> &IllustrationSlot {
        self.slots.get(annotation)
    }

    pub fn slots(&self) -> &SlotMap {
        &self.slots
    }

    /// Number of requests issued but not yet answered
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Forget all slots; answers to requests issued before this are ignored.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.in_flight.clear();
        self.epoch += 1;
    }

    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(IllustrationRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for IllustrationService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn illustration_worker(
    generator: &dyn ImageGenerator,
    requests: Receiver<IllustrationRequest>,
    responses: Sender<IllustrationResponse>,
) {
    for request in requests {
        match request {
            IllustrationRequest::Generate {
                id,
                annotation,
                generation,
                epoch,
                text,
            } => {
                let result = generator.generate(&text);
                let _ = responses.send(IllustrationResponse {
                    id,
                    annotation,
                    generation,
                    epoch,
                    result,
                });
            }
            IllustrationRequest::Shutdown => break,
        }
    }
}
