//! Per-annotation illustration state

use std::collections::HashMap;

use crate::annotations::AnnotationId;

use super::image_ref::ImageRef;

/// Lifecycle of one annotation's generated image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum IllustrationSlot {
    #[default]
    Absent,
    Loading,
    Ready(ImageRef),
    Failed(String),
}

impl IllustrationSlot {
    pub fn is_loading(&self) -> bool {
        matches!(self, IllustrationSlot::Loading)
    }

    pub fn image(&self) -> Option<&ImageRef> {
        match self {
            IllustrationSlot::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            IllustrationSlot::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Whether a completed request was still the newest one for its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Current,
    /// A newer request was issued; the result was written anyway
    Superseded,
}

#[derive(Debug, Default)]
struct SlotEntry {
    state: IllustrationSlot,
    generation: u64,
}

/// Slots keyed by annotation id, created on first request.
#[derive(Debug, Default)]
pub struct SlotMap {
    slots: HashMap<AnnotationId, SlotEntry>,
}

static ABSENT: IllustrationSlot = IllustrationSlot::Absent;

impl SlotMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AnnotationId) -> &IllustrationSlot {
        self.slots.get(&id).map_or(&ABSENT, |entry| &entry.state)
    }

    /// Put the slot into `Loading` and return the request generation.
    pub fn begin(&mut self, id: AnnotationId) -> u64 {
        let entry = self.slots.entry(id).or_default();
        entry.generation += 1;
        entry.state = IllustrationSlot::Loading;
        entry.generation
    }

    /// Fail without ever entering `Loading`.
    pub fn fail_fast(&mut self, id: AnnotationId, message: impl Into<String>) {
        let entry = self.slots.entry(id).or_default();
        entry.generation += 1;
        entry.state = IllustrationSlot::Failed(message.into());
    }

    /// Record a finished request. Last write wins: the result is stored even
    /// when a newer request for the same slot is still in flight.
    pub fn complete(
        &mut self,
        id: AnnotationId,
        generation: u64,
        result: Result<ImageRef, String>,
    ) -> Completion {
        let entry = self.slots.entry(id).or_default();
        entry.state = match result {
            Ok(image) => IllustrationSlot::Ready(image),
            Err(message) => IllustrationSlot::Failed(message),
        };
        if generation == entry.generation {
            Completion::Current
        } else {
            Completion::Superseded
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
