//! Illustration requests for confirmed annotations
//!
//! Each annotation owns an independent [`IllustrationSlot`]. Requests are
//! handed to worker threads and their answers are folded back in by
//! [`IllustrationService::poll_responses`] on the owning thread, so slot
//! state is only ever mutated from one place.

mod client;
mod image_ref;
mod service;
mod slot;

pub use client::{GenerationError, ImageGenerator, StabilityClient, parse_response};
pub use image_ref::{ImageError, ImageRef};
pub use service::{
    DEFAULT_WORKERS, IllustrationRequest, IllustrationResponse, IllustrationService,
};
pub use slot::{Completion, IllustrationSlot, SlotMap};
