//! Render request and response types

use std::path::PathBuf;

use super::renderer::RenderError;

/// Unique identifier for worker requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Request sent to the render worker
#[derive(Debug)]
pub enum RenderRequest {
    /// Check that at least one backend can serve documents
    Probe,

    /// Decode a document and report its page count
    Open { id: RequestId, path: PathBuf },

    /// Extract the text of one page (1-indexed)
    PageText { id: RequestId, page: usize },

    /// Shutdown the worker
    Shutdown,
}

/// Response from the render worker
#[derive(Debug)]
pub enum RenderResponse {
    /// Probe succeeded
    Ready,

    /// No backend is usable
    Unavailable(String),

    /// Document decoded
    Opened { id: RequestId, page_count: usize },

    /// Document could not be decoded
    OpenFailed { id: RequestId, error: RenderError },

    /// Page text extracted
    PageText {
        id: RequestId,
        page: usize,
        text: String,
    },

    /// Page text extraction failed
    Error { id: RequestId, error: RenderError },
}
