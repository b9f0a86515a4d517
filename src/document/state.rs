//! Document host state

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Outcome of the one-time render worker probe
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Checking,
    Ready,
    Unavailable(String),
}

/// The document the user picked
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentHandle {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl DocumentHandle {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Cannot open {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }
}

/// Loaded document, page position and load error
#[derive(Clone, Debug, Default)]
pub struct HostState {
    pub availability: Availability,

    pub document: Option<DocumentHandle>,

    /// Known once the renderer reports a successful decode
    pub page_count: Option<usize>,

    /// Active page (1-indexed)
    pub current_page: usize,

    pub error: Option<String>,
}

impl HostState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_page: 1,
            ..Self::default()
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::WorkerReady => {
                self.availability = Availability::Ready;
                vec![]
            }

            Command::WorkerUnavailable(message) => {
                self.error = Some(message.clone());
                self.availability = Availability::Unavailable(message);
                vec![]
            }

            Command::SelectDocument(handle) => {
                if !self.is_ready() {
                    return vec![];
                }
                self.document = Some(handle);
                self.page_count = None;
                self.current_page = 1;
                self.error = None;
                vec![Effect::ResetAnnotations, Effect::DecodeDocument]
            }

            Command::LoadSucceeded(page_count) => {
                self.page_count = Some(page_count);
                self.error = None;
                self.current_page = self.current_page.clamp(1, page_count.max(1));
                vec![Effect::RenderCurrentPage]
            }

            Command::LoadFailed(message) => {
                self.error = Some(format!("Failed to load document: {message}"));
                vec![]
            }

            Command::Retry => {
                if self.document.is_none() || !self.is_ready() {
                    return vec![];
                }
                self.error = None;
                vec![Effect::DecodeDocument]
            }

            Command::NextPage => self.go_to(self.current_page.saturating_add(1)),

            Command::PrevPage => self.go_to(self.current_page.saturating_sub(1)),

            Command::GoToPage(page) => self.go_to(page),
        }
    }

    fn go_to(&mut self, page: usize) -> Vec<Effect> {
        let clamped = page.clamp(1, self.last_page());
        if clamped != self.current_page {
            self.current_page = clamped;
            vec![Effect::RenderCurrentPage]
        } else {
            vec![]
        }
    }

    /// Highest page navigation may reach
    pub fn last_page(&self) -> usize {
        self.page_count.unwrap_or(1).max(1)
    }

    pub fn is_ready(&self) -> bool {
        self.availability == Availability::Ready
    }

    /// A document is decoded and no error is showing
    pub fn is_loaded(&self) -> bool {
        self.document.is_some() && self.page_count.is_some() && self.error.is_none()
    }

    pub fn can_go_back(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.current_page < self.last_page()
    }
}

/// Commands that modify host state
#[derive(Clone, Debug)]
pub enum Command {
    /// Render worker passed its probe
    WorkerReady,
    /// Render worker probe failed
    WorkerUnavailable(String),
    /// User picked a new document
    SelectDocument(DocumentHandle),
    /// Renderer decoded the document
    LoadSucceeded(usize),
    /// Renderer failed to decode the document
    LoadFailed(String),
    /// Re-submit the current document
    Retry,
    NextPage,
    PrevPage,
    GoToPage(usize),
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Drop annotations, pending selection and illustrations
    ResetAnnotations,
    /// Send the current document to the renderer
    DecodeDocument,
    /// Fetch the current page's text
    RenderCurrentPage,
}
