//! Document backends that decode files and expose per-page text

use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "pdf")]
use mupdf::text_page::TextBlockType;
#[cfg(feature = "pdf")]
use mupdf::{Document, TextPageFlags};

pub const DEFAULT_LINES_PER_PAGE: usize = 40;
const FORM_FEED: char = '\u{0C}';

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported document type: {0}")]
    Unsupported(String),

    #[error("document has no pages")]
    Empty,

    #[error("no document is open")]
    NotOpen,

    #[error("page {page} is out of range (1..={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("{0} backend is unavailable: {1}")]
    Unavailable(&'static str, String),

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),
}

/// A decoder for one family of documents.
///
/// Backends live on the render worker thread and are never shared.
pub trait DocumentRenderer {
    fn name(&self) -> &'static str;

    /// Whether this backend should handle `path`
    fn supports(&self, path: &Path) -> bool;

    /// Availability check performed once at startup
    fn probe(&self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Decode `path`, replacing any open document; returns the page count
    fn open(&mut self, path: &Path) -> Result<usize, RenderError>;

    /// Text of `page` (1-indexed) of the open document
    fn page_text(&self, page: usize) -> Result<String, RenderError>;
}

/// Builds the backend set inside the worker thread.
pub type RendererFactory = Box<dyn FnOnce() -> Vec<Box<dyn DocumentRenderer>> + Send>;

/// Plain text and PDF (when the `pdf` feature is enabled).
#[must_use]
pub fn default_renderers(lines_per_page: usize) -> RendererFactory {
    Box::new(move || {
        let mut renderers: Vec<Box<dyn DocumentRenderer>> = Vec::new();
        #[cfg(feature = "pdf")]
        renderers.push(Box::new(PdfRenderer::new()));
        renderers.push(Box::new(PlainTextRenderer::new(lines_per_page)));
        renderers
    })
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn check_page(page: usize, page_count: usize) -> Result<usize, RenderError> {
    if page == 0 || page > page_count {
        return Err(RenderError::PageOutOfRange { page, page_count });
    }
    Ok(page - 1)
}

/// Text files. Form feeds split pages; otherwise every `lines_per_page`
/// lines start a new page.
pub struct PlainTextRenderer {
    lines_per_page: usize,
    pages: Option<Vec<String>>,
}

impl PlainTextRenderer {
    #[must_use]
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            lines_per_page: lines_per_page.max(1),
            pages: None,
        }
    }

    /// Split decoded text into pages
    pub fn paginate(&self, content: &str) -> Vec<String> {
        let mut pages: Vec<String> = if content.contains(FORM_FEED) {
            content.split(FORM_FEED).map(str::to_string).collect()
        } else {
            let lines: Vec<&str> = content.lines().collect();
            lines
                .chunks(self.lines_per_page)
                .map(|chunk| chunk.join("\n"))
                .collect()
        };

        while pages.last().is_some_and(|page| page.trim().is_empty()) {
            pages.pop();
        }
        pages
    }
}

impl DocumentRenderer for PlainTextRenderer {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supports(&self, path: &Path) -> bool {
        extension(path) != "pdf"
    }

    fn open(&mut self, path: &Path) -> Result<usize, RenderError> {
        self.pages = None;
        let bytes = fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let pages = self.paginate(&String::from_utf8_lossy(&bytes));
        if pages.is_empty() {
            return Err(RenderError::Empty);
        }
        let count = pages.len();
        self.pages = Some(pages);
        Ok(count)
    }

    fn page_text(&self, page: usize) -> Result<String, RenderError> {
        let pages = self.pages.as_ref().ok_or(RenderError::NotOpen)?;
        let index = check_page(page, pages.len())?;
        Ok(pages[index].clone())
    }
}

/// PDF documents through MuPDF.
#[cfg(feature = "pdf")]
pub struct PdfRenderer {
    doc: Option<Document>,
    page_count: usize,
}

#[cfg(feature = "pdf")]
impl PdfRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            doc: None,
            page_count: 0,
        }
    }
}

#[cfg(feature = "pdf")]
impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "pdf")]
impl DocumentRenderer for PdfRenderer {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supports(&self, path: &Path) -> bool {
        extension(path) == "pdf"
    }

    fn open(&mut self, path: &Path) -> Result<usize, RenderError> {
        self.doc = None;
        self.page_count = 0;

        let doc = Document::open(path.to_string_lossy().as_ref())?;
        let page_count = usize::try_from(doc.page_count()?).unwrap_or(0);
        if page_count == 0 {
            return Err(RenderError::Empty);
        }

        self.doc = Some(doc);
        self.page_count = page_count;
        Ok(page_count)
    }

    fn page_text(&self, page: usize) -> Result<String, RenderError> {
        let doc = self.doc.as_ref().ok_or(RenderError::NotOpen)?;
        let index = check_page(page, self.page_count)?;

        let page = doc.load_page(index as i32)?;
        let text_page = page.to_text_page(TextPageFlags::empty())?;

        let mut text = String::new();
        for block in text_page.blocks() {
            if block.r#type() != TextBlockType::Text {
                continue;
            }
            for line in block.lines() {
                text.extend(line.chars().filter_map(|ch| ch.char()));
                text.push('\n');
            }
            text.push('\n');
        }
        Ok(text)
    }
}
