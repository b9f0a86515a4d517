//! Fakes for the host capabilities and external collaborators

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::annotations::{Bounds, PlatformSelection, SelectionSource};
use crate::document::{DocumentRenderer, RenderError, RendererFactory};
use crate::illustration::{GenerationError, ImageGenerator, ImageRef};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds or five seconds pass.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Encode a black `width`x`height` PNG
pub fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut bytes = Vec::new();
    let _ = image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png);
    bytes
}

/// Scripted host selection.
#[derive(Clone, Debug)]
pub struct FakeSelection {
    viewport: Bounds,
    selection: Option<PlatformSelection>,
    clears: usize,
}

impl FakeSelection {
    pub fn empty(viewport: Bounds) -> Self {
        Self {
            viewport,
            selection: None,
            clears: 0,
        }
    }

    pub fn with_selection(viewport: Bounds, text: &str, bounds: Bounds) -> Self {
        let mut fake = Self::empty(viewport);
        fake.select(text, bounds);
        fake
    }

    pub fn select(&mut self, text: &str, bounds: Bounds) {
        self.selection = Some(PlatformSelection {
            text: text.to_string(),
            bounds,
        });
    }

    /// How many times the native highlight was cleared
    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl SelectionSource for FakeSelection {
    fn current_selection(&self) -> Option<PlatformSelection> {
        self.selection.clone()
    }

    fn viewport_bounds(&self) -> Bounds {
        self.viewport
    }

    fn clear_selection(&mut self) {
        self.selection = None;
        self.clears += 1;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GeneratorMode {
    Echo,
    Gated,
    Sequenced,
    Failing,
    NoCredential,
}

#[derive(Default)]
struct GeneratorState {
    prompts: Vec<String>,
    released: HashSet<String>,
    released_nth: HashSet<usize>,
    release_all: bool,
    completed: usize,
}

/// In-process image generator.
///
/// `echo` answers immediately with an image derived from the text; `gated`
/// blocks each request until its text is released; `sequenced` blocks each
/// request until its arrival number is released.
pub struct FakeGenerator {
    mode: GeneratorMode,
    error: Option<GenerationError>,
    state: Mutex<GeneratorState>,
    released: Condvar,
}

impl FakeGenerator {
    fn with_mode(mode: GeneratorMode, error: Option<GenerationError>) -> Self {
        Self {
            mode,
            error,
            state: Mutex::new(GeneratorState::default()),
            released: Condvar::new(),
        }
    }

    pub fn echo() -> Self {
        Self::with_mode(GeneratorMode::Echo, None)
    }

    pub fn gated() -> Self {
        Self::with_mode(GeneratorMode::Gated, None)
    }

    pub fn sequenced() -> Self {
        Self::with_mode(GeneratorMode::Sequenced, None)
    }

    pub fn failing(error: GenerationError) -> Self {
        Self::with_mode(GeneratorMode::Failing, Some(error))
    }

    pub fn without_credential() -> Self {
        Self::with_mode(GeneratorMode::NoCredential, None)
    }

    /// The image `echo`/`gated` return for `text`
    pub fn image_for(text: &str) -> ImageRef {
        ImageRef::from_base64_png(&text.replace(' ', "_"))
    }

    /// The image `sequenced` returns for the `n`th request (from 0)
    pub fn image_for_nth(text: &str, n: usize) -> ImageRef {
        Self::image_for(&format!("{text} {n}"))
    }

    /// Let the `n`th request of a `sequenced` generator finish
    pub fn release_nth(&self, n: usize) {
        let mut state = self.lock();
        state.released_nth.insert(n);
        self.released.notify_all();
    }

    /// Let the request for `text` finish
    pub fn release(&self, text: &str) {
        let mut state = self.lock();
        state.released.insert(text.to_string());
        self.released.notify_all();
    }

    pub fn release_all(&self) {
        let mut state = self.lock();
        state.release_all = true;
        self.released.notify_all();
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    pub fn completed(&self) -> usize {
        self.lock().completed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GeneratorState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ImageGenerator for FakeGenerator {
    fn check_ready(&self) -> Result<(), GenerationError> {
        if self.mode == GeneratorMode::NoCredential {
            return Err(GenerationError::MissingCredential {
                env_var: "STABILITY_API_KEY".to_string(),
            });
        }
        Ok(())
    }

    fn generate(&self, text: &str) -> Result<ImageRef, GenerationError> {
        self.check_ready()?;

        let mut state = self.lock();
        state.prompts.push(text.to_string());
        let ticket = state.prompts.len() - 1;

        let released = |state: &GeneratorState| match self.mode {
            GeneratorMode::Gated => state.release_all || state.released.contains(text),
            GeneratorMode::Sequenced => state.release_all || state.released_nth.contains(&ticket),
            _ => true,
        };
        while !released(&*state) {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        state.completed += 1;

        match (&self.mode, &self.error) {
            (GeneratorMode::Failing, Some(error)) => Err(error.clone()),
            (GeneratorMode::Sequenced, _) => Ok(Self::image_for_nth(text, ticket)),
            _ => Ok(Self::image_for(text)),
        }
    }
}

/// Renderer serving fixed pages for any path.
pub struct FakeRenderer {
    pages: Vec<String>,
    probe_error: Option<String>,
    open: bool,
}

impl FakeRenderer {
    pub fn factory(pages: Vec<&str>) -> RendererFactory {
        let pages: Vec<String> = pages.into_iter().map(String::from).collect();
        Box::new(move || {
            let renderer = FakeRenderer {
                pages,
                probe_error: None,
                open: false,
            };
            vec![Box::new(renderer) as Box<dyn DocumentRenderer>]
        })
    }

    pub fn broken_factory(message: &str) -> RendererFactory {
        let message = message.to_string();
        Box::new(move || {
            let renderer = FakeRenderer {
                pages: Vec::new(),
                probe_error: Some(message),
                open: false,
            };
            vec![Box::new(renderer) as Box<dyn DocumentRenderer>]
        })
    }
}

impl DocumentRenderer for FakeRenderer {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn supports(&self, _path: &Path) -> bool {
        true
    }

    fn probe(&self) -> Result<(), RenderError> {
        match &self.probe_error {
            Some(message) => Err(RenderError::Unavailable("fake", message.clone())),
            None => Ok(()),
        }
    }

    fn open(&mut self, _path: &Path) -> Result<usize, RenderError> {
        self.open = false;
        if self.pages.is_empty() {
            return Err(RenderError::Empty);
        }
        self.open = true;
        Ok(self.pages.len())
    }

    fn page_text(&self, page: usize) -> Result<String, RenderError> {
        if !self.open {
            return Err(RenderError::NotOpen);
        }
        self.pages
            .get(page.wrapping_sub(1))
            .cloned()
            .ok_or(RenderError::PageOutOfRange {
                page,
                page_count: self.pages.len(),
            })
    }
}
