//! Annotation list, pending selection and confirmation popup

use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, warn};

use super::selection::{PendingSelection, Popup, SelectionSource};
use super::types::{AnchorPoint, Annotation, AnnotationId, IdClock};

pub const DEFAULT_CLEAR_DELAY: Duration = Duration::from_millis(100);

/// Owns every annotation of the loaded document plus the transient
/// selection staging state.
pub struct AnnotationManager {
    annotations: Vec<Annotation>,
    pending: Option<PendingSelection>,
    popup: Popup,
    last_confirmed: Option<String>,
    ids: IdClock,
    clear_delay: Duration,
    clear_due: Option<Instant>,
}

impl Default for AnnotationManager {
    fn default() -> Self {
        Self::new(DEFAULT_CLEAR_DELAY)
    }
}

impl AnnotationManager {
    #[must_use]
    pub fn new(clear_delay: Duration) -> Self {
        Self {
            annotations: Vec::new(),
            pending: None,
            popup: Popup::hidden(),
            last_confirmed: None,
            ids: IdClock::default(),
            clear_delay,
            clear_due: None,
        }
    }

    /// Handle a pointer release: stage the host's current selection, or
    /// dismiss the popup when nothing (or only whitespace) is selected.
    pub fn capture_selection(&mut self, source: &dyn SelectionSource) {
        let selection = source
            .current_selection()
            .filter(|s| !s.text.trim().is_empty());

        let Some(selection) = selection else {
            self.pending = None;
            self.popup = Popup::hidden();
            return;
        };

        let viewport = source.viewport_bounds();
        let anchor = selection.bounds.relative_to(&viewport);
        let popup_at = AnchorPoint::new(
            selection.bounds.right() - viewport.x,
            selection.bounds.bottom() - viewport.y,
        );

        debug!(
            "Staged selection of {} chars at {:?}",
            selection.text.trim().chars().count(),
            anchor
        );

        self.pending = Some(PendingSelection {
            text: selection.text.trim().to_string(),
            anchor,
        });
        self.popup = Popup::at(popup_at);
    }

    /// Turn the pending selection into an annotation on `page`.
    ///
    /// Without a pending selection this is a no-op that only logs.
    pub fn confirm(&mut self, page: usize, now: Instant) -> Option<AnnotationId> {
        let pending = match self.pending.take() {
            Some(pending) if !pending.text.is_empty() => pending,
            other => {
                warn!("No pending selection to confirm: {other:?}");
                return None;
            }
        };

        let created_at = Utc::now();
        let id = self.ids.next(created_at);
        self.last_confirmed = Some(pending.text.clone());
        self.annotations.push(Annotation::new(
            id,
            pending.text,
            page,
            created_at,
            pending.anchor,
        ));
        self.popup = Popup::hidden();
        self.schedule_native_clear(now);

        debug!("Confirmed annotation {id} on page {page}");
        Some(id)
    }

    /// Drop the pending selection without creating an annotation.
    pub fn cancel(&mut self, now: Instant) {
        self.pending = None;
        self.popup = Popup::hidden();
        self.schedule_native_clear(now);
    }

    /// Remove one annotation; returns false when the id is unknown.
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.id() != id);
        self.annotations.len() != before
    }

    pub fn clear_all(&mut self) {
        self.annotations.clear();
        self.last_confirmed = None;
    }

    /// Forget everything that belonged to the previous document.
    pub fn reset(&mut self) {
        self.annotations.clear();
        self.pending = None;
        self.popup = Popup::hidden();
        self.last_confirmed = None;
        self.clear_due = None;
    }

    /// Annotations on `page`, most recent first.
    #[must_use]
    pub fn for_page(&self, page: usize) -> Vec<&Annotation> {
        let mut visible: Vec<&Annotation> =
            self.annotations.iter().filter(|a| a.page() == page).collect();
        visible.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b.id().cmp(&a.id()))
        });
        visible
    }

    /// Run the deferred native-selection clear once it is due.
    ///
    /// Returns true when the selection was cleared.
    pub fn tick(&mut self, now: Instant, source: &mut dyn SelectionSource) -> bool {
        match self.clear_due {
            Some(due) if now >= due => {
                self.clear_due = None;
                source.clear_selection();
                true
            }
            _ => false,
        }
    }

    fn schedule_native_clear(&mut self, now: Instant) {
        self.clear_due = Some(now + self.clear_delay);
    }

    #[must_use]
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    /// All annotations in insertion order
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn pending(&self) -> Option<&PendingSelection> {
        self.pending.as_ref()
    }

    pub fn popup(&self) -> Popup {
        self.popup
    }

    pub fn last_confirmed(&self) -> Option<&str> {
        self.last_confirmed.as_deref()
    }

    pub fn native_clear_pending(&self) -> bool {
        self.clear_due.is_some()
    }
}
