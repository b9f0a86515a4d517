//! Annotation records and the geometry they are anchored with

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a confirmed annotation.
///
/// Derived from the creation time in milliseconds; later annotations always
/// compare greater, even when two are confirmed within the same millisecond.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnnotationId(pub u64);

impl AnnotationId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned rectangle (x, y, width, height).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Express this rectangle relative to the top-left corner of `origin`.
    #[must_use]
    pub fn relative_to(&self, origin: &Bounds) -> Bounds {
        Bounds {
            x: self.x - origin.x,
            y: self.y - origin.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Point where the confirmation popup is attached, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnchorPoint {
    pub x: f32,
    pub y: f32,
}

impl AnchorPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A confirmed highlight on a specific page.
///
/// Everything about an annotation is fixed at confirmation time, so the
/// fields are only reachable through getters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    id: AnnotationId,
    text: String,
    page: usize,
    created_at: DateTime<Utc>,
    anchor: Bounds,
}

impl Annotation {
    pub(crate) fn new(
        id: AnnotationId,
        text: String,
        page: usize,
        created_at: DateTime<Utc>,
        anchor: Bounds,
    ) -> Self {
        Self {
            id,
            text,
            page,
            created_at,
            anchor,
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Page the annotation was confirmed on (1-indexed)
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Selection rectangle relative to the viewport's top-left corner
    pub fn anchor(&self) -> Bounds {
        self.anchor
    }

    /// "Page N • HH:MM:SS" in local time
    pub fn caption(&self) -> String {
        let local = self.created_at.with_timezone(&chrono::Local);
        format!("Page {} • {}", self.page, local.format("%H:%M:%S"))
    }
}

/// Issues strictly increasing ids from creation timestamps.
#[derive(Debug, Default)]
pub(crate) struct IdClock {
    last: u64,
}

impl IdClock {
    pub(crate) fn next(&mut self, now: DateTime<Utc>) -> AnnotationId {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last + 1);
        self.last = id;
        AnnotationId(id)
    }
}
