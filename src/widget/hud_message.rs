use std::time::{Duration, Instant};

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::theme::Base16Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudMode {
    Normal,
    Error,
}

/// Transient status line text, e.g. "Saved illustration-17.png".
#[derive(Debug, Clone)]
pub struct HudMessage {
    message: String,
    mode: HudMode,
    expires_at: Instant,
}

impl HudMessage {
    pub fn new(message: impl Into<String>, duration: Duration, mode: HudMode) -> Self {
        Self {
            message: message.into(),
            mode,
            expires_at: Instant::now() + duration,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn mode(&self) -> HudMode {
        self.mode
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn styled_line(&self, palette: &Base16Palette) -> Line<'static> {
        let (fg, bg) = match self.mode {
            HudMode::Normal => (palette.base_06, palette.base_02),
            HudMode::Error => (palette.base_07, palette.base_08),
        };
        Line::from(Span::styled(
            format!(" {} ", self.message),
            Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
        ))
    }
}
