use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::annotations::Popup;
use crate::theme::OCEANIC_NEXT;

const POPUP_WIDTH: u16 = 28;
const POPUP_HEIGHT: u16 = 3;
const CONFIRM_LABEL: &str = " [y] Annotate ";
const CANCEL_LABEL: &str = " [x] Cancel ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmPopupAction {
    Confirm,
    Cancel,
}

/// Small "annotate this?" box drawn under the end of the selection.
#[derive(Default)]
pub struct ConfirmPopup {
    last_area: Option<Rect>,
    confirm_area: Option<Rect>,
    cancel_area: Option<Rect>,
}

impl ConfirmPopup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the popup lands for `popup` inside `viewport`, kept on screen.
    pub fn area_for(popup: &Popup, viewport: Rect, screen: Rect) -> Rect {
        let x = viewport.x.saturating_add(popup.anchor.x.max(0.0) as u16);
        // One row below the selection so the popup does not cover it
        let y = viewport
            .y
            .saturating_add(popup.anchor.y.max(0.0) as u16)
            .saturating_add(1);

        let width = POPUP_WIDTH.min(screen.width);
        let height = POPUP_HEIGHT.min(screen.height);
        let x = x.min(screen.right().saturating_sub(width));
        let y = y.min(screen.bottom().saturating_sub(height));
        Rect::new(x, y, width, height)
    }

    pub fn render(&mut self, f: &mut Frame, popup: &Popup, viewport: Rect) {
        if !popup.visible {
            self.last_area = None;
            self.confirm_area = None;
            self.cancel_area = None;
            return;
        }

        let area = Self::area_for(popup, viewport, f.area());
        self.last_area = Some(area);

        let inner_x = area.x + 1;
        let inner_y = area.y + 1;
        let confirm_width = CONFIRM_LABEL.chars().count() as u16;
        let cancel_width = CANCEL_LABEL.chars().count() as u16;
        self.confirm_area = Some(Rect::new(inner_x, inner_y, confirm_width, 1));
        self.cancel_area = Some(Rect::new(inner_x + confirm_width, inner_y, cancel_width, 1));

        let button = Style::default()
            .fg(OCEANIC_NEXT.base_00)
            .add_modifier(Modifier::BOLD);
        let line = Line::from(vec![
            Span::styled(CONFIRM_LABEL, button.bg(OCEANIC_NEXT.base_0b)),
            Span::styled(CANCEL_LABEL, button.bg(OCEANIC_NEXT.base_08)),
        ]);

        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(line).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(OCEANIC_NEXT.base_0c))
                    .style(Style::default().bg(OCEANIC_NEXT.base_01)),
            ),
            area,
        );
    }

    /// Map a click to a popup button
    pub fn handle_click(&self, column: u16, row: u16) -> Option<ConfirmPopupAction> {
        let hit = |rect: Option<Rect>| {
            rect.is_some_and(|r| {
                column >= r.x && column < r.right() && row >= r.y && row < r.bottom()
            })
        };
        if hit(self.confirm_area) {
            Some(ConfirmPopupAction::Confirm)
        } else if hit(self.cancel_area) {
            Some(ConfirmPopupAction::Cancel)
        } else {
            None
        }
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        self.last_area.is_some_and(|r| {
            column >= r.x && column < r.right() && row >= r.y && row < r.bottom()
        })
    }
}
