use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use crate::annotations::{Annotation, AnnotationId};
use crate::illustration::IllustrationSlot;
use crate::theme::OCEANIC_NEXT;

/// Annotations of the current page, newest first, with illustration status.
#[derive(Default)]
pub struct AnnotationSidebar {
    selected: usize,
    ids: Vec<AnnotationId>,
}

impl AnnotationSidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.ids.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Annotation under the cursor as of the last render
    pub fn selected_id(&self) -> Option<AnnotationId> {
        self.ids.get(self.selected).copied()
    }

    /// Keep the cursor valid for the list about to be drawn
    pub fn sync(&mut self, annotations: &[&Annotation]) {
        let previous = self.selected_id();
        self.ids = annotations.iter().map(|a| a.id()).collect();
        self.selected = previous
            .and_then(|id| self.ids.iter().position(|other| *other == id))
            .unwrap_or_else(|| self.selected.min(self.ids.len().saturating_sub(1)));
    }

    pub fn render<'a>(
        &mut self,
        f: &mut Frame,
        area: Rect,
        annotations: &[&Annotation],
        slot_for: impl Fn(AnnotationId) -> &'a IllustrationSlot,
        focused: bool,
    ) {
        self.sync(annotations);

        let text_width = area.width.saturating_sub(4).max(8) as usize;
        let items: Vec<ListItem> = annotations
            .iter()
            .map(|annotation| {
                let mut lines = vec![Line::from(Span::styled(
                    annotation.caption(),
                    Style::default().fg(OCEANIC_NEXT.base_03),
                ))];

                for wrapped in textwrap::wrap(&format!("\"{}\"", annotation.text()), text_width) {
                    lines.push(Line::from(Span::styled(
                        wrapped.into_owned(),
                        Style::default().fg(OCEANIC_NEXT.base_05),
                    )));
                }

                lines.push(status_line(slot_for(annotation.id())));
                lines.push(Line::default());
                ListItem::new(lines)
            })
            .collect();

        let border = if focused {
            OCEANIC_NEXT.base_0c
        } else {
            OCEANIC_NEXT.base_02
        };
        let title = format!(" Annotations ({}) ", annotations.len());
        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border)),
            )
            .highlight_style(Style::default().bg(OCEANIC_NEXT.base_01))
            .highlight_symbol("▌");

        let mut state = ListState::default();
        if !self.ids.is_empty() {
            state.select(Some(self.selected));
        }
        f.render_stateful_widget(list, area, &mut state);
    }
}

fn status_line(slot: &IllustrationSlot) -> Line<'static> {
    match slot {
        IllustrationSlot::Absent => Line::from(Span::styled(
            "[g] generate image",
            Style::default().fg(OCEANIC_NEXT.base_0d),
        )),
        IllustrationSlot::Loading => Line::from(Span::styled(
            "Generating image…",
            Style::default()
                .fg(OCEANIC_NEXT.base_0a)
                .add_modifier(Modifier::ITALIC),
        )),
        IllustrationSlot::Ready(_) => Line::from(Span::styled(
            "Image ready [v] view",
            Style::default().fg(OCEANIC_NEXT.base_0b),
        )),
        IllustrationSlot::Failed(message) => Line::from(Span::styled(
            format!("Error: {message}"),
            Style::default().fg(OCEANIC_NEXT.base_08),
        )),
    }
}
