//! Mouse-drag text selection over the rendered page

use ratatui::layout::Rect;

use crate::annotations::{Bounds, PlatformSelection, SelectionSource};

/// A point in the selection, in wrapped-row coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionPoint {
    /// Index into the wrapped rows of the page
    pub line: usize,
    /// Character column within the row
    pub column: usize,
}

/// One screen row of wrapped page text.
///
/// `text` is always a verbatim slice of the page starting at byte `offset`,
/// so a selection maps back onto the page without the whitespace dropped at
/// soft wraps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRow {
    pub text: String,
    pub offset: usize,
}

/// Wrap `page` to `width` columns, remembering where each row starts.
pub fn wrap_page(page: &str, width: usize) -> Vec<PageRow> {
    let mut rows = Vec::new();
    let mut line_start = 0;
    for raw in page.split('\n') {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            rows.push(PageRow {
                text: String::new(),
                offset: line_start,
            });
        } else {
            let mut cursor = 0;
            for part in textwrap::wrap(line, width.max(1)) {
                let start = line[cursor..]
                    .find(part.as_ref())
                    .map_or(cursor, |found| cursor + found);
                let end = (start + part.len()).min(line.len());
                rows.push(PageRow {
                    text: line[start..end].to_string(),
                    offset: line_start + start,
                });
                cursor = end;
            }
        }
        line_start += raw.len() + 1;
    }
    // A trailing newline does not start another row
    if page.ends_with('\n') {
        rows.pop();
    }
    rows
}

/// Native text selection of the terminal viewer.
///
/// Tracks the drag anchor and head against the wrapped rows currently on
/// screen and reports the selected page text with screen-cell bounds.
#[derive(Clone, Debug, Default)]
pub struct TerminalSelection {
    page: String,
    rows: Vec<PageRow>,
    viewport: Rect,
    scroll: usize,
    anchor: Option<SelectionPoint>,
    head: Option<SelectionPoint>,
    is_selecting: bool,
}

impl TerminalSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record what is drawn in the viewport; called on every frame.
    pub fn set_view(&mut self, page: &str, rows: Vec<PageRow>, viewport: Rect, scroll: usize) {
        if rows != self.rows || page != self.page {
            self.clear_selection_points();
            self.page = page.to_string();
        }
        self.rows = rows;
        self.viewport = viewport;
        self.scroll = scroll;
    }

    /// Mouse down inside the viewport
    pub fn start_at(&mut self, column: u16, row: u16) {
        match self.point_at(column, row) {
            Some(point) => {
                self.anchor = Some(point);
                self.head = Some(point);
                self.is_selecting = true;
            }
            None => self.clear_selection_points(),
        }
    }

    /// Mouse drag
    pub fn update_end(&mut self, column: u16, row: u16) {
        if !self.is_selecting {
            return;
        }
        if let Some(point) = self.clamped_point(column, row) {
            self.head = Some(point);
        }
    }

    /// Mouse up
    pub fn finish(&mut self) {
        self.is_selecting = false;
    }

    pub fn is_selecting(&self) -> bool {
        self.is_selecting
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        matches!(self.ordered(), Some((start, end)) if start != end)
    }

    /// Whether the cell at (`line`, `column`) is highlighted
    pub fn contains(&self, line: usize, column: usize) -> bool {
        match self.ordered() {
            Some((start, end)) if start != end => {
                let point = (line, column);
                (start.line, start.column) <= point && point < (end.line, end.column)
            }
            _ => false,
        }
    }

    /// Ordered selection endpoints; `end` is exclusive.
    #[must_use]
    pub fn ordered(&self) -> Option<(SelectionPoint, SelectionPoint)> {
        let (anchor, head) = (self.anchor?, self.head?);
        if (anchor.line, anchor.column) <= (head.line, head.column) {
            Some((anchor, head))
        } else {
            Some((head, anchor))
        }
    }

    /// Page text between the endpoints
    pub fn selected_text(&self) -> Option<String> {
        let (start, end) = self.ordered()?;
        if start == end {
            return None;
        }
        let from = self.page_offset(start)?;
        let to = self.page_offset(end)?;
        self.page.get(from..to).map(str::to_string)
    }

    fn page_offset(&self, point: SelectionPoint) -> Option<usize> {
        let row = self.rows.get(point.line)?;
        let within = row
            .text
            .char_indices()
            .nth(point.column)
            .map_or(row.text.len(), |(index, _)| index);
        Some(row.offset + within)
    }

    fn point_at(&self, column: u16, row: u16) -> Option<SelectionPoint> {
        let inside = column >= self.viewport.x
            && column < self.viewport.right()
            && row >= self.viewport.y
            && row < self.viewport.bottom();
        if !inside {
            return None;
        }
        self.clamped_point(column, row)
    }

    fn clamped_point(&self, column: u16, row: u16) -> Option<SelectionPoint> {
        if self.rows.is_empty() || self.viewport.height == 0 {
            return None;
        }
        let row = row.clamp(self.viewport.y, self.viewport.bottom().saturating_sub(1));
        let column = column.clamp(self.viewport.x, self.viewport.right());

        let line = (self.scroll + usize::from(row - self.viewport.y)).min(self.rows.len() - 1);
        let width = self.rows[line].text.chars().count();
        let column = usize::from(column - self.viewport.x).min(width);
        Some(SelectionPoint { line, column })
    }

    fn clear_selection_points(&mut self) {
        self.anchor = None;
        self.head = None;
        self.is_selecting = false;
    }

    fn screen_bounds(&self, start: SelectionPoint, end: SelectionPoint) -> Bounds {
        let top = start.line.saturating_sub(self.scroll);
        let bottom = end.line.saturating_sub(self.scroll) + 1;
        let (left, right) = if start.line == end.line {
            (start.column, end.column)
        } else {
            let widest = (start.line..=end.line)
                .filter_map(|line| self.rows.get(line))
                .map(|row| row.text.chars().count())
                .max()
                .unwrap_or(0);
            (0, widest)
        };

        Bounds::new(
            f32::from(self.viewport.x) + left as f32,
            f32::from(self.viewport.y) + top as f32,
            right.saturating_sub(left) as f32,
            bottom.saturating_sub(top) as f32,
        )
    }
}

impl SelectionSource for TerminalSelection {
    fn current_selection(&self) -> Option<PlatformSelection> {
        let (start, end) = self.ordered()?;
        let text = self.selected_text()?;
        Some(PlatformSelection {
            text,
            bounds: self.screen_bounds(start, end),
        })
    }

    fn viewport_bounds(&self) -> Bounds {
        Bounds::new(
            f32::from(self.viewport.x),
            f32::from(self.viewport.y),
            f32::from(self.viewport.width),
            f32::from(self.viewport.height),
        )
    }

    fn clear_selection(&mut self) {
        self.clear_selection_points();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "It was a dark night.\nA storm at sea raged.\nDawn came.";

    fn selection() -> TerminalSelection {
        let mut selection = TerminalSelection::new();
        selection.set_view(PAGE, wrap_page(PAGE, 30), Rect::new(2, 3, 30, 10), 0);
        selection
    }

    #[test]
    fn single_line_drag_selects_columns() {
        let mut selection = selection();
        selection.start_at(4, 4);
        selection.update_end(16, 4);
        selection.finish();

        let native = selection.current_selection().unwrap();
        assert_eq!(native.text, "storm at sea");
        assert_eq!(native.bounds, Bounds::new(4.0, 4.0, 12.0, 1.0));
    }

    #[test]
    fn backwards_drag_is_ordered() {
        let mut selection = selection();
        selection.start_at(16, 4);
        selection.update_end(4, 4);
        assert_eq!(selection.selected_text().as_deref(), Some("storm at sea"));
    }

    #[test]
    fn multi_line_drag_joins_lines() {
        let mut selection = selection();
        selection.start_at(11, 3);
        selection.update_end(9, 4);

        let native = selection.current_selection().unwrap();
        assert_eq!(native.text, "dark night.\nA storm");
        assert_eq!(native.bounds.y, 3.0);
        assert_eq!(native.bounds.height, 2.0);
    }

    #[test]
    fn click_without_drag_selects_nothing() {
        let mut selection = selection();
        selection.start_at(5, 4);
        selection.finish();
        assert!(!selection.has_selection());
        assert!(selection.current_selection().is_none());
    }

    #[test]
    fn press_outside_viewport_clears() {
        let mut selection = selection();
        selection.start_at(4, 4);
        selection.update_end(10, 4);
        selection.start_at(0, 0);
        assert!(selection.current_selection().is_none());
    }

    #[test]
    fn scroll_offsets_lines() {
        let mut selection = selection();
        selection.set_view(PAGE, wrap_page(PAGE, 30), Rect::new(2, 3, 30, 10), 1);
        selection.start_at(2, 3);
        selection.update_end(6, 3);
        assert_eq!(selection.selected_text().as_deref(), Some("A st"));
    }

    #[test]
    fn clear_drops_highlight() {
        let mut selection = selection();
        selection.start_at(4, 4);
        selection.update_end(10, 4);
        assert!(selection.contains(1, 3));
        selection.clear_selection();
        assert!(!selection.contains(1, 3));
    }

    #[test]
    fn rows_remember_their_page_offsets() {
        let rows = wrap_page("A great storm at sea raged\n\nDawn", 14);
        let texts: Vec<&str> = rows.iter().map(|row| row.text.as_str()).collect();
        assert_eq!(texts, ["A great storm", "at sea raged", "", "Dawn"]);
        let offsets: Vec<usize> = rows.iter().map(|row| row.offset).collect();
        assert_eq!(offsets, [0, 14, 27, 28]);
    }

    #[test]
    fn drag_across_soft_wrap_keeps_page_text() {
        let page = "A great storm at sea raged";
        let mut selection = TerminalSelection::new();
        selection.set_view(page, wrap_page(page, 14), Rect::new(0, 0, 14, 5), 0);

        selection.start_at(2, 0);
        selection.update_end(6, 1);
        assert_eq!(selection.selected_text().as_deref(), Some("great storm at sea"));
    }

    #[test]
    fn drag_to_row_end_stops_before_the_wrap() {
        let page = "A great storm at sea raged";
        let mut selection = TerminalSelection::new();
        selection.set_view(page, wrap_page(page, 14), Rect::new(0, 0, 14, 5), 0);

        selection.start_at(2, 0);
        selection.update_end(14, 0);
        assert_eq!(selection.selected_text().as_deref(), Some("great storm"));
    }
}
