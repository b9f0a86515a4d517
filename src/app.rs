//! Terminal front end: layout, key bindings and the event loop

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use log::{debug, error, info};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use ratatui_image::picker::Picker;

use crate::annotations::AnnotationId;
use crate::document::Availability;
use crate::event_source::EventSource;
use crate::session::ViewerSession;
use crate::terminal_selection::{PageRow, TerminalSelection, wrap_page};
use crate::theme::OCEANIC_NEXT;
use crate::widget::{
    AnnotationSidebar, ConfirmPopup, ConfirmPopupAction, HudMessage, HudMode, ImageOverlay,
    ImageOverlayAction,
};

const HUD_DURATION: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusedPanel {
    Page,
    Annotations,
}

pub struct App {
    pub session: ViewerSession,
    pub focused_panel: FocusedPanel,
    selection: TerminalSelection,
    sidebar: AnnotationSidebar,
    popup: ConfirmPopup,
    overlay: Option<ImageOverlay>,
    picker: Picker,
    path_input: Option<String>,
    hud: Option<HudMessage>,
    scroll: usize,
    wrapped_lines: Vec<PageRow>,
    page_area: Rect,
    rendered_page: usize,
    swallow_mouse_up: bool,
}

impl App {
    pub fn new(session: ViewerSession) -> Self {
        Self {
            session,
            focused_panel: FocusedPanel::Page,
            selection: TerminalSelection::new(),
            sidebar: AnnotationSidebar::new(),
            popup: ConfirmPopup::new(),
            overlay: None,
            picker: Picker::halfblocks(),
            path_input: None,
            hud: None,
            scroll: 0,
            wrapped_lines: Vec::new(),
            page_area: Rect::default(),
            rendered_page: 0,
            swallow_mouse_up: false,
        }
    }

    /// Replace the halfblock fallback with a picker queried from the terminal
    pub fn set_image_picker(&mut self, picker: Picker) {
        self.picker = picker;
        self.overlay = None;
    }

    /// Open `path`, reporting failures on the status line
    pub fn open_document(&mut self, path: &Path) {
        if let Err(e) = self.session.open_document(path) {
            error!("{e:#}");
            self.show_hud(format!("{e:#}"), HudMode::Error);
        }
    }

    pub fn selection(&self) -> &TerminalSelection {
        &self.selection
    }

    pub fn overlay(&self) -> Option<&ImageOverlay> {
        self.overlay.as_ref()
    }

    pub fn hud(&self) -> Option<&HudMessage> {
        self.hud.as_ref()
    }

    pub fn selected_annotation(&self) -> Option<AnnotationId> {
        self.sidebar.selected_id()
    }

    /// Drain worker answers, run deferred work and expire the status line.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.session.tick(now, &mut self.selection);
        if self.hud.as_ref().is_some_and(|hud| hud.is_expired(now)) {
            self.hud = None;
            changed = true;
        }
        changed
    }

    fn show_hud(&mut self, message: impl Into<String>, mode: HudMode) {
        self.hud = Some(HudMessage::new(message, HUD_DURATION, mode));
    }

    pub fn handle_event(&mut self, event: Event) -> Option<AppAction> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => {
                self.handle_mouse(mouse);
                None
            }
            _ => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if self.path_input.is_some() {
            self.handle_path_input(key);
            return None;
        }

        if self.overlay.is_some() {
            let action = match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Some(ImageOverlayAction::Close),
                KeyCode::Char('s') => Some(ImageOverlayAction::Save),
                KeyCode::Char('O') => Some(ImageOverlayAction::OpenExternal),
                _ => None,
            };
            if let Some(action) = action {
                self.handle_overlay_action(action);
            }
            return None;
        }

        if self.session.annotations().popup().visible {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.handle_popup_action(ConfirmPopupAction::Confirm);
                    return None;
                }
                KeyCode::Char('x') | KeyCode::Esc => {
                    self.handle_popup_action(ConfirmPopupAction::Cancel);
                    return None;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('o') => {
                if self.session.host().is_ready() {
                    self.path_input = Some(String::new());
                } else {
                    self.show_hud("Renderer not ready", HudMode::Error);
                }
            }
            KeyCode::Char('n') | KeyCode::Right => self.session.next_page(),
            KeyCode::Char('p') | KeyCode::Left => self.session.prev_page(),
            KeyCode::Char('r') => self.session.retry(),
            KeyCode::Char('C') => {
                self.session.clear_annotations();
                self.show_hud("Cleared all annotations", HudMode::Normal);
            }
            KeyCode::Tab => {
                self.focused_panel = match self.focused_panel {
                    FocusedPanel::Page => FocusedPanel::Annotations,
                    FocusedPanel::Annotations => FocusedPanel::Page,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => match self.focused_panel {
                FocusedPanel::Annotations => self.sidebar.select_next(),
                FocusedPanel::Page => self.scroll_by(1),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.focused_panel {
                FocusedPanel::Annotations => self.sidebar.select_previous(),
                FocusedPanel::Page => self.scroll_by(-1),
            },
            KeyCode::Char('g') => {
                if let Some(id) = self.sidebar.selected_id() {
                    self.session.generate_illustration(id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.sidebar.selected_id() {
                    self.session.remove_annotation(id);
                }
            }
            KeyCode::Char('v') | KeyCode::Enter => self.open_overlay(),
            _ => {}
        }
        None
    }

    fn handle_path_input(&mut self, key: KeyEvent) {
        let Some(input) = self.path_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Esc => self.path_input = None,
            KeyCode::Enter => {
                let raw = input.trim().to_string();
                self.path_input = None;
                if !raw.is_empty() {
                    self.open_document(&PathBuf::from(raw));
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.overlay.is_some() || self.path_input.is_some() {
            return;
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.session.annotations().popup().visible {
                    if let Some(action) = self.popup.handle_click(mouse.column, mouse.row) {
                        self.swallow_mouse_up = true;
                        self.handle_popup_action(action);
                        return;
                    }
                    if self.popup.contains(mouse.column, mouse.row) {
                        self.swallow_mouse_up = true;
                        return;
                    }
                }
                self.selection.start_at(mouse.column, mouse.row);
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.selection.update_end(mouse.column, mouse.row);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if std::mem::take(&mut self.swallow_mouse_up) {
                    return;
                }
                self.selection.finish();
                self.session.pointer_released(&self.selection);
            }
            MouseEventKind::ScrollDown => self.scroll_by(1),
            MouseEventKind::ScrollUp => self.scroll_by(-1),
            _ => {}
        }
    }

    fn handle_popup_action(&mut self, action: ConfirmPopupAction) {
        let now = Instant::now();
        match action {
            ConfirmPopupAction::Confirm => {
                if let Some(id) = self.session.confirm_selection(now) {
                    debug!("Confirmed annotation {id} from popup");
                    if let Some(text) = self.session.annotations().last_confirmed() {
                        let message = format!("Annotated \"{}\"", shorten(text, 40));
                        self.show_hud(message, HudMode::Normal);
                    }
                }
            }
            ConfirmPopupAction::Cancel => self.session.cancel_selection(now),
        }
    }

    fn open_overlay(&mut self) {
        let Some(id) = self.sidebar.selected_id() else {
            return;
        };
        if let Some(image) = self.session.illustration(id).image() {
            self.overlay = Some(ImageOverlay::new(id, image.clone()));
        }
    }

    fn handle_overlay_action(&mut self, action: ImageOverlayAction) {
        let Some(overlay) = self.overlay.as_ref() else {
            return;
        };

        match action {
            ImageOverlayAction::Close => self.overlay = None,
            ImageOverlayAction::Save => {
                let dir = self
                    .session
                    .host()
                    .document
                    .as_ref()
                    .and_then(|doc| doc.path.parent().map(Path::to_path_buf))
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .unwrap_or_else(|| PathBuf::from("."));
                let path = dir.join(overlay.file_name());
                match overlay.image().save_to(&path) {
                    Ok(()) => {
                        info!("Saved illustration to {}", path.display());
                        self.show_hud(format!("Saved {}", path.display()), HudMode::Normal);
                    }
                    Err(e) => {
                        error!("Failed to save illustration: {e}");
                        self.show_hud(format!("Save failed: {e}"), HudMode::Error);
                    }
                }
            }
            ImageOverlayAction::OpenExternal => {
                let path = std::env::temp_dir().join(overlay.file_name());
                let result = overlay
                    .image()
                    .save_to(&path)
                    .map_err(anyhow::Error::from)
                    .and_then(|()| open::that(&path).map_err(anyhow::Error::from));
                if let Err(e) = result {
                    error!("Failed to open illustration: {e:#}");
                    self.show_hud(format!("Open failed: {e:#}"), HudMode::Error);
                }
            }
        }
    }

    fn scroll_by(&mut self, delta: isize) {
        let max = self
            .wrapped_lines
            .len()
            .saturating_sub(usize::from(self.page_area.height));
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(f.area());
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(rows[1]);

        self.draw_header(f, rows[0]);
        self.draw_page(f, body[0]);

        let annotations = self.session.visible_annotations();
        let session = &self.session;
        self.sidebar.render(
            f,
            body[1],
            &annotations,
            |id| session.illustration(id),
            self.focused_panel == FocusedPanel::Annotations,
        );

        self.draw_status(f, rows[2]);

        let popup = self.session.annotations().popup();
        self.popup.render(f, &popup, self.page_area);

        let screen = f.area();
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.render(f, screen, &self.picker);
        }
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let host = self.session.host();
        let mut spans = vec![Span::styled(
            " pagelight ",
            Style::default()
                .fg(OCEANIC_NEXT.base_00)
                .bg(OCEANIC_NEXT.base_0d)
                .add_modifier(Modifier::BOLD),
        )];

        match &host.document {
            Some(document) => spans.push(Span::styled(
                format!(" Selected: {} ({} bytes)", document.name, document.size),
                Style::default().fg(OCEANIC_NEXT.base_05),
            )),
            None => spans.push(Span::styled(
                " No document",
                Style::default().fg(OCEANIC_NEXT.base_03),
            )),
        }

        if let Some(count) = host.page_count {
            let back = if host.can_go_back() { "‹ " } else { "  " };
            let forward = if host.can_go_forward() { " ›" } else { "" };
            spans.push(Span::styled(
                format!("  {back}Page {} of {count}{forward}", host.current_page),
                Style::default().fg(OCEANIC_NEXT.base_0a),
            ));
        }

        if self.session.is_busy() {
            spans.push(Span::styled(
                "  rendering…",
                Style::default().fg(OCEANIC_NEXT.base_03),
            ));
        }

        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_page(&mut self, f: &mut Frame, area: Rect) {
        let host = self.session.host();
        let border = if self.focused_panel == FocusedPanel::Page {
            OCEANIC_NEXT.base_0c
        } else {
            OCEANIC_NEXT.base_02
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));
        let inner = block.inner(area);
        self.page_area = inner;

        if let Some(message) = &host.error {
            let mut lines = vec![Line::from(Span::styled(
                message.clone(),
                Style::default().fg(OCEANIC_NEXT.base_08),
            ))];
            if host.document.is_some() && host.is_ready() {
                lines.push(Line::default());
                lines.push(Line::from("Press r to retry"));
            }
            self.selection.set_view("", Vec::new(), inner, 0);
            f.render_widget(
                Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .block(block.title(" Error ")),
                area,
            );
            return;
        }

        let placeholder = match (&host.availability, &host.document, self.session.page_text()) {
            (Availability::Checking, _, _) => Some("Checking document renderer…"),
            (_, None, _) => Some("Press o to open a document"),
            (_, Some(_), None) => Some("Loading…"),
            _ => None,
        };
        if let Some(text) = placeholder {
            self.selection.set_view("", Vec::new(), inner, 0);
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    text,
                    Style::default().fg(OCEANIC_NEXT.base_03),
                )))
                .block(block),
                area,
            );
            return;
        }

        if self.rendered_page != host.current_page {
            self.rendered_page = host.current_page;
            self.scroll = 0;
        }

        let page = self.session.page_text().unwrap_or_default();
        self.wrapped_lines = wrap_page(page, usize::from(inner.width));
        self.selection
            .set_view(page, self.wrapped_lines.clone(), inner, self.scroll);

        let highlight = Style::default()
            .fg(OCEANIC_NEXT.base_00)
            .bg(OCEANIC_NEXT.base_0a);
        let normal = Style::default().fg(OCEANIC_NEXT.base_05);
        let lines: Vec<Line> = self
            .wrapped_lines
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(usize::from(inner.height))
            .map(|(index, row)| {
                let mut spans: Vec<Span> = Vec::new();
                let mut run = String::new();
                let mut run_selected = false;
                for (column, ch) in row.text.chars().enumerate() {
                    let selected = self.selection.contains(index, column);
                    if selected != run_selected && !run.is_empty() {
                        let style = if run_selected { highlight } else { normal };
                        spans.push(Span::styled(std::mem::take(&mut run), style));
                    }
                    run_selected = selected;
                    run.push(ch);
                }
                if !run.is_empty() {
                    let style = if run_selected { highlight } else { normal };
                    spans.push(Span::styled(run, style));
                }
                Line::from(spans)
            })
            .collect();

        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let line = if let Some(input) = &self.path_input {
            Line::from(vec![
                Span::styled(" Open: ", Style::default().fg(OCEANIC_NEXT.base_0d)),
                Span::raw(input.clone()),
                Span::styled("█", Style::default().fg(OCEANIC_NEXT.base_05)),
            ])
        } else if let Some(hud) = &self.hud {
            hud.styled_line(&OCEANIC_NEXT)
        } else {
            Line::from(Span::styled(
                " o open  n/p page  drag select  Tab focus  g generate  d remove  v view  C clear  q quit",
                Style::default().fg(OCEANIC_NEXT.base_03),
            ))
        };
        f.render_widget(Paragraph::new(line), area);
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut short: String = flat.chars().take(max_chars).collect();
    short.push('…');
    short
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut first_render = true;

    loop {
        let mut events_processed = 0;
        let mut should_quit = false;

        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;
            if matches!(event, Event::Resize(_, _)) {
                continue;
            }
            if app.handle_event(event) == Some(AppAction::Quit) {
                should_quit = true;
                break;
            }
        }

        if should_quit {
            return Ok(());
        }

        let mut needs_redraw = events_processed > 0 || first_render;
        first_render = false;
        if app.tick(Instant::now()) {
            needs_redraw = true;
        }

        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        if events_processed == 0 {
            let _ = event_source.poll(tick_rate)?;
        }
    }
}
