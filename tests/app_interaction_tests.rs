use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use pagelight::event_source::{KeyCode, KeyModifiers, SimulatedEventSource};
use pagelight::illustration::IllustrationSlot;
use pagelight::settings::Settings;
use pagelight::test_utils::{FakeGenerator, FakeRenderer, wait_for};
use pagelight::{App, AppAction, FocusedPanel, ViewerSession, run_app_with_event_source};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use tempfile::NamedTempFile;

const PAGES: [&str; 2] = ["storm at sea rages on\nthe second line", "calm waters"];

fn document() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "placeholder").unwrap();
    file
}

fn loaded_app(
    generator: Arc<FakeGenerator>,
    file: &NamedTempFile,
) -> (App, Terminal<TestBackend>) {
    loaded_app_with(PAGES.to_vec(), 100, generator, file)
}

fn loaded_app_with(
    pages: Vec<&str>,
    width: u16,
    generator: Arc<FakeGenerator>,
    file: &NamedTempFile,
) -> (App, Terminal<TestBackend>) {
    let session = ViewerSession::new(
        &Settings::default(),
        FakeRenderer::factory(pages),
        generator,
    );
    let mut app = App::new(session);
    assert!(wait_for(|| {
        app.tick(Instant::now());
        app.session.host().is_ready()
    }));

    app.open_document(file.path());
    assert!(wait_for(|| {
        app.tick(Instant::now());
        app.session.page_text().is_some()
    }));

    let mut terminal = Terminal::new(TestBackend::new(width, 30)).unwrap();
    terminal.draw(|f| app.draw(f)).unwrap();
    (app, terminal)
}

fn screen_text(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

/// Screen cell where `needle` first appears at or below `from_row`
fn cell_of(terminal: &Terminal<TestBackend>, needle: &str, from_row: u16) -> (u16, u16) {
    let buffer = terminal.backend().buffer();
    for y in from_row..buffer.area.height {
        let row: String = (0..buffer.area.width)
            .map(|x| buffer[(x, y)].symbol())
            .collect();
        if let Some(byte) = row.find(needle) {
            return (row[..byte].chars().count() as u16, y);
        }
    }
    panic!("{needle:?} is not on screen");
}

// The page panel's first text cell is at column 1, row 2.
fn drag_over_storm_at_sea(app: &mut App) {
    for event in SimulatedEventSource::drag((1, 2), (13, 2)) {
        app.handle_event(event);
    }
}

#[test]
fn drag_confirm_and_list() {
    let file = document();
    let (mut app, mut terminal) = loaded_app(Arc::new(FakeGenerator::echo()), &file);
    assert!(screen_text(&terminal).contains("storm at sea rages on"));

    drag_over_storm_at_sea(&mut app);
    let pending = app.session.annotations().pending().cloned().unwrap();
    assert_eq!(pending.text, "storm at sea");
    assert!(app.session.annotations().popup().visible);

    terminal.draw(|f| app.draw(f)).unwrap();
    assert!(screen_text(&terminal).contains("[y] Annotate"));

    app.handle_event(SimulatedEventSource::char_key('y'));
    assert_eq!(app.session.annotations().len(), 1);
    assert!(!app.session.annotations().popup().visible);
    assert_eq!(app.hud().map(|hud| hud.message()), Some("Annotated \"storm at sea\""));

    terminal.draw(|f| app.draw(f)).unwrap();
    let screen = screen_text(&terminal);
    assert!(screen.contains("Annotations (1)"));
    assert!(screen.contains("Page 1 •"));
    assert!(screen.contains("\"storm at sea\""));
}

#[test]
fn drag_across_a_soft_wrap_keeps_the_page_text() {
    let file = document();
    let generator = Arc::new(FakeGenerator::echo());
    let (mut app, terminal) =
        loaded_app_with(vec!["A great storm at sea raged"], 24, generator.clone(), &file);

    let (great_x, great_y) = cell_of(&terminal, "great", 2);
    let (sea_x, sea_y) = cell_of(&terminal, "sea", great_y + 1);
    for event in SimulatedEventSource::drag((great_x, great_y), (sea_x + 3, sea_y)) {
        app.handle_event(event);
    }

    let pending = app.session.annotations().pending().cloned().unwrap();
    assert_eq!(pending.text, "great storm at sea");

    app.handle_event(SimulatedEventSource::char_key('y'));
    let id = app.session.annotations().annotations()[0].id();
    app.session.generate_illustration(id);
    assert!(wait_for(|| {
        app.tick(Instant::now());
        matches!(app.session.illustration(id), IllustrationSlot::Ready(_))
    }));
    assert_eq!(generator.prompts(), vec!["great storm at sea".to_string()]);
}

#[test]
fn escape_cancels_pending_selection() {
    let file = document();
    let (mut app, _terminal) = loaded_app(Arc::new(FakeGenerator::echo()), &file);

    drag_over_storm_at_sea(&mut app);
    app.handle_event(SimulatedEventSource::key_event(KeyCode::Esc, KeyModifiers::empty()));

    assert!(app.session.annotations().pending().is_none());
    assert!(app.session.annotations().is_empty());
}

#[test]
fn annotations_follow_their_page() {
    let file = document();
    let (mut app, mut terminal) = loaded_app(Arc::new(FakeGenerator::echo()), &file);

    drag_over_storm_at_sea(&mut app);
    app.handle_event(SimulatedEventSource::char_key('y'));

    app.handle_event(SimulatedEventSource::char_key('n'));
    assert!(wait_for(|| {
        app.tick(Instant::now());
        app.session.page_text() == Some("calm waters")
    }));
    terminal.draw(|f| app.draw(f)).unwrap();
    let screen = screen_text(&terminal);
    assert!(screen.contains("Annotations (0)"));
    assert!(screen.contains("‹ Page 2 of 2"));
    assert!(!screen.contains("Page 2 of 2 ›"));

    app.handle_event(SimulatedEventSource::char_key('p'));
    assert!(wait_for(|| {
        app.tick(Instant::now());
        app.session.host().current_page == 1 && app.session.page_text().is_some()
    }));
    terminal.draw(|f| app.draw(f)).unwrap();
    assert!(screen_text(&terminal).contains("Annotations (1)"));
}

#[test]
fn generate_and_view_from_sidebar() {
    let file = document();
    let generator = Arc::new(FakeGenerator::echo());
    let (mut app, mut terminal) = loaded_app(generator.clone(), &file);

    drag_over_storm_at_sea(&mut app);
    app.handle_event(SimulatedEventSource::char_key('y'));
    terminal.draw(|f| app.draw(f)).unwrap();

    app.handle_event(SimulatedEventSource::key_event(KeyCode::Tab, KeyModifiers::empty()));
    assert_eq!(app.focused_panel, FocusedPanel::Annotations);
    let id = app.selected_annotation().unwrap();

    app.handle_event(SimulatedEventSource::char_key('g'));
    assert!(wait_for(|| {
        app.tick(Instant::now());
        matches!(app.session.illustration(id), IllustrationSlot::Ready(_))
    }));
    assert_eq!(generator.prompts(), vec!["storm at sea".to_string()]);

    app.handle_event(SimulatedEventSource::char_key('v'));
    assert_eq!(app.overlay().map(|o| o.annotation()), Some(id));
    terminal.draw(|f| app.draw(f)).unwrap();
    assert!(screen_text(&terminal).contains("Illustration"));

    app.handle_event(SimulatedEventSource::key_event(KeyCode::Esc, KeyModifiers::empty()));
    assert!(app.overlay().is_none());

    app.handle_event(SimulatedEventSource::char_key('d'));
    assert!(app.session.annotations().is_empty());
}

#[test]
fn clear_all_key_empties_the_list() {
    let file = document();
    let (mut app, _terminal) = loaded_app(Arc::new(FakeGenerator::echo()), &file);

    drag_over_storm_at_sea(&mut app);
    app.handle_event(SimulatedEventSource::char_key('y'));
    assert_eq!(app.session.annotations().len(), 1);

    app.handle_event(SimulatedEventSource::char_key('C'));
    assert!(app.session.annotations().is_empty());
    assert!(app.hud().is_some());
}

#[test]
fn event_loop_replays_a_session() {
    let file = document();
    let (mut app, mut terminal) = loaded_app(Arc::new(FakeGenerator::echo()), &file);

    let mut events = SimulatedEventSource::drag((1, 2), (13, 2));
    events.push(SimulatedEventSource::char_key('y'));
    events.push(SimulatedEventSource::char_key('q'));
    let mut source = SimulatedEventSource::new(events);

    run_app_with_event_source(&mut terminal, &mut app, &mut source).unwrap();
    assert_eq!(app.session.annotations().len(), 1);
    assert_eq!(app.session.annotations().annotations()[0].text(), "storm at sea");
    assert_eq!(source.remaining(), 0);
}

#[test]
fn quit_key_is_reported() {
    let file = document();
    let (mut app, _terminal) = loaded_app(Arc::new(FakeGenerator::echo()), &file);
    assert_eq!(
        app.handle_event(SimulatedEventSource::char_key('q')),
        Some(AppAction::Quit)
    );
}
