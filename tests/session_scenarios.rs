use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pagelight::ViewerSession;
use pagelight::annotations::{AnnotationId, Bounds};
use pagelight::illustration::{GenerationError, IllustrationSlot};
use pagelight::settings::Settings;
use pagelight::test_utils::{FakeGenerator, FakeRenderer, FakeSelection, wait_for};
use tempfile::NamedTempFile;

const VIEWPORT: Bounds = Bounds::new(10.0, 5.0, 60.0, 20.0);

struct Harness {
    session: ViewerSession,
    selection: FakeSelection,
    generator: Arc<FakeGenerator>,
    _document: NamedTempFile,
}

impl Harness {
    fn new(pages: Vec<&str>, generator: FakeGenerator) -> Self {
        let generator = Arc::new(generator);
        let mut harness = Self {
            session: ViewerSession::new(
                &Settings::default(),
                FakeRenderer::factory(pages),
                generator.clone(),
            ),
            selection: FakeSelection::empty(VIEWPORT),
            generator,
            _document: document(),
        };
        assert!(harness.settle(|s| s.host().is_ready()));
        harness
    }

    fn loaded(pages: Vec<&str>, generator: FakeGenerator) -> Self {
        let mut harness = Self::new(pages, generator);
        let path = harness._document.path().to_path_buf();
        harness.session.open_document(&path).unwrap();
        assert!(harness.settle(|s| s.page_text().is_some()));
        harness
    }

    /// Tick until `condition` holds
    fn settle(&mut self, condition: impl Fn(&ViewerSession) -> bool) -> bool {
        wait_for(|| {
            self.session.tick(Instant::now(), &mut self.selection);
            condition(&self.session)
        })
    }

    fn go_to(&mut self, page: usize) {
        self.session.go_to_page(page);
        assert!(self.settle(|s| s.host().current_page == page && s.page_text().is_some()));
    }

    fn annotate(&mut self, text: &str) -> AnnotationId {
        self.selection.select(text, Bounds::new(14.0, 8.0, 12.0, 1.0));
        self.session.pointer_released(&self.selection);
        self.session.confirm_selection(Instant::now()).unwrap()
    }
}

fn document() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "placeholder").unwrap();
    file
}

#[test]
fn annotation_lands_on_the_page_it_was_made_on() {
    let mut h = Harness::loaded(vec!["one", "storm at sea", "three"], FakeGenerator::echo());
    assert_eq!(h.session.host().page_count, Some(3));

    h.go_to(2);
    assert_eq!(h.session.page_text(), Some("storm at sea"));
    h.annotate("storm at sea");

    let all = h.session.annotations().annotations();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].page(), 2);
    assert_eq!(all[0].text(), "storm at sea");

    h.go_to(1);
    assert!(h.session.visible_annotations().is_empty());
    assert!(h.session.annotations().for_page(1).is_empty());
    assert_eq!(h.session.annotations().for_page(2).len(), 1);
}

#[test]
fn missing_credential_fails_without_loading() {
    let mut h = Harness::loaded(vec!["page"], FakeGenerator::without_credential());
    let id = h.annotate("storm at sea");

    assert!(h.session.generate_illustration(id).is_none());
    match h.session.illustration(id) {
        IllustrationSlot::Failed(message) => assert!(message.contains("STABILITY_API_KEY")),
        other => panic!("expected failed slot, got {other:?}"),
    }
    assert_eq!(h.session.illustrations().in_flight(), 0);
    assert!(h.generator.prompts().is_empty());
}

#[test]
fn concurrent_requests_fill_their_own_slots() {
    let mut h = Harness::loaded(vec!["page"], FakeGenerator::gated());
    let storm = h.annotate("storm at sea");
    let dawn = h.annotate("dawn light");
    assert_ne!(storm, dawn);

    h.session.generate_illustration(storm).unwrap();
    h.session.generate_illustration(dawn).unwrap();
    assert!(h.session.illustration(storm).is_loading());
    assert!(h.session.illustration(dawn).is_loading());

    let generator = h.generator.clone();
    assert!(wait_for(|| generator.prompts().len() == 2));

    h.generator.release("dawn light");
    assert!(h.settle(|s| s.illustration(dawn).image().is_some()));
    assert!(h.session.illustration(storm).is_loading());
    assert_eq!(
        h.session.illustration(dawn).image(),
        Some(&FakeGenerator::image_for("dawn light"))
    );

    h.generator.release("storm at sea");
    assert!(h.settle(|s| s.illustration(storm).image().is_some()));
    assert_eq!(
        h.session.illustration(storm).image(),
        Some(&FakeGenerator::image_for("storm at sea"))
    );
    assert_eq!(
        h.session.illustration(dawn).image(),
        Some(&FakeGenerator::image_for("dawn light"))
    );
}

#[test]
fn failed_request_only_touches_its_own_slot() {
    let mut h = Harness::loaded(
        vec!["page"],
        FakeGenerator::failing(GenerationError::Http {
            status: 500,
            body: "overloaded".into(),
        }),
    );
    let first = h.annotate("storm at sea");
    let second = h.annotate("dawn light");

    h.session.generate_illustration(first).unwrap();
    assert!(h.settle(|s| !s.illustration(first).is_loading()));

    assert!(
        h.session
            .illustration(first)
            .error()
            .is_some_and(|e| e.contains("overloaded"))
    );
    assert_eq!(h.session.illustration(second), &IllustrationSlot::Absent);
}

#[test]
fn clear_all_while_request_in_flight_is_harmless() {
    let mut h = Harness::loaded(vec!["page"], FakeGenerator::gated());
    let id = h.annotate("storm at sea");
    h.session.generate_illustration(id).unwrap();

    h.session.clear_annotations();
    assert!(h.session.annotations().is_empty());

    h.generator.release_all();
    assert!(h.settle(|s| s.illustrations().in_flight() == 0));

    assert!(h.session.annotations().is_empty());
    assert!(h.session.visible_annotations().is_empty());
    assert!(h.session.host().error.is_none());
}

#[test]
fn count_tracks_confirms_and_removes() {
    let mut h = Harness::loaded(vec!["page"], FakeGenerator::echo());
    let a = h.annotate("a");
    h.annotate("b");
    h.annotate("c");
    assert_eq!(h.session.annotations().len(), 3);

    assert!(h.session.remove_annotation(a));
    assert!(!h.session.remove_annotation(a));
    assert!(!h.session.remove_annotation(AnnotationId::new(1)));
    assert_eq!(h.session.annotations().len(), 2);

    h.session.clear_annotations();
    assert_eq!(h.session.annotations().len(), 0);
    assert!(h.session.annotations().last_confirmed().is_none());
}

#[test]
fn annotations_are_not_changed_by_later_actions() {
    let mut h = Harness::loaded(vec!["one", "two", "three"], FakeGenerator::echo());
    h.go_to(3);
    let id = h.annotate("storm at sea");
    let before = h.session.annotations().get(id).unwrap().clone();

    h.go_to(1);
    let other = h.annotate("calm");
    h.session.generate_illustration(id).unwrap();
    assert!(h.settle(|s| s.illustration(id).image().is_some()));
    h.session.remove_annotation(other);
    h.go_to(2);

    let after = h.session.annotations().get(id).unwrap();
    assert_eq!(after.page(), before.page());
    assert_eq!(after.anchor(), before.anchor());
    assert_eq!(after.text(), before.text());
    assert_eq!(after.created_at(), before.created_at());
}

#[test]
fn page_listing_is_newest_first_and_stable() {
    let mut h = Harness::loaded(vec!["page"], FakeGenerator::echo());
    let ids: Vec<_> = ["a", "b", "c"].iter().map(|t| h.annotate(t)).collect();

    let once: Vec<_> = h.session.visible_annotations().iter().map(|a| a.id()).collect();
    let twice: Vec<_> = h.session.visible_annotations().iter().map(|a| a.id()).collect();
    assert_eq!(once, twice);
    assert_eq!(once, ids.into_iter().rev().collect::<Vec<_>>());
}

#[test]
fn confirm_without_selection_is_a_no_op() {
    let mut h = Harness::loaded(vec!["page"], FakeGenerator::echo());
    h.annotate("first");
    assert!(h.session.confirm_selection(Instant::now()).is_none());
    assert_eq!(h.session.annotations().len(), 1);
}

#[test]
fn cancel_always_hides_the_popup() {
    let mut h = Harness::loaded(vec!["page"], FakeGenerator::echo());
    h.session.cancel_selection(Instant::now());
    assert!(h.session.annotations().pending().is_none());
    assert!(!h.session.annotations().popup().visible);

    h.selection.select("storm", Bounds::new(14.0, 8.0, 5.0, 1.0));
    h.session.pointer_released(&h.selection);
    assert!(h.session.annotations().popup().visible);

    h.session.cancel_selection(Instant::now());
    assert!(h.session.annotations().pending().is_none());
    assert!(!h.session.annotations().popup().visible);
    assert!(h.session.annotations().is_empty());
}

#[test]
fn native_selection_is_cleared_after_a_short_delay() {
    let mut h = Harness::loaded(vec!["page"], FakeGenerator::echo());
    h.selection.select("storm", Bounds::new(14.0, 8.0, 5.0, 1.0));
    h.session.pointer_released(&h.selection);

    let confirmed_at = Instant::now();
    h.session.confirm_selection(confirmed_at).unwrap();

    h.session
        .tick(confirmed_at + Duration::from_millis(50), &mut h.selection);
    assert_eq!(h.selection.clears(), 0);

    h.session
        .tick(confirmed_at + Duration::from_millis(150), &mut h.selection);
    assert_eq!(h.selection.clears(), 1);
}

#[test]
fn selection_before_load_is_ignored() {
    let mut h = Harness::new(vec!["page"], FakeGenerator::echo());
    h.selection.select("storm", Bounds::new(14.0, 8.0, 5.0, 1.0));
    h.session.pointer_released(&h.selection);
    assert!(h.session.annotations().pending().is_none());
    assert!(!h.session.annotations().popup().visible);
}

#[test]
fn loading_another_document_resets_annotations() {
    let mut h = Harness::loaded(vec!["one", "two"], FakeGenerator::gated());
    h.go_to(2);
    let id = h.annotate("storm at sea");
    h.session.generate_illustration(id).unwrap();

    let next = document();
    h.session.open_document(next.path()).unwrap();
    assert!(h.settle(|s| s.page_text().is_some()));

    assert!(h.session.annotations().is_empty());
    assert_eq!(h.session.host().current_page, 1);
    assert!(h.session.illustrations().slots().is_empty());

    h.generator.release_all();
    assert!(wait_for(|| h.generator.completed() == 1));
    h.session.tick(Instant::now(), &mut h.selection);
    assert!(h.session.illustrations().slots().is_empty());
}

#[test]
fn unavailable_renderer_refuses_documents() {
    let generator: Arc<FakeGenerator> = Arc::new(FakeGenerator::echo());
    let mut session = ViewerSession::new(
        &Settings::default(),
        FakeRenderer::broken_factory("worker script missing"),
        generator,
    );
    let mut selection = FakeSelection::empty(VIEWPORT);
    assert!(wait_for(|| {
        session.tick(Instant::now(), &mut selection);
        session.host().error.is_some()
    }));

    let file = document();
    session.open_document(file.path()).unwrap();
    assert!(session.host().document.is_none());
    assert!(
        session
            .host()
            .error
            .as_deref()
            .is_some_and(|e| e.contains("worker script missing"))
    );
}

#[test]
fn failed_decode_can_be_retried() {
    let mut h = Harness::new(vec![], FakeGenerator::echo());
    let path = h._document.path().to_path_buf();
    h.session.open_document(&path).unwrap();
    assert!(h.settle(|s| s.host().error.is_some()));
    assert!(
        h.session
            .host()
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Failed to load document"))
    );

    h.session.retry();
    assert!(h.session.host().error.is_none());
    assert!(h.settle(|s| s.host().error.is_some()));
    assert_eq!(
        h.session.host().document.as_ref().map(|d| d.path.clone()),
        Some(path)
    );
}

#[test]
fn missing_file_is_reported() {
    let mut h = Harness::new(vec!["page"], FakeGenerator::echo());
    let err = h
        .session
        .open_document(std::path::Path::new("/definitely/not/here.txt"))
        .unwrap_err();
    assert!(err.to_string().contains("not/here.txt"));
    assert!(h.session.host().document.is_none());
}
