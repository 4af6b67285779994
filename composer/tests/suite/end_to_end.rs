#![allow(clippy::unwrap_used)]

use std::time::Duration;

use crossterm::event::KeyCode;
use crossterm::event::KeyModifiers;
use crossterm::event::MouseButton;
use crossterm::event::MouseEvent;
use crossterm::event::MouseEventKind;
use ctxref_composer::ComposerConfig;
use ctxref_composer::InputResult;
use ctxref_composer::PopupStatus;
use ctxref_composer::SearchPolicy;
use ctxref_composer::WrappedTextLayout;
use ctxref_uri::ContextReference;
use ctxref_uri::decode_reference;
use ctxref_uri::parse_inline_references;
use pretty_assertions::assert_eq;
use ratatui::layout::Rect;
use ratatui::layout::Size;

use super::support::Harness;
use super::support::ScriptedIndex;
use super::support::results;

fn config(debounce: Duration) -> ComposerConfig {
    ComposerConfig {
        search: SearchPolicy {
            debounce,
            ..SearchPolicy::default()
        },
        ..ComposerConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn check_read_inserts_file_reference() {
    let index = ScriptedIndex::default().with("read", Duration::from_millis(5), &["src/read.ts"]);
    let mut harness = Harness::new(config(Duration::from_millis(50)), index);

    harness.type_str("check @read");
    let popup = harness.composer.popup().unwrap();
    assert_eq!(popup.query(), Some("read"));
    assert_eq!(popup.status(), PopupStatus::Searching);

    harness.settle().await;
    assert_eq!(
        harness.composer.popup().unwrap().status(),
        PopupStatus::Results
    );
    harness.press(KeyCode::Enter);

    let text = harness.composer.draft().text().to_string();
    assert_eq!(text, "check [@read.ts](claude-context://file/src/read.ts)");
    assert_eq!(harness.composer.draft().cursor(), text.len());

    let found = parse_inline_references(&text);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].range.start, 6);
    assert_eq!(
        decode_reference("claude-context://file/src/read.ts"),
        Some(ContextReference::file("src/read.ts"))
    );
    assert_eq!(
        *harness.index.used.lock().unwrap(),
        vec!["src/read.ts".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_first_query_never_replaces_later_results() {
    let index = ScriptedIndex::default()
        .with("a", Duration::from_millis(500), &["a-slow.rs"])
        .with("ab", Duration::from_millis(10), &["ab-fast.rs"]);
    let mut harness = Harness::new(config(Duration::ZERO), index);

    harness.type_str("@a");
    // Let "a" reach the index before the next keystroke.
    tokio::time::sleep(Duration::from_millis(1)).await;
    harness.type_str("b");

    let first = harness.completions.recv().await.unwrap();
    assert_eq!(first.query, "ab");
    assert!(harness.composer.on_search_completion(first));

    let second = harness.completions.recv().await.unwrap();
    assert_eq!(second.query, "a");
    assert!(!harness.composer.on_search_completion(second));

    assert_eq!(harness.composer.popup().unwrap().results(), results(&["ab-fast.rs"]).as_slice());
}

#[tokio::test(start_paused = true)]
async fn empty_query_shows_recent_entries() {
    let index = ScriptedIndex::default();
    *index.recent.lock().unwrap() = results(&["recent.rs"]);
    let mut harness = Harness::new(config(Duration::from_millis(50)), index);

    harness.type_str("look at @");
    harness.settle().await;
    let rows = harness.composer.popup().unwrap().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].label, "recent.rs");
}

#[tokio::test(start_paused = true)]
async fn unknown_query_degrades_to_no_matches() {
    let mut harness = Harness::new(config(Duration::ZERO), ScriptedIndex::default());
    harness.type_str("@nothing");
    harness.settle().await;
    assert_eq!(
        harness.composer.popup().unwrap().status(),
        PopupStatus::NoMatches
    );
    // Enter with nothing selectable is consumed and inserts nothing.
    assert_eq!(harness.press(KeyCode::Enter), InputResult::None);
    assert_eq!(harness.composer.draft().text(), "@nothing");
}

#[tokio::test(start_paused = true)]
async fn keyboard_wins_over_resting_mouse_until_it_moves() {
    let index = ScriptedIndex::default().with("x", Duration::ZERO, &["x0", "x1", "x2", "x3"]);
    let mut harness = Harness::new(config(Duration::ZERO), index);
    harness.type_str("@x");
    harness.settle().await;

    let text = harness.composer.draft().text().to_string();
    let layout = WrappedTextLayout::new(&text, Rect::new(0, 20, 80, 2));
    let area = harness
        .composer
        .popup_area(Size::new(80, 24), &layout)
        .unwrap();
    let hover = |row: u16| MouseEvent {
        kind: MouseEventKind::Moved,
        column: area.x + 2,
        row: area.y + row,
        modifiers: KeyModifiers::NONE,
    };

    assert!(harness.composer.handle_mouse_event(hover(2)));
    harness.press(KeyCode::Down);
    // The mouse twitches without leaving row 2.
    harness.composer.handle_mouse_event(hover(2));
    let selection = harness.composer.popup().unwrap().selection();
    assert!(selection.is_keyboard_mode);
    assert_eq!(selection.effective_index(), 1);

    harness.composer.handle_mouse_event(hover(3));
    let selection = harness.composer.popup().unwrap().selection();
    assert!(!selection.is_keyboard_mode);
    assert_eq!(selection.effective_index(), 3);

    assert!(harness.composer.handle_mouse_event(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: area.x + 2,
        row: area.y,
        modifiers: KeyModifiers::NONE,
    }));
    assert_eq!(
        harness.composer.draft().text(),
        "[@x0](claude-context://file/x0)"
    );
}

#[tokio::test(start_paused = true)]
async fn newline_and_second_reference_keep_first_chip_aligned() {
    let index = ScriptedIndex::default()
        .with("a", Duration::ZERO, &["a.rs"])
        .with("b", Duration::ZERO, &["dir/b.rs"]);
    let mut harness = Harness::new(config(Duration::ZERO), index);

    harness.type_str("@a");
    harness.settle().await;
    harness.press(KeyCode::Tab);
    harness.press_with(KeyCode::Enter, KeyModifiers::SHIFT);
    harness.type_str("and @b");
    harness.settle().await;
    harness.press(KeyCode::Enter);

    // Put a newline in front of both chips.
    harness.composer.set_cursor(0);
    harness.press_with(KeyCode::Char('j'), KeyModifiers::CONTROL);

    let draft = harness.composer.draft();
    let chips: Vec<&str> = draft
        .annotations()
        .iter()
        .map(|annotation| &draft.text()[annotation.range.clone()])
        .collect();
    assert_eq!(
        chips,
        vec![
            "[@a.rs](claude-context://file/a.rs)",
            "[@b.rs](claude-context://file/dir/b.rs)",
        ]
    );

    let InputResult::Submitted(submission) = harness.press(KeyCode::Enter) else {
        panic!("expected the draft to be submitted");
    };
    assert_eq!(
        submission.references,
        vec![
            ContextReference::file("a.rs"),
            ContextReference::file("dir/b.rs"),
        ]
    );
}
