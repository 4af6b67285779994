#![allow(clippy::unwrap_used)]

use std::time::Duration;

use ctxref_composer::ComposerConfig;
use ctxref_composer::FallbackAnchor;
use ctxref_composer::WrappedTextLayout;
use pretty_assertions::assert_eq;
use ratatui::layout::Rect;
use ratatui::layout::Size;

use super::support::Harness;
use super::support::ScriptedIndex;

const CONFIG: &str = r##"
[context_references]
trigger = "#"
debounce_ms = 0
match_limit = 2
popup_spacing = 0
fallback_anchor = { x = 10, bottom = 1 }
"##;

#[tokio::test(start_paused = true)]
async fn configured_trigger_and_limits_apply() {
    let config = ComposerConfig::from_toml_str(CONFIG).unwrap();
    assert_eq!(config.anchor.fallback, FallbackAnchor { x: 10, bottom: 1 });

    let index = ScriptedIndex::default().with("m", Duration::ZERO, &["m1", "m2", "m3"]);
    let mut harness = Harness::new(config, index);

    harness.type_str("@m");
    assert!(!harness.composer.is_popup_visible());

    harness.type_str(" #m");
    harness.settle().await;
    assert_eq!(harness.composer.popup().unwrap().results().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn configured_fallback_anchor_is_used_without_glyph_metrics() {
    let config = ComposerConfig::from_toml_str(CONFIG).unwrap();
    let mut harness = Harness::new(config, ScriptedIndex::default());
    harness.type_str("#");

    // A layout with no room reports no glyph boxes.
    let layout = WrappedTextLayout::new("#", Rect::new(0, 0, 0, 0));
    let area = harness
        .composer
        .popup_area(Size::new(100, 30), &layout)
        .unwrap();
    // Anchor (10, 29); one status row directly above it.
    assert_eq!(area.y, 28);
    assert_eq!(area.x, 0);
}
