//! Placement of the reference popup relative to what opened it.
//!
//! The popup sits above its anchor, horizontally centered on it, separated by
//! `spacing` rows. The result is clamped so the popup is always fully visible
//! horizontally and never starts above the viewport.

use ratatui::layout::Position;
use ratatui::layout::Rect;
use ratatui::layout::Size;
use serde::Deserialize;
use serde::Serialize;

use crate::config::DEFAULT_POPUP_SPACING;

/// What the popup is glued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMode {
    /// Cell rectangle of the trigger character, when the text layout could
    /// report one.
    Glyph(Option<Rect>),
    /// Screen point of the control that opened the popup.
    Control(Position),
}

/// Anchor used when glyph metrics are unavailable, as an offset from the
/// viewport's bottom-left corner.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackAnchor {
    pub x: u16,
    pub bottom: u16,
}

impl Default for FallbackAnchor {
    fn default() -> Self {
        Self { x: 2, bottom: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPolicy {
    /// Rows left empty between the anchor and the popup's bottom edge.
    pub spacing: u16,
    pub fallback: FallbackAnchor,
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_POPUP_SPACING,
            fallback: FallbackAnchor::default(),
        }
    }
}

/// Top-left corner for a popup of `popup` size inside `viewport`.
pub fn compute_position(
    mode: AnchorMode,
    popup: Size,
    viewport: Size,
    policy: &AnchorPolicy,
) -> Position {
    let anchor = match mode {
        AnchorMode::Glyph(Some(glyph)) => Position::new(glyph.x, glyph.y),
        AnchorMode::Glyph(None) => {
            tracing::trace!("glyph metrics unavailable; using fallback anchor");
            Position::new(
                policy.fallback.x,
                viewport.height.saturating_sub(policy.fallback.bottom),
            )
        }
        AnchorMode::Control(point) => point,
    };

    let x = i32::from(anchor.x) - i32::from(popup.width) / 2;
    let y = i32::from(anchor.y) - i32::from(policy.spacing) - i32::from(popup.height);

    let max_x = (i32::from(viewport.width) - i32::from(popup.width)).max(0);
    Position::new(clamp_to_u16(x, 0, max_x), clamp_to_u16(y, 0, i32::from(u16::MAX)))
}

/// The popup's on-screen area: [`compute_position`] plus the popup size
/// trimmed to what fits in the viewport.
pub fn popup_area(mode: AnchorMode, popup: Size, viewport: Size, policy: &AnchorPolicy) -> Rect {
    let position = compute_position(mode, popup, viewport, policy);
    Rect::new(
        position.x,
        position.y,
        popup.width.min(viewport.width.saturating_sub(position.x)),
        popup.height.min(viewport.height.saturating_sub(position.y)),
    )
}

fn clamp_to_u16(value: i32, min: i32, max: i32) -> u16 {
    u16::try_from(value.clamp(min, max)).unwrap_or(u16::MAX)
}
