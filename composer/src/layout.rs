//! Glyph geometry for the draft, used to anchor the popup to the trigger.

use ratatui::layout::Rect;
use unicode_width::UnicodeWidthChar;

/// Maps byte offsets of the draft to on-screen cell rectangles.
pub trait TextLayout {
    /// Cell rectangle of the character starting at `offset`, or `None` when
    /// it is not currently visible or the offset is not a char boundary.
    fn bounding_box_of(&self, offset: usize) -> Option<Rect>;
}

/// Layout of `text` hard-wrapped at the width of `area`, with the first
/// `scroll_rows` wrapped rows scrolled out of view.
#[derive(Debug, Clone, Copy)]
pub struct WrappedTextLayout<'a> {
    pub text: &'a str,
    pub area: Rect,
    pub scroll_rows: u16,
}

impl<'a> WrappedTextLayout<'a> {
    pub fn new(text: &'a str, area: Rect) -> Self {
        Self {
            text,
            area,
            scroll_rows: 0,
        }
    }

    pub fn with_scroll(mut self, scroll_rows: u16) -> Self {
        self.scroll_rows = scroll_rows;
        self
    }

    /// Wrapped (row, column, width) of the char starting at `offset`.
    fn cell_of(&self, offset: usize) -> Option<(usize, u16, u16)> {
        let width = self.area.width;
        if width == 0 || !self.text.is_char_boundary(offset) {
            return None;
        }

        let mut row = 0usize;
        let mut col = 0u16;
        for (idx, ch) in self.text.char_indices() {
            let ch_width = if ch == '\n' {
                1
            } else {
                ch.width().unwrap_or(0) as u16
            };
            if ch != '\n' && col > 0 && col + ch_width > width {
                row += 1;
                col = 0;
            }
            if idx == offset {
                return Some((row, col, ch_width.max(1)));
            }
            if ch == '\n' {
                row += 1;
                col = 0;
            } else {
                col += ch_width;
            }
        }

        // The position just past the text is where the next char would go.
        (offset == self.text.len()).then(|| {
            if col >= width {
                (row + 1, 0, 1)
            } else {
                (row, col, 1)
            }
        })
    }
}

impl TextLayout for WrappedTextLayout<'_> {
    fn bounding_box_of(&self, offset: usize) -> Option<Rect> {
        let (row, col, width) = self.cell_of(offset)?;
        let visible_row = row.checked_sub(usize::from(self.scroll_rows))?;
        let visible_row = u16::try_from(visible_row).ok()?;
        if visible_row >= self.area.height {
            return None;
        }
        Some(Rect::new(
            self.area.x + col,
            self.area.y + visible_row,
            width.min(self.area.width.saturating_sub(col)).max(1),
            1,
        ))
    }
}
