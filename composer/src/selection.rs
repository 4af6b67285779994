//! Hybrid keyboard/mouse selection over the popup's result list.
//!
//! Keyboard navigation and mouse hover each track their own row; the row that
//! is actually "selected" depends on which input was used last. Once a
//! directional key is pressed the keyboard row wins, even if the mouse is
//! still resting over a different row, until the mouse moves onto another row.

/// Input the selection reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    MoveUp,
    MoveDown,
    HoverEnter(usize),
    HoverExit(usize),
    Commit,
    Dismiss,
}

/// What the owner of the selection should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The event was consumed; the selection may or may not have changed.
    Handled,
    /// Insert the result at this index.
    Commit(usize),
    /// Close the popup and drop the selection.
    Dismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    pub keyboard_index: usize,
    pub mouse_hover_index: Option<usize>,
    pub is_keyboard_mode: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            keyboard_index: 0,
            mouse_hover_index: None,
            is_keyboard_mode: false,
        }
    }
}

impl SelectionState {
    /// The row that is visually selected and that a commit would insert.
    pub fn effective_index(&self) -> usize {
        if self.is_keyboard_mode {
            return self.keyboard_index;
        }
        self.mouse_hover_index.unwrap_or(self.keyboard_index)
    }

    /// Apply `event` to a list of `result_count` rows, returning the next
    /// state and what the caller should do.
    pub fn transition(self, event: SelectionEvent, result_count: usize) -> (Self, SelectionOutcome) {
        let mut next = self;
        let outcome = match event {
            SelectionEvent::MoveUp => {
                next.is_keyboard_mode = true;
                if result_count > 0 {
                    next.keyboard_index = self.keyboard_index.min(result_count - 1).saturating_sub(1);
                }
                SelectionOutcome::Handled
            }
            SelectionEvent::MoveDown => {
                next.is_keyboard_mode = true;
                if result_count > 0 {
                    next.keyboard_index = (self.keyboard_index + 1).min(result_count - 1);
                }
                SelectionOutcome::Handled
            }
            SelectionEvent::HoverEnter(index) => {
                // Re-entering the row already under the mouse is not a mouse
                // move and must not take the selection back from the keyboard.
                if self.mouse_hover_index != Some(index) {
                    next.mouse_hover_index = Some(index);
                    next.is_keyboard_mode = false;
                }
                SelectionOutcome::Handled
            }
            SelectionEvent::HoverExit(index) => {
                if self.mouse_hover_index == Some(index) {
                    next.mouse_hover_index = None;
                }
                SelectionOutcome::Handled
            }
            SelectionEvent::Commit => {
                let index = self.effective_index();
                if index < result_count {
                    SelectionOutcome::Commit(index)
                } else {
                    SelectionOutcome::Handled
                }
            }
            SelectionEvent::Dismiss => SelectionOutcome::Dismiss,
        };
        (next, outcome)
    }

    /// In-place form of [`SelectionState::transition`].
    pub fn handle(&mut self, event: SelectionEvent, result_count: usize) -> SelectionOutcome {
        let (next, outcome) = self.transition(event, result_count);
        *self = next;
        outcome
    }

    /// Called whenever a new result list replaces the old one.
    pub fn reset_for_new_results(&mut self) {
        self.keyboard_index = 0;
        self.mouse_hover_index = None;
    }
}
