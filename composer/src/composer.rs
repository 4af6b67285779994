use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::event::MouseEvent;
use ratatui::layout::Position;
use ratatui::layout::Rect;
use ratatui::layout::Size;
use tokio::sync::mpsc::UnboundedSender;

use crate::anchor::AnchorMode;
use crate::config::ComposerConfig;
use crate::index::ReferenceIndex;
use crate::index::SearchResult;
use crate::index::reference_for_result;
use crate::insertion::DraftBuffer;
use crate::insertion::Submission;
use crate::layout::TextLayout;
use crate::popup::PopupOrigin;
use crate::popup::PopupResponse;
use crate::popup::ReferencePopup;
use crate::search::SearchCompletion;
use crate::search::SearchCoordinator;
use crate::trigger::ActiveTrigger;
use crate::trigger::TriggerDetector;

/// Result returned when the user interacts with the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    Submitted(Submission),
    None,
}

/// Trigger the user dismissed with Esc; the popup stays closed until the
/// trigger offset or query changes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DismissedTrigger {
    offset: usize,
    query: String,
}

/// A message draft with reference autocompletion.
///
/// Single-threaded: the owner feeds key and mouse events plus the
/// [`SearchCompletion`]s it receives on the channel passed to [`Self::new`],
/// all from one event loop.
pub struct ReferenceComposer {
    config: ComposerConfig,
    detector: TriggerDetector,
    index: Arc<dyn ReferenceIndex>,
    completion_tx: UnboundedSender<SearchCompletion>,
    draft: DraftBuffer,
    popup: Option<ReferencePopup>,
    dismissed_trigger: Option<DismissedTrigger>,
    next_session: u64,
}

impl ReferenceComposer {
    pub fn new(
        config: ComposerConfig,
        index: Arc<dyn ReferenceIndex>,
        completion_tx: UnboundedSender<SearchCompletion>,
    ) -> Self {
        Self {
            detector: TriggerDetector::new(config.trigger),
            config,
            index,
            completion_tx,
            draft: DraftBuffer::new(),
            popup: None,
            dismissed_trigger: None,
            next_session: 0,
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn draft(&self) -> &DraftBuffer {
        &self.draft
    }

    pub fn popup(&self) -> Option<&ReferencePopup> {
        self.popup.as_ref()
    }

    pub fn is_popup_visible(&self) -> bool {
        self.popup.is_some()
    }

    /// Replace the draft, restoring chips from any inline markup in `text`.
    pub fn set_text(&mut self, text: &str) {
        self.draft = DraftBuffer::from_text(text);
        self.sync_popup();
    }

    /// Insert pasted or programmatic text at the cursor.
    pub fn insert_str(&mut self, text: &str) {
        self.draft.insert_str(text);
        self.sync_popup();
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.draft.set_cursor(cursor);
        self.sync_popup();
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> InputResult {
        if key_event.kind == KeyEventKind::Release {
            return InputResult::None;
        }

        if let Some(popup) = self.popup.as_mut() {
            match popup.handle_key_event(key_event) {
                PopupResponse::NotHandled => {}
                PopupResponse::Handled => return InputResult::None,
                PopupResponse::Commit(result) => {
                    self.commit(result);
                    return InputResult::None;
                }
                PopupResponse::Dismiss => {
                    self.dismiss_popup();
                    return InputResult::None;
                }
            }
            if matches!(popup.origin(), PopupOrigin::Action { .. }) {
                Self::edit_action_query(popup, key_event);
                return InputResult::None;
            }
        }

        self.handle_editing_key(key_event)
    }

    /// Returns `true` if the popup consumed the event.
    pub fn handle_mouse_event(&mut self, mouse_event: MouseEvent) -> bool {
        let Some(popup) = self.popup.as_mut() else {
            return false;
        };
        match popup.handle_mouse_event(mouse_event) {
            PopupResponse::NotHandled => false,
            PopupResponse::Handled => true,
            PopupResponse::Commit(result) => {
                self.commit(result);
                true
            }
            PopupResponse::Dismiss => {
                self.dismiss_popup();
                true
            }
        }
    }

    /// Open the popup from an explicit "add context" control at `anchor`.
    /// The chosen reference is inserted at the cursor.
    pub fn open_context_picker(&mut self, anchor: Position) {
        self.open_popup(PopupOrigin::Action { anchor }, "");
    }

    /// Route a finished search to the popup it belongs to.
    pub fn on_search_completion(&mut self, completion: SearchCompletion) -> bool {
        match self.popup.as_mut() {
            Some(popup) if popup.session() == completion.session => {
                popup.on_search_completion(completion)
            }
            _ => {
                tracing::trace!(
                    session = completion.session,
                    "dropping completion for a closed popup"
                );
                false
            }
        }
    }

    /// Close the popup unless a search is still pending.
    pub fn on_focus_lost(&mut self) {
        if self.popup.as_ref().is_some_and(|popup| !popup.is_searching()) {
            self.dismiss_popup();
        }
    }

    /// Lay out the popup inside `viewport`, anchored to the trigger glyph
    /// reported by `layout` or to the control that opened it.
    pub fn popup_area(&mut self, viewport: Size, layout: &dyn TextLayout) -> Option<Rect> {
        let popup = self.popup.as_mut()?;
        let anchor = match popup.origin() {
            PopupOrigin::Trigger { offset } => AnchorMode::Glyph(layout.bounding_box_of(*offset)),
            PopupOrigin::Action { anchor } => AnchorMode::Control(*anchor),
        };
        Some(popup.layout(anchor, viewport, &self.config.anchor))
    }

    fn handle_editing_key(&mut self, key_event: KeyEvent) -> InputResult {
        match key_event {
            KeyEvent {
                code: KeyCode::Enter,
                modifiers: KeyModifiers::NONE,
                ..
            } => {
                if self.draft.text().trim().is_empty() {
                    return InputResult::None;
                }
                self.popup = None;
                self.dismissed_trigger = None;
                return InputResult::Submitted(self.draft.take());
            }
            KeyEvent {
                code: KeyCode::Enter,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('j'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.draft.insert_newline(),
            KeyEvent {
                code: KeyCode::Backspace,
                ..
            } => self.draft.delete_backward(),
            KeyEvent {
                code: KeyCode::Left,
                ..
            } => self.draft.move_left(),
            KeyEvent {
                code: KeyCode::Right,
                ..
            } => self.draft.move_right(),
            KeyEvent {
                code: KeyCode::Home,
                ..
            } => self.draft.move_to_start(),
            KeyEvent {
                code: KeyCode::End, ..
            } => self.draft.move_to_end(),
            KeyEvent {
                code: KeyCode::Char(ch),
                modifiers,
                ..
            } if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                self.draft.insert_char(ch);
            }
            _ => return InputResult::None,
        }
        self.sync_popup();
        InputResult::None
    }

    fn edit_action_query(popup: &mut ReferencePopup, key_event: KeyEvent) {
        let mut query = popup.query().unwrap_or_default().to_string();
        match key_event {
            KeyEvent {
                code: KeyCode::Char(ch),
                modifiers,
                ..
            } if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                query.push(ch);
            }
            KeyEvent {
                code: KeyCode::Backspace,
                ..
            } => {
                query.pop();
            }
            _ => return,
        }
        popup.set_query(&query);
    }

    /// Open, update or close the trigger popup to match the cursor.
    fn sync_popup(&mut self) {
        if let Some(popup) = &self.popup
            && matches!(popup.origin(), PopupOrigin::Action { .. })
        {
            return;
        }

        let Some(ActiveTrigger { offset, query }) =
            self.detector.detect(self.draft.text(), self.draft.cursor())
        else {
            self.popup = None;
            self.dismissed_trigger = None;
            return;
        };

        let dismissed = DismissedTrigger { offset, query };
        if self.dismissed_trigger.as_ref() == Some(&dismissed) {
            return;
        }
        self.dismissed_trigger = None;
        let DismissedTrigger { offset, query } = dismissed;

        match self.popup.as_mut() {
            Some(popup)
                if matches!(popup.origin(), PopupOrigin::Trigger { offset: open } if *open == offset) =>
            {
                popup.set_query(&query);
            }
            _ => self.open_popup(PopupOrigin::Trigger { offset }, &query),
        }
    }

    fn open_popup(&mut self, origin: PopupOrigin, query: &str) {
        self.next_session += 1;
        tracing::debug!(session = self.next_session, ?origin, "opening reference popup");
        let search = SearchCoordinator::new(
            self.next_session,
            Arc::clone(&self.index),
            self.config.search,
            self.completion_tx.clone(),
        );
        let mut popup = ReferencePopup::new(origin, search, self.config.max_visible_rows);
        popup.set_query(query);
        self.popup = Some(popup);
    }

    fn dismiss_popup(&mut self) {
        let Some(popup) = self.popup.take() else {
            return;
        };
        if let PopupOrigin::Trigger { offset } = *popup.origin() {
            self.dismissed_trigger = Some(DismissedTrigger {
                offset,
                query: popup.query().unwrap_or_default().to_string(),
            });
        }
    }

    fn commit(&mut self, result: SearchResult) {
        let Some(popup) = self.popup.take() else {
            return;
        };
        let trigger_offset = match popup.origin() {
            PopupOrigin::Trigger { offset } => *offset,
            PopupOrigin::Action { .. } => self.draft.cursor(),
        };
        tracing::debug!(path = %result.relative_path, "inserting reference");
        self.index.record_use(&result);
        self.draft
            .insert_reference(trigger_offset, reference_for_result(&result));
        self.dismissed_trigger = None;
    }
}
