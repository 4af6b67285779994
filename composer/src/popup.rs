//! The reference popup: one open search session plus its selection.
//!
//! The popup never edits the draft. It turns key and mouse input into a
//! [`PopupResponse`], and the composer applies a committed result.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::event::MouseButton;
use crossterm::event::MouseEvent;
use crossterm::event::MouseEventKind;
use ratatui::buffer::Buffer;
use ratatui::layout::Position;
use ratatui::layout::Rect;
use ratatui::layout::Size;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Widget;
use ratatui::widgets::WidgetRef;
use unicode_width::UnicodeWidthStr;

use crate::anchor::AnchorMode;
use crate::anchor::AnchorPolicy;
use crate::anchor::popup_area;
use crate::index::SearchResult;
use crate::search::SearchCompletion;
use crate::search::SearchCoordinator;
use crate::selection::SelectionEvent;
use crate::selection::SelectionOutcome;
use crate::selection::SelectionState;

const MIN_POPUP_WIDTH: u16 = 24;
/// Gap between a row's label and its detail text.
const DETAIL_GAP: &str = "  ";
const SELECTED_PREFIX: &str = "› ";
const UNSELECTED_PREFIX: &str = "  ";
const INDEXING_BANNER: &str = "indexing…";

/// What opened the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupOrigin {
    /// Typing the trigger character at this byte offset of the draft.
    Trigger { offset: usize },
    /// An explicit "add context" control at this screen point.
    Action { anchor: Position },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupStatus {
    /// The index is still being built and nothing has matched yet.
    Indexing,
    Searching,
    NoMatches,
    Results,
}

impl PopupStatus {
    fn message(self) -> Option<&'static str> {
        match self {
            PopupStatus::Indexing => Some(INDEXING_BANNER),
            PopupStatus::Searching => Some("searching…"),
            PopupStatus::NoMatches => Some("no matches"),
            PopupStatus::Results => None,
        }
    }
}

/// One render-ready row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRow {
    pub label: String,
    /// Parent directory shown dimmed after the label.
    pub detail: Option<String>,
    /// Char indices into `label` to highlight.
    pub match_indices: Option<Vec<usize>>,
    pub is_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupResponse {
    /// The popup did not consume the input.
    NotHandled,
    Handled,
    Commit(SearchResult),
    Dismiss,
}

pub struct ReferencePopup {
    origin: PopupOrigin,
    search: SearchCoordinator,
    selection: SelectionState,
    scroll_top: usize,
    max_visible_rows: usize,
    /// Where the popup was last laid out, for mouse hit-testing.
    area: Option<Rect>,
}

impl ReferencePopup {
    pub fn new(origin: PopupOrigin, search: SearchCoordinator, max_visible_rows: usize) -> Self {
        Self {
            origin,
            search,
            selection: SelectionState::default(),
            scroll_top: 0,
            max_visible_rows: max_visible_rows.max(1),
            area: None,
        }
    }

    pub fn origin(&self) -> &PopupOrigin {
        &self.origin
    }

    pub fn session(&self) -> u64 {
        self.search.session()
    }

    pub fn query(&self) -> Option<&str> {
        self.search.query()
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn results(&self) -> &[SearchResult] {
        self.search.results()
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_searching()
    }

    pub fn set_query(&mut self, query: &str) {
        self.search.on_query_changed(query);
    }

    /// Apply a finished search. Returns `true` if the visible list changed.
    pub fn on_search_completion(&mut self, completion: SearchCompletion) -> bool {
        if !self.search.apply_completion(completion) {
            return false;
        }
        self.selection.reset_for_new_results();
        self.scroll_top = 0;
        true
    }

    pub fn status(&self) -> PopupStatus {
        if !self.results().is_empty() {
            PopupStatus::Results
        } else if self.is_indexing() {
            PopupStatus::Indexing
        } else if self.search.is_searching() {
            PopupStatus::Searching
        } else {
            PopupStatus::NoMatches
        }
    }

    /// `true` while the index is still being built. Results shown meanwhile
    /// may be partial and sit below an "indexing…" banner.
    pub fn is_indexing(&self) -> bool {
        !self.search.is_index_ready()
    }

    /// Rows above the results taken up by the indexing banner.
    fn banner_height(&self) -> usize {
        usize::from(self.status() == PopupStatus::Results && self.is_indexing())
    }

    /// Result the selection currently points at, if any.
    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.results().get(self.selection.effective_index())
    }

    /// Feed a selection event through the state machine.
    pub fn handle_selection_event(&mut self, event: SelectionEvent) -> PopupResponse {
        let count = self.results().len();
        match self.selection.handle(event, count) {
            SelectionOutcome::Handled => {
                if matches!(event, SelectionEvent::MoveUp | SelectionEvent::MoveDown) {
                    self.ensure_visible();
                }
                PopupResponse::Handled
            }
            SelectionOutcome::Commit(index) => match self.results().get(index) {
                Some(result) => PopupResponse::Commit(result.clone()),
                None => PopupResponse::Handled,
            },
            SelectionOutcome::Dismiss => PopupResponse::Dismiss,
        }
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> PopupResponse {
        if key_event.kind == KeyEventKind::Release {
            return PopupResponse::NotHandled;
        }
        let event = match key_event {
            KeyEvent {
                code: KeyCode::Up, ..
            }
            | KeyEvent {
                code: KeyCode::Char('p'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => SelectionEvent::MoveUp,
            KeyEvent {
                code: KeyCode::Down,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('n'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => SelectionEvent::MoveDown,
            KeyEvent {
                code: KeyCode::Tab, ..
            }
            | KeyEvent {
                code: KeyCode::Enter,
                modifiers: KeyModifiers::NONE,
                ..
            } => SelectionEvent::Commit,
            KeyEvent {
                code: KeyCode::Esc, ..
            } => SelectionEvent::Dismiss,
            _ => return PopupResponse::NotHandled,
        };
        self.handle_selection_event(event)
    }

    pub fn handle_mouse_event(&mut self, mouse_event: MouseEvent) -> PopupResponse {
        let Some(area) = self.area else {
            return PopupResponse::NotHandled;
        };
        let point = Position::new(mouse_event.column, mouse_event.row);
        let row = self.row_at(area, point);

        match mouse_event.kind {
            MouseEventKind::Moved => {
                if let Some(hovered) = self.selection.mouse_hover_index
                    && row != Some(hovered)
                {
                    self.handle_selection_event(SelectionEvent::HoverExit(hovered));
                }
                if let Some(index) = row {
                    self.handle_selection_event(SelectionEvent::HoverEnter(index));
                }
                if area.contains(point) {
                    PopupResponse::Handled
                } else {
                    PopupResponse::NotHandled
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if !area.contains(point) {
                    return self.handle_selection_event(SelectionEvent::Dismiss);
                }
                // A click commits the clicked row even when the keyboard
                // currently owns the selection.
                match row.and_then(|index| self.results().get(index)) {
                    Some(result) => PopupResponse::Commit(result.clone()),
                    None => PopupResponse::Handled,
                }
            }
            _ if area.contains(point) => PopupResponse::Handled,
            _ => PopupResponse::NotHandled,
        }
    }

    /// Index of the result under `point`, if any.
    fn row_at(&self, area: Rect, point: Position) -> Option<usize> {
        if !area.contains(point) || self.status() != PopupStatus::Results {
            return None;
        }
        let index = usize::from(point.y - area.y).checked_sub(self.banner_height())?;
        let index = self.scroll_top + index;
        (index < self.results().len()).then_some(index)
    }

    fn ensure_visible(&mut self) {
        let index = self.selection.effective_index();
        if index < self.scroll_top {
            self.scroll_top = index;
        } else if index >= self.scroll_top + self.max_visible_rows {
            self.scroll_top = index + 1 - self.max_visible_rows;
        }
    }

    /// Rows in the visible window.
    pub fn rows(&self) -> Vec<PopupRow> {
        let selected = self.selection.effective_index();
        self.results()
            .iter()
            .enumerate()
            .skip(self.scroll_top)
            .take(self.max_visible_rows)
            .map(|(index, result)| display_row(result, index == selected))
            .collect()
    }

    /// Size the popup wants, no wider than `max_width`.
    pub fn desired_size(&self, max_width: u16) -> Size {
        let content_width = match self.status().message() {
            Some(message) => message.width(),
            None => self
                .rows()
                .iter()
                .map(|row| {
                    SELECTED_PREFIX.width()
                        + row.label.width()
                        + row
                            .detail
                            .as_ref()
                            .map(|detail| DETAIL_GAP.width() + detail.width())
                            .unwrap_or(0)
                })
                .chain(
                    (self.banner_height() > 0)
                        .then(|| INDEXING_BANNER.width()),
                )
                .max()
                .unwrap_or(0),
        };
        let width = u16::try_from(content_width + 2)
            .unwrap_or(u16::MAX)
            .max(MIN_POPUP_WIDTH)
            .min(max_width);
        let height = match self.status() {
            PopupStatus::Results => {
                self.results().len().min(self.max_visible_rows) + self.banner_height()
            }
            _ => 1,
        };
        Size::new(width, u16::try_from(height).unwrap_or(u16::MAX))
    }

    /// Place the popup for `anchor` inside `viewport` and remember the area
    /// for mouse hit-testing.
    pub fn layout(&mut self, anchor: AnchorMode, viewport: Size, policy: &AnchorPolicy) -> Rect {
        let area = popup_area(anchor, self.desired_size(viewport.width), viewport, policy);
        self.area = Some(area);
        area
    }

    pub fn area(&self) -> Option<Rect> {
        self.area
    }
}

fn display_row(result: &SearchResult, is_selected: bool) -> PopupRow {
    let path = result.relative_path.trim_end_matches('/');
    let (parent, name) = match path.rsplit_once('/') {
        Some((parent, name)) => (Some(parent), name),
        None => (None, path),
    };
    let mut label = name.to_string();
    if result.is_directory {
        label.push('/');
    }
    let name_start = parent.map(|parent| parent.chars().count() + 1).unwrap_or(0);
    let match_indices = result.indices.as_ref().map(|indices| {
        indices
            .iter()
            .filter_map(|&idx| (idx as usize).checked_sub(name_start))
            .collect::<Vec<_>>()
    });

    PopupRow {
        label,
        detail: parent.filter(|parent| !parent.is_empty()).map(str::to_string),
        match_indices,
        is_selected,
    }
}

impl WidgetRef for ReferencePopup {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        if let Some(message) = self.status().message() {
            status_line(message).render(area, buf);
            return;
        }

        let mut top = area.top();
        if self.banner_height() > 0 && top < area.bottom() {
            status_line(INDEXING_BANNER).render(Rect::new(area.x, top, area.width, 1), buf);
            top += 1;
        }
        for (row, y) in self.rows().into_iter().zip(top..area.bottom()) {
            let line_area = Rect::new(area.x, y, area.width, 1);
            render_row(&row).render(line_area, buf);
        }
    }
}

fn status_line(message: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!(" {message}"),
        Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
    ))
}

fn render_row(row: &PopupRow) -> Line<'static> {
    let base = if row.is_selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let prefix = if row.is_selected {
        SELECTED_PREFIX
    } else {
        UNSELECTED_PREFIX
    };
    let mut spans = vec![Span::styled(prefix, base)];

    let highlighted = row.match_indices.as_deref().unwrap_or(&[]);
    for (idx, ch) in row.label.chars().enumerate() {
        let style = if highlighted.contains(&idx) {
            base.add_modifier(Modifier::BOLD)
        } else {
            base
        };
        spans.push(Span::styled(ch.to_string(), style));
    }
    if let Some(detail) = &row.detail {
        spans.push(Span::styled(DETAIL_GAP, base));
        spans.push(Span::styled(
            detail.clone(),
            base.add_modifier(Modifier::DIM),
        ));
    }
    Line::from(spans)
}
