//! Reference autocompletion for a chat message draft.
//!
//! Typing the trigger character (`@` by default) at the start of a word opens
//! a popup that searches a [`ReferenceIndex`] as the user keeps typing.
//! Choosing a result replaces the trigger span with inline markup such as
//! `[@read.ts](claude-context://file/src/read.ts)` and records it as an
//! [`Annotation`] on the [`DraftBuffer`].
//!
//! [`ReferenceComposer`] wires the pieces together; each piece is also usable
//! on its own.

mod anchor;
mod composer;
mod config;
mod index;
mod insertion;
mod layout;
mod popup;
mod search;
mod selection;
mod trigger;

pub use anchor::AnchorMode;
pub use anchor::AnchorPolicy;
pub use anchor::FallbackAnchor;
pub use anchor::compute_position;
pub use anchor::popup_area;
pub use composer::InputResult;
pub use composer::ReferenceComposer;
pub use config::ComposerConfig;
pub use config::ComposerConfigToml;
pub use config::ConfigError;
pub use index::ReferenceIndex;
pub use index::SearchResult;
pub use index::reference_for_result;
pub use insertion::Annotation;
pub use insertion::DraftBuffer;
pub use insertion::Insertion;
pub use insertion::Submission;
pub use insertion::insert_reference;
pub use insertion::insert_reference_markup;
pub use insertion::replace_range;
pub use insertion::shift_annotations;
pub use layout::TextLayout;
pub use layout::WrappedTextLayout;
pub use popup::PopupOrigin;
pub use popup::PopupResponse;
pub use popup::PopupRow;
pub use popup::PopupStatus;
pub use popup::ReferencePopup;
pub use search::SearchCompletion;
pub use search::SearchCoordinator;
pub use search::SearchPolicy;
pub use selection::SelectionEvent;
pub use selection::SelectionOutcome;
pub use selection::SelectionState;
pub use trigger::ActiveTrigger;
pub use trigger::TriggerDetector;
