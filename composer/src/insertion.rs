//! Text edits that keep reference annotations in sync with the draft.
//!
//! Every mutation of a draft goes through [`replace_range`], which in turn
//! routes all offset arithmetic through [`shift_annotations`].

use std::ops::Range;

use ctxref_uri::ContextReference;
use ctxref_uri::parse_inline_references;
use ctxref_utils_string::clamp_to_char_boundary;
use ctxref_utils_string::next_char_boundary;
use ctxref_utils_string::prev_char_boundary;

use crate::index::SearchResult;
use crate::index::reference_for_result;

/// A reference chip occupying `range` (byte offsets) of the draft text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub range: Range<usize>,
    pub reference: ContextReference,
}

/// Result of an edit: the new text, cursor and annotation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub text: String,
    pub cursor: usize,
    pub annotations: Vec<Annotation>,
}

/// Move every annotation starting at or after `edit_point` by `delta` bytes.
///
/// Annotations ending at or before `edit_point` are untouched. An annotation
/// that straddles `edit_point` had its own text edited and is dropped.
pub fn shift_annotations(
    annotations: &[Annotation],
    edit_point: usize,
    delta: isize,
) -> Vec<Annotation> {
    annotations
        .iter()
        .filter_map(|annotation| {
            let Range { start, end } = annotation.range;
            if start >= edit_point {
                let start = start.checked_add_signed(delta)?;
                let end = end.checked_add_signed(delta)?;
                Some(Annotation {
                    range: start..end,
                    reference: annotation.reference.clone(),
                })
            } else if end <= edit_point {
                Some(annotation.clone())
            } else {
                None
            }
        })
        .collect()
}

/// Replace `range` of `text` with `replacement`.
///
/// Annotations overlapping the replaced span, or strictly containing an empty
/// span, are removed; the rest are shifted by the length delta. The returned
/// cursor sits just past the replacement.
pub fn replace_range(
    text: &str,
    annotations: &[Annotation],
    range: Range<usize>,
    replacement: &str,
) -> Insertion {
    let start = clamp_to_char_boundary(text, range.start);
    let end = clamp_to_char_boundary(text, range.end.max(start));

    let kept: Vec<Annotation> = annotations
        .iter()
        .filter(|annotation| !touches(&annotation.range, start, end))
        .cloned()
        .collect();
    let delta = replacement.len() as isize - (end - start) as isize;

    let mut new_text = String::with_capacity(text.len() - (end - start) + replacement.len());
    new_text.push_str(&text[..start]);
    new_text.push_str(replacement);
    new_text.push_str(&text[end..]);

    Insertion {
        text: new_text,
        cursor: start + replacement.len(),
        annotations: shift_annotations(&kept, start, delta),
    }
}

fn touches(annotation: &Range<usize>, start: usize, end: usize) -> bool {
    if start == end {
        annotation.start < start && start < annotation.end
    } else {
        annotation.start < end && start < annotation.end
    }
}

/// Replace the trigger span `[trigger_offset, cursor_offset)` with the inline
/// markup for `result` and annotate it.
pub fn insert_reference(
    text: &str,
    annotations: &[Annotation],
    trigger_offset: usize,
    cursor_offset: usize,
    result: &SearchResult,
) -> Insertion {
    insert_reference_markup(
        text,
        annotations,
        trigger_offset,
        cursor_offset,
        reference_for_result(result),
    )
}

pub fn insert_reference_markup(
    text: &str,
    annotations: &[Annotation],
    trigger_offset: usize,
    cursor_offset: usize,
    reference: ContextReference,
) -> Insertion {
    let markup = reference.to_inline_markup();
    let mut insertion = replace_range(
        text,
        annotations,
        trigger_offset..cursor_offset,
        &markup,
    );
    let start = insertion.cursor - markup.len();
    let position = insertion
        .annotations
        .partition_point(|annotation| annotation.range.start < start);
    insertion.annotations.insert(
        position,
        Annotation {
            range: start..insertion.cursor,
            reference,
        },
    );
    insertion
}

/// A draft submitted by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub text: String,
    /// References in order of appearance.
    pub references: Vec<ContextReference>,
}

/// An editable message draft whose reference chips behave as single units:
/// the cursor never rests inside one and backspace removes a chip whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftBuffer {
    text: String,
    cursor: usize,
    annotations: Vec<Annotation>,
}

impl DraftBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a draft, turning any inline markup it contains back into
    /// chips. The cursor is placed at the end.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let annotations = parse_inline_references(&text)
            .into_iter()
            .map(|inline| Annotation {
                range: inline.range,
                reference: inline.reference,
            })
            .collect();
        Self {
            cursor: text.len(),
            text,
            annotations,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Move the cursor, snapping to a char boundary and out of any chip (to
    /// whichever chip edge is closer).
    pub fn set_cursor(&mut self, cursor: usize) {
        let cursor = clamp_to_char_boundary(&self.text, cursor);
        self.cursor = match self.annotation_containing(cursor) {
            Some(annotation) => {
                let range = &annotation.range;
                if cursor - range.start <= range.end - cursor {
                    range.start
                } else {
                    range.end
                }
            }
            None => cursor,
        };
    }

    /// Move one char left, stepping over a whole chip ending at the cursor.
    pub fn move_left(&mut self) {
        if let Some(annotation) = self.annotation_ending_at(self.cursor) {
            self.cursor = annotation.range.start;
        } else if let Some(prev) = prev_char_boundary(&self.text, self.cursor) {
            self.cursor = prev;
        }
    }

    /// Move one char right, stepping over a whole chip starting at the cursor.
    pub fn move_right(&mut self) {
        if let Some(annotation) = self
            .annotations
            .iter()
            .find(|annotation| annotation.range.start == self.cursor)
        {
            self.cursor = annotation.range.end;
        } else if let Some(next) = next_char_boundary(&self.text, self.cursor) {
            self.cursor = next;
        }
    }

    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.text.len();
    }

    pub fn insert_str(&mut self, s: &str) {
        self.apply(replace_range(
            &self.text,
            &self.annotations,
            self.cursor..self.cursor,
            s,
        ));
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut buf));
    }

    pub fn insert_newline(&mut self) {
        self.insert_str("\n");
    }

    /// Delete the char before the cursor, or the whole chip when the cursor
    /// sits at a chip's end.
    pub fn delete_backward(&mut self) {
        if let Some(annotation) = self.annotation_ending_at(self.cursor) {
            let range = annotation.range.clone();
            self.delete_range(range);
            return;
        }
        if let Some(prev) = prev_char_boundary(&self.text, self.cursor) {
            self.delete_range(prev..self.cursor);
        }
    }

    /// Delete `range`, widening it to cover any chip it partially overlaps.
    pub fn delete_range(&mut self, range: Range<usize>) {
        let mut start = range.start.min(self.text.len());
        let mut end = range.end.min(self.text.len()).max(start);
        for annotation in &self.annotations {
            if annotation.range.start < end && start < annotation.range.end {
                start = start.min(annotation.range.start);
                end = end.max(annotation.range.end);
            }
        }
        let insertion = replace_range(&self.text, &self.annotations, start..end, "");
        self.apply(insertion);
    }

    /// Replace `[trigger_offset, cursor)` with a chip for `reference`.
    pub fn insert_reference(&mut self, trigger_offset: usize, reference: ContextReference) {
        self.apply(insert_reference_markup(
            &self.text,
            &self.annotations,
            trigger_offset,
            self.cursor,
            reference,
        ));
    }

    /// Hand the draft off for sending and start a fresh one.
    pub fn take(&mut self) -> Submission {
        let draft = std::mem::take(self);
        Submission {
            text: draft.text,
            references: draft
                .annotations
                .into_iter()
                .map(|annotation| annotation.reference)
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn annotation_ending_at(&self, offset: usize) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| annotation.range.end == offset)
    }

    fn annotation_containing(&self, offset: usize) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| annotation.range.start < offset && offset < annotation.range.end)
    }

    fn apply(&mut self, insertion: Insertion) {
        self.text = insertion.text;
        self.cursor = insertion.cursor;
        self.annotations = insertion.annotations;
    }
}
