use ctxref_utils_string::clamp_to_char_boundary;

use crate::config::DEFAULT_TRIGGER;

/// A trigger the cursor is currently typing after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTrigger {
    /// Byte offset of the trigger character.
    pub offset: usize,
    /// Text between the trigger character and the cursor. May be empty, in
    /// which case the popup shows recently used entries.
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerDetector {
    trigger: char,
}

impl Default for TriggerDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER)
    }
}

impl TriggerDetector {
    pub fn new(trigger: char) -> Self {
        Self { trigger }
    }

    pub fn trigger(&self) -> char {
        self.trigger
    }

    /// Find the trigger the cursor at byte offset `cursor` is typing after.
    ///
    /// The word ending at the cursor (delimited by whitespace on the left) must
    /// start with the trigger character, so `user@host` never triggers and any
    /// whitespace between the trigger and the cursor ends the trigger.
    pub fn detect(&self, text: &str, cursor: usize) -> Option<ActiveTrigger> {
        let cursor = clamp_to_char_boundary(text, cursor);
        let before_cursor = &text[..cursor];

        let word_start = before_cursor
            .char_indices()
            .rfind(|(_, c)| c.is_whitespace())
            .map(|(idx, c)| idx + c.len_utf8())
            .unwrap_or(0);

        let word = &before_cursor[word_start..];
        let query = word.strip_prefix(self.trigger)?;
        Some(ActiveTrigger {
            offset: word_start,
            query: query.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn detect(text: &str, cursor: usize) -> Option<(usize, String)> {
        TriggerDetector::default()
            .detect(text, cursor)
            .map(|trigger| (trigger.offset, trigger.query))
    }

    #[test]
    fn detects_basic_cases() {
        let cases = vec![
            ("check @read", 11, Some((6, "read")), "token at end"),
            ("@hello", 6, Some((0, "hello")), "token at start"),
            ("@hello", 3, Some((0, "he")), "cursor inside token"),
            ("@", 1, Some((0, "")), "lone trigger yields empty query"),
            ("say @", 5, Some((4, "")), "lone trigger after space"),
            ("@İstanbul", 10, Some((0, "İstanbul")), "multibyte query"),
            ("@诶", 4, Some((0, "诶")), "cjk query"),
            ("@a@b", 4, Some((0, "a@b")), "later trigger mid-word is part of query"),
            ("hello", 5, None, "no trigger"),
            ("", 0, None, "empty text"),
        ];
        for (text, cursor, expected, description) in cases {
            let expected = expected.map(|(offset, query)| (offset, query.to_string()));
            assert_eq!(
                detect(text, cursor),
                expected,
                "case: {description} - text: {text:?}, cursor: {cursor}"
            );
        }
    }

    #[test]
    fn mid_word_trigger_is_ignored() {
        assert_eq!(detect("user@host", 9), None);
        assert_eq!(detect("aaa@aaa", 5), None);
        assert_eq!(detect("mail me: a@b.io", 15), None);
    }

    #[test]
    fn whitespace_between_trigger_and_cursor_deactivates() {
        assert_eq!(detect("@read me", 8), None);
        assert_eq!(detect("@read ", 6), None);
        assert_eq!(detect("test @ world", 12), None);
    }

    #[test]
    fn cursor_before_trigger_deactivates() {
        assert_eq!(detect("check @read", 6), None);
        assert_eq!(detect("check @read", 3), None);
    }

    #[test]
    fn accepts_any_whitespace_as_boundary() {
        assert_eq!(detect("a\t@x", 4), Some((2, "x".to_string())));
        assert_eq!(detect("a\n@x", 4), Some((2, "x".to_string())));
        // Ideographic space is three bytes.
        assert_eq!(detect("a\u{3000}@x", 6), Some((4, "x".to_string())));
    }

    #[test]
    fn cursor_inside_multibyte_char_clamps_back() {
        // Byte 2 falls inside "诶"; the cursor clamps to byte 1.
        assert_eq!(detect("@诶", 2), Some((0, String::new())));
    }

    #[test]
    fn custom_trigger_character() {
        let detector = TriggerDetector::new('#');
        let trigger = detector.detect("see #issue", 10);
        assert_eq!(
            trigger,
            Some(ActiveTrigger {
                offset: 4,
                query: "issue".to_string(),
            })
        );
        assert_eq!(detector.detect("see @issue", 10), None);
    }
}
