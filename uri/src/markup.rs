use std::ops::Range;

use crate::ContextReference;
use crate::decode_reference;
use crate::encode_reference;

/// A reference chip found in message text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineReference {
    /// Byte range of the whole `[@label](uri)` span.
    pub range: Range<usize>,
    pub label: String,
    pub reference: ContextReference,
}

/// Render `[@<label>](<uri>)` for embedding a reference in message text.
///
/// `\`, `[` and `]` inside the label are escaped with a backslash so the span
/// can be found again by [`parse_inline_references`]. Line breaks in the
/// label become spaces; the URI keeps the original text.
pub fn render_inline_markup(reference: &ContextReference) -> String {
    let label = reference.display_label();
    let uri = encode_reference(reference);
    let mut out = String::with_capacity(label.len() + uri.len() + 5);
    out.push_str("[@");
    for ch in label.chars() {
        if matches!(ch, '\n' | '\r') {
            out.push(' ');
            continue;
        }
        if matches!(ch, '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push_str("](");
    out.push_str(&uri);
    out.push(')');
    out
}

/// Find every inline reference in `text`, in order of appearance.
///
/// Spans whose URI does not decode are not references and are skipped, so the
/// caller keeps rendering them as plain text.
pub fn parse_inline_references(text: &str) -> Vec<InlineReference> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut index = 0usize;

    while index < bytes.len() {
        if bytes[index] == b'['
            && let Some((label, uri, end)) = parse_markup_at(text, index)
            && let Some(reference) = decode_reference(uri)
        {
            found.push(InlineReference {
                range: index..end,
                label,
                reference,
            });
            index = end;
            continue;
        }

        let Some(ch) = text[index..].chars().next() else {
            break;
        };
        index += ch.len_utf8();
    }

    found
}

/// Parse `[@label](uri)` starting at `start`, returning the unescaped label,
/// the raw uri and the byte offset just past the closing paren.
fn parse_markup_at(text: &str, start: usize) -> Option<(String, &str, usize)> {
    let rest = text.get(start..)?;
    let after_open = rest.strip_prefix("[@")?;

    let mut label = String::new();
    let mut escaped = false;
    let mut label_end = None;
    for (idx, ch) in after_open.char_indices() {
        if escaped {
            label.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ']' => {
                label_end = Some(idx);
                break;
            }
            '\n' => return None,
            _ => label.push(ch),
        }
    }
    let label_end = label_end?;
    if label.is_empty() {
        return None;
    }

    let after_label = &after_open[label_end + 1..];
    let uri_and_rest = after_label.strip_prefix('(')?;
    let close = uri_and_rest.find([')', '\n'])?;
    if uri_and_rest.as_bytes()[close] != b')' {
        return None;
    }
    let uri = &uri_and_rest[..close];
    if uri.trim().is_empty() {
        return None;
    }

    // "[@" + label + "](" + uri + ")"
    let end = start + 2 + label_end + 2 + close + 1;
    Some((label, uri, end))
}
