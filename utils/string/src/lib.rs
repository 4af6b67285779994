/// Clamp a byte offset into `s` to the nearest char boundary at or before it.
///
/// Offsets past the end of the string clamp to `s.len()`.
#[inline]
pub fn clamp_to_char_boundary(s: &str, pos: usize) -> usize {
    let mut pos = pos.min(s.len());
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Byte offset of the char that ends at `pos`, or `None` at the start of the string.
#[inline]
pub fn prev_char_boundary(s: &str, pos: usize) -> Option<usize> {
    let pos = clamp_to_char_boundary(s, pos);
    s[..pos].char_indices().next_back().map(|(idx, _)| idx)
}

/// Byte offset just past the char that starts at `pos`, or `None` at the end of the string.
#[inline]
pub fn next_char_boundary(s: &str, pos: usize) -> Option<usize> {
    let pos = clamp_to_char_boundary(s, pos);
    s[pos..].chars().next().map(|ch| pos + ch.len_utf8())
}
