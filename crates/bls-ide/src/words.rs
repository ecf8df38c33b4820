//! Identifier extraction around a cursor offset.

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// The identifier containing or immediately preceding `offset`.
pub fn word_at(text: &str, offset: usize) -> Option<(std::ops::Range<usize>, &str)> {
    if offset > text.len() {
        return None;
    }
    let bytes = text.as_bytes();

    let mut start = offset;
    while start > 0 && is_word_byte(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }

    (start < end).then(|| (start..end, &text[start..end]))
}
