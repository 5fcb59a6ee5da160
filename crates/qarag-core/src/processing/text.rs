//! Character-indexed string helpers.
//!
//! Chunk sizes are measured in characters, never bytes, so multi-byte text
//! (accents, emoji) can be sliced without landing inside a code point.

/// Number of characters in `s`
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `n`-th character, or `s.len()` past the end
fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// The first `n` characters of `s`
pub fn head(s: &str, n: usize) -> &str {
    &s[..byte_offset(s, n)]
}

/// The last `n` characters of `s`
pub fn tail(s: &str, n: usize) -> &str {
    let len = char_len(s);
    if n >= len {
        return s;
    }
    &s[byte_offset(s, len - n)..]
}

/// Everything after the first `n` characters of `s`
pub fn skip(s: &str, n: usize) -> &str {
    &s[byte_offset(s, n)..]
}

/// Character index of the first occurrence of `pat`
pub fn find_char(s: &str, pat: &str) -> Option<usize> {
    s.find(pat).map(|b| char_len(&s[..b]))
}

/// Character index of the last occurrence of `pat`
pub fn rfind_char(s: &str, pat: &str) -> Option<usize> {
    s.rfind(pat).map(|b| char_len(&s[..b]))
}
