//! Small pure text helpers.

/// Keep at most `max` characters of `s`.
///
/// Counts `char`s, not bytes, so a multi-byte scalar is never split.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Rough token estimate: one token per four characters.
///
/// Good enough for "how much did a collapse save" bookkeeping; nothing here
/// is used to enforce a provider context limit.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}
