//! Post text helpers shared by listings, admin rows and templates.

/// Fallback for the configured display length of post and comment names.
pub const DEFAULT_DISPLAY_LENGTH: usize = 15;

/// Return at most `limit` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
