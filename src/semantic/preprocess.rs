//! Content preprocessing for embedding generation.
//!
//! Prepares video title and description for embedding:
//! 1. Join title and description with a blank line
//! 2. Trim surrounding whitespace
//! 3. Skip if nothing is left

/// Separator between title and description in the embedded text
const CONTENT_SEPARATOR: &str = "\n\n";

/// Build the text payload that gets embedded for one video.
///
/// Returns `None` if both title and description are empty after trimming.
pub fn compose_content(title: &str, description: &str) -> Option<String> {
    let content = format!("{}{}{}", title, CONTENT_SEPARATOR, description);
    let content = content.trim();

    if content.is_empty() {
        return None;
    }

    Some(content.to_string())
}

/// Clip to at most `max_chars` characters without breaking UTF-8 sequences.
pub fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
