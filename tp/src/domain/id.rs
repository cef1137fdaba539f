//! Session ID generation and handling
//!
//! All IDs use the format: `{6-char-hex}-trip-{slug}`
//! Example: `019430-trip-paris-weekend`

use tracing::debug;

/// Generate a session ID from a user query
///
/// The slug is built from the first few words of the query so a directory of
/// stored sessions stays human-scannable.
pub fn generate_session_id(query: &str) -> String {
    let uuid = uuid::Uuid::now_v7();
    let hex_prefix = &uuid.to_string()[..6];
    let slug = slugify(query, 4);
    let id = if slug.is_empty() {
        format!("{}-trip-session", hex_prefix)
    } else {
        format!("{}-trip-{}", hex_prefix, slug)
    };
    debug!(%id, "generate_session_id: called");
    id
}

/// Slugify text for use in IDs, keeping at most `max_words` words
fn slugify(text: &str, max_words: usize) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some(' ')
            }
        })
        .collect::<String>()
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join("-")
}
