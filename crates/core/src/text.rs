//! Small string helpers shared by the API clients.

/// Maximum number of characters of a remote response body kept in
/// error messages.
pub const ERROR_BODY_MAX_CHARS: usize = 200;

/// Truncate `s` to at most `max_chars` characters, respecting UTF-8
/// boundaries.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a remote response body for inclusion in an error message.
pub fn truncate_body(s: &str) -> String {
    truncate_chars(s, ERROR_BODY_MAX_CHARS)
}

/// Case-insensitive substring check.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
