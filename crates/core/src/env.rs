//! Environment variable parsing with logged fallbacks.

use std::fmt::Display;
use std::str::FromStr;

/// Parse `key` from the environment, falling back to `default` when the
/// variable is unset or does not parse. Invalid values are logged.
pub fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, fallback = %default, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Trimmed, non-empty value of `key`.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
