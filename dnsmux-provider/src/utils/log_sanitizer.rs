//! Log sanitization utilities
//!
//! Keeps vendor payloads and credentials from being dumped whole into
//! debug/error logs.

/// Maximum number of bytes of a payload included in log output.
const TRUNCATE_LIMIT: usize = 256;

/// Number of leading characters of a secret left visible by [`redact`].
const REDACT_VISIBLE: usize = 3;

/// Truncate a payload for logging, appending the total length when cut.
///
/// The cut falls on a char boundary at or below the limit.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        return s.to_string();
    }
    let cut = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= TRUNCATE_LIMIT)
        .last()
        .unwrap_or(0);
    format!("{}... [truncated, total {} bytes]", &s[..cut], s.len())
}

/// Mask a secret, keeping only a short prefix for correlation.
///
/// Secrets no longer than twice the visible prefix are masked entirely.
pub fn redact(secret: &str) -> String {
    if secret.chars().count() <= REDACT_VISIBLE * 2 {
        return "***".to_string();
    }
    let prefix: String = secret.chars().take(REDACT_VISIBLE).collect();
    format!("{prefix}***")
}
