//! Utility modules.

/// Injectable wall clock shared by the session cache and the retry policy.
pub mod clock;

/// Date/time parsing and serde helpers shared by adapters.
pub mod datetime;

/// Log sanitization utilities to prevent sensitive data exposure.
pub mod log_sanitizer;
