//! Shared helpers for adapter implementations.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::http_client::TRANSPORT_ERROR;
use crate::traits::{RawApiError, RawResult};

// ============ HTTP Client ============

/// Default connection timeout (seconds)
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default request timeout (seconds)
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Blocking HTTP client with the default timeouts, for adapters built on
/// [`HttpUtils`](crate::HttpUtils).
pub fn create_http_client() -> RawResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| {
            RawApiError::with_code(TRANSPORT_ERROR, format!("failed to create HTTP client: {e}"))
        })
}

// ============ Name handling ============

/// Lowercase, without the trailing dot, for comparing owner and zone names.
pub fn normalize_domain_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Whether `name` is `zone` itself or lies below it.
pub fn is_in_zone(name: &str, zone: &str) -> bool {
    let name = normalize_domain_name(name);
    let zone = normalize_domain_name(zone);
    name == zone || name.ends_with(&format!(".{zone}"))
}
