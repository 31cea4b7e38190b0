//! Generic HTTP client tools
//!
//! Reusable request handling for adapters that speak HTTP. Each adapter
//! still builds its own `RequestBuilder` (routes, signing and bodies differ
//! too much between vendors); these helpers send it, log it, and turn
//! HTTP-level failures into [`RawApiError`]s the classifier understands.
//!
//! Retrying is not done here. Calls go through [`Invoker`](crate::Invoker),
//! which retries once per the classified disposition.

use chrono::{DateTime, Utc};
use reqwest::blocking::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::traits::{RawApiError, RawResult};
use crate::utils::log_sanitizer::truncate_for_log;

/// Code of errors raised below the vendor protocol (connect, TLS, timeout).
/// [`RuleClassifier`](crate::RuleClassifier) treats it as transient.
pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";

/// Code of responses that could not be decoded.
pub const PARSE_ERROR: &str = "PARSE_ERROR";

/// HTTP tool function set
pub struct HttpUtils;

impl HttpUtils {
    /// Performs an HTTP request and returns status code and response text.
    ///
    /// HTTP 429 becomes a raw error with status 429 and the `Retry-After`
    /// hint; 502, 503 and 504 become raw errors with their status. Other
    /// statuses are returned to the adapter, which decodes vendor errors
    /// from the body itself.
    pub fn execute_request(
        request_builder: RequestBuilder,
        provider_name: &str,
        method_name: &str,
        url_or_action: &str,
    ) -> RawResult<(u16, String)> {
        log::debug!("[{provider_name}] {method_name} {url_or_action}");

        let response = request_builder.send().map_err(|e| {
            let kind = if e.is_timeout() { "timeout" } else { "network error" };
            RawApiError::with_code(TRANSPORT_ERROR, format!("{kind}: {e}"))
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{provider_name}] Response Status: {status_code}");

        // read before the body consumes the response
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));

        if status_code == 429 {
            let body = response.text().unwrap_or_default();
            log::warn!("[{provider_name}] Rate limited (HTTP 429), retry_after={retry_after:?}");
            let err = RawApiError::new(if body.is_empty() {
                "HTTP 429 Too Many Requests".to_string()
            } else {
                body
            })
            .with_status(429);
            return Err(match retry_after {
                Some(secs) => err.with_retry_after(secs),
                None => err,
            });
        }

        if matches!(status_code, 502..=504) {
            let body = response.text().unwrap_or_default();
            log::warn!("[{provider_name}] Server error (HTTP {status_code})");
            return Err(RawApiError::new(format!(
                "HTTP {status_code}: {}",
                truncate_for_log(&body)
            ))
            .with_status(status_code));
        }

        let response_text = response.text().map_err(|e| {
            RawApiError::with_code(
                TRANSPORT_ERROR,
                format!("Failed to read response body: {e}"),
            )
            .with_status(status_code)
        })?;

        log::debug!(
            "[{provider_name}] Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }

    /// Parse JSON response
    pub fn parse_json<T>(response_text: &str, provider_name: &str) -> RawResult<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("[{provider_name}] JSON parse failed: {e}");
            log::error!(
                "[{provider_name}] Raw response: {}",
                truncate_for_log(response_text)
            );
            RawApiError::with_code(PARSE_ERROR, e.to_string())
        })
    }

    /// Percent-encoded `key=value&...` query string, in the given order.
    pub fn query_string(params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// `Retry-After` as seconds from `now`: either delta-seconds or an HTTP date.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let secs = (at.with_timezone(&Utc) - now).num_seconds();
    Some(u64::try_from(secs).unwrap_or(0))
}
