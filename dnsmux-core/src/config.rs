//! Client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use dnsmux_provider::{RefreshMode, RetryPolicy, SessionSettings};

use crate::error::{CoreError, CoreResult};

/// Knobs of a [`DnsClient`](crate::DnsClient).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use dnsmux_core::ClientConfig;
///
/// let config = ClientConfig::from_json(r#"{ "maxRetries": 0 }"#)?;
/// assert_eq!(config.max_retries, 0);
/// assert_eq!(config.page_size, 100);
/// # Ok::<(), dnsmux_core::CoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Lifetime of a derived vendor session, in seconds.
    pub session_ttl_secs: u64,
    /// Re-issues allowed after the first attempt of a vendor call.
    pub max_retries: u32,
    /// Wait before retrying a rate-limited call without a `retry_after` hint.
    pub min_rate_limit_delay_ms: u64,
    /// Upper bound on any rate-limit wait, in seconds.
    pub max_rate_limit_delay_secs: u64,
    /// Items per listing page, clamped to the adapter's maximum.
    pub page_size: u32,
    pub refresh_mode: RefreshMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 60,
            max_retries: 1,
            min_rate_limit_delay_ms: 1000,
            max_rate_limit_delay_secs: 30,
            page_size: 100,
            refresh_mode: RefreshMode::Block,
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no client can run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.session_ttl_secs == 0 {
            return Err(CoreError::Config("sessionTtlSecs must be positive".into()));
        }
        if self.page_size == 0 {
            return Err(CoreError::Config("pageSize must be positive".into()));
        }
        if self.min_rate_limit_delay() > self.max_rate_limit_delay() {
            return Err(CoreError::Config(
                "minRateLimitDelayMs exceeds maxRateLimitDelaySecs".into(),
            ));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn min_rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.min_rate_limit_delay_ms)
    }

    pub fn max_rate_limit_delay(&self) -> Duration {
        Duration::from_secs(self.max_rate_limit_delay_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            min_rate_limit_delay: self.min_rate_limit_delay(),
            max_rate_limit_delay: self.max_rate_limit_delay(),
        }
    }

    /// Page size no larger than what the adapter serves.
    pub fn page_size_for(&self, max_page_size: u32) -> u32 {
        if max_page_size == 0 {
            return self.page_size;
        }
        self.page_size.min(max_page_size)
    }

    /// Settings handed to the adapter's session cache.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            ttl: self.session_ttl(),
            refresh_mode: self.refresh_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.session_ttl(), Duration::from_secs(60));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.refresh_mode, RefreshMode::Block);
        assert_eq!(config.session_settings(), SessionSettings::default());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            ClientConfig::from_json(r#"{ "refreshMode": "serveStale", "pageSize": 20 }"#).unwrap();
        assert_eq!(config.refresh_mode, RefreshMode::ServeStale);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn retry_policy_follows_config() {
        let config = ClientConfig {
            max_retries: 3,
            min_rate_limit_delay_ms: 250,
            max_rate_limit_delay_secs: 5,
            ..ClientConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.min_rate_limit_delay, Duration::from_millis(250));
        assert_eq!(policy.max_rate_limit_delay, Duration::from_secs(5));
    }

    #[test]
    fn rejects_unusable_settings() {
        assert!(matches!(
            ClientConfig::from_json(r#"{ "pageSize": 0 }"#),
            Err(CoreError::Config(_))
        ));
        let json = r#"{ "minRateLimitDelayMs": 60000, "maxRateLimitDelaySecs": 1 }"#;
        assert!(matches!(
            ClientConfig::from_json(json),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_json("{ not json"),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn page_size_is_clamped() {
        let config = ClientConfig::default();
        assert_eq!(config.page_size_for(25), 25);
        assert_eq!(config.page_size_for(500), 100);
        assert_eq!(config.page_size_for(0), 100);
    }
}
