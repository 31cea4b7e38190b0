//! Table-driven error classification.
//!
//! Most vendors signal retryable conditions with a handful of codes or
//! message fragments. An adapter describes those in [`ClassificationRules`]
//! and wraps them in a [`RuleClassifier`]; anything unlisted is permanent.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{ClassifiedError, Disposition};
use crate::http_client::TRANSPORT_ERROR;
use crate::traits::{ErrorClassifier, RawApiError};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::log_sanitizer::truncate_for_log;

/// Advisory delay when a vendor throttles without saying for how long.
pub const DEFAULT_MIN_RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

/// Codes and message fragments that select a non-permanent disposition.
///
/// Codes match exactly; fragments match case-insensitively anywhere in the
/// primary message or any message line.
#[derive(Debug, Clone, Default)]
pub struct ClassificationRules {
    pub validation_codes: Vec<String>,
    pub transient_codes: Vec<String>,
    pub transient_fragments: Vec<String>,
    /// Transient errors that also mean the cached session is stale.
    pub session_mismatch_codes: Vec<String>,
    pub session_mismatch_fragments: Vec<String>,
    pub rate_limited_codes: Vec<String>,
    pub rate_limited_fragments: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl ClassificationRules {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn validation_codes(mut self, codes: &[&str]) -> Self {
        self.validation_codes.extend(owned(codes));
        self
    }

    #[must_use]
    pub fn transient_codes(mut self, codes: &[&str]) -> Self {
        self.transient_codes.extend(owned(codes));
        self
    }

    #[must_use]
    pub fn transient_fragments(mut self, fragments: &[&str]) -> Self {
        self.transient_fragments.extend(owned(fragments));
        self
    }

    #[must_use]
    pub fn session_mismatch_codes(mut self, codes: &[&str]) -> Self {
        self.session_mismatch_codes.extend(owned(codes));
        self
    }

    #[must_use]
    pub fn session_mismatch_fragments(mut self, fragments: &[&str]) -> Self {
        self.session_mismatch_fragments.extend(owned(fragments));
        self
    }

    #[must_use]
    pub fn rate_limited_codes(mut self, codes: &[&str]) -> Self {
        self.rate_limited_codes.extend(owned(codes));
        self
    }

    #[must_use]
    pub fn rate_limited_fragments(mut self, fragments: &[&str]) -> Self {
        self.rate_limited_fragments.extend(owned(fragments));
        self
    }
}

/// What a raw error matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Validation,
    SessionMismatch,
    Transient,
    RateLimited,
    Unlisted,
}

/// Applies [`ClassificationRules`] to raw errors.
///
/// Precedence: HTTP 429 and rate-limit rules, then session mismatch, then
/// other transient rules (including HTTP 502-504 and transport failures),
/// then validation codes.
/// Everything else is permanent.
pub struct RuleClassifier {
    provider: String,
    rules: ClassificationRules,
    min_rate_limit_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl RuleClassifier {
    pub fn new(provider: impl Into<String>, rules: ClassificationRules) -> Self {
        Self {
            provider: provider.into(),
            rules,
            min_rate_limit_delay: DEFAULT_MIN_RATE_LIMIT_DELAY,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Delay advised when the vendor gives no hint.
    #[must_use]
    pub fn with_min_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.min_rate_limit_delay = delay;
        self
    }

    fn code_in(raw: &RawApiError, codes: &[String]) -> bool {
        let listed = |code: &str| codes.iter().any(|c| c == code);
        raw.code.as_deref().is_some_and(listed)
            || raw
                .messages
                .iter()
                .filter_map(|m| m.code.as_deref())
                .any(listed)
    }

    fn text_contains(raw: &RawApiError, fragments: &[String]) -> bool {
        if fragments.is_empty() {
            return false;
        }
        let lines = std::iter::once(raw.message.as_str())
            .chain(raw.messages.iter().map(|m| m.text.as_str()))
            .map(str::to_lowercase)
            .collect::<Vec<_>>();
        fragments.iter().any(|f| {
            let f = f.to_lowercase();
            lines.iter().any(|l| l.contains(&f))
        })
    }

    fn match_rules(&self, raw: &RawApiError) -> Match {
        let r = &self.rules;
        if raw.http_status == Some(429)
            || Self::code_in(raw, &r.rate_limited_codes)
            || Self::text_contains(raw, &r.rate_limited_fragments)
        {
            Match::RateLimited
        } else if Self::code_in(raw, &r.session_mismatch_codes)
            || Self::text_contains(raw, &r.session_mismatch_fragments)
        {
            Match::SessionMismatch
        } else if matches!(raw.http_status, Some(502..=504))
            || raw.code.as_deref() == Some(TRANSPORT_ERROR)
            || Self::code_in(raw, &r.transient_codes)
            || Self::text_contains(raw, &r.transient_fragments)
        {
            Match::Transient
        } else if Self::code_in(raw, &r.validation_codes) {
            Match::Validation
        } else {
            Match::Unlisted
        }
    }
}

impl ErrorClassifier for RuleClassifier {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn classify(&self, raw: RawApiError) -> ClassifiedError {
        let matched = self.match_rules(&raw);
        log::debug!(
            "[{}] classified {:?}: {}",
            self.provider,
            matched,
            truncate_for_log(&raw.to_string())
        );

        let disposition = match matched {
            Match::Validation => Disposition::Validation,
            Match::SessionMismatch | Match::Transient => Disposition::Transient,
            Match::RateLimited => Disposition::RateLimited,
            Match::Unlisted => return self.unknown_error(raw),
        };

        let retry_after = (disposition == Disposition::RateLimited).then(|| {
            let hint = raw
                .retry_after_secs
                .map(Duration::from_secs)
                .unwrap_or(self.min_rate_limit_delay)
                .max(self.min_rate_limit_delay);
            let hint = chrono::Duration::from_std(hint).unwrap_or(chrono::Duration::MAX);
            let now = self.clock.now();
            now.checked_add_signed(hint).unwrap_or(now)
        });

        ClassifiedError {
            provider: self.provider.clone(),
            disposition,
            code: raw.code,
            message: raw.message,
            details: raw.messages,
            retry_after,
            session_mismatch: matched == Match::SessionMismatch,
            attempts: 0,
        }
    }
}
