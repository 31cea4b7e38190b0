use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the retry policy treats a failed vendor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    /// Caller-supplied arguments are insufficient. Never retried.
    Validation,
    /// The vendor reported a condition expected to clear by itself
    /// (job still running, session no longer matches). Retried once.
    Transient,
    /// The vendor is throttling. Retried once after `retry_after`.
    RateLimited,
    /// Conflict, not found, blocked, invalid input. Never retried.
    Permanent,
}

impl Disposition {
    /// Whether the retry policy may re-issue a call that failed this way.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::RateLimited)
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Transient => "transient",
            Self::RateLimited => "rate limited",
            Self::Permanent => "permanent",
        };
        f.write_str(s)
    }
}

/// One line of a vendor's structured error message list.
///
/// Informational lines carry no code; they are kept so callers see the
/// vendor's full diagnostic, but must stay distinguishable from coded lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorMessage {
    /// Machine-readable code, absent on informational lines.
    pub code: Option<String>,
    /// Message text, verbatim.
    pub text: String,
}

impl VendorMessage {
    pub fn coded(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            code: None,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for VendorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// Unified error type for every operation that reaches a vendor.
///
/// Produced by an [`ErrorClassifier`](crate::ErrorClassifier) from a vendor's
/// raw error payload. The vendor's own text is kept verbatim in `message` and
/// `details`; the `disposition` drives the retry policy in
/// [`Invoker`](crate::Invoker).
///
/// When a retryable error survives its retry, it is surfaced with its original
/// disposition and `attempts > 1`, so callers can tell "gave up after retrying"
/// from "never going to succeed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    /// Adapter that produced the error.
    pub provider: String,
    /// Retry classification.
    pub disposition: Disposition,
    /// Primary vendor error code, if any.
    pub code: Option<String>,
    /// Primary message, verbatim.
    pub message: String,
    /// Further vendor messages, coded and informational.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<VendorMessage>,
    /// Earliest time a retry is advised (rate limiting only).
    #[serde(default, with = "crate::utils::datetime")]
    pub retry_after: Option<DateTime<Utc>>,
    /// The vendor session no longer matches the caller; the session cache
    /// must be invalidated before retrying.
    #[serde(default)]
    pub session_mismatch: bool,
    /// Number of underlying attempts made before this error was surfaced.
    #[serde(default)]
    pub attempts: u32,
}

impl ClassifiedError {
    fn with_disposition(
        provider: impl Into<String>,
        disposition: Disposition,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            disposition,
            code: None,
            message: message.into(),
            details: Vec::new(),
            retry_after: None,
            session_mismatch: false,
            attempts: 0,
        }
    }

    pub fn validation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_disposition(provider, Disposition::Validation, message)
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_disposition(provider, Disposition::Transient, message)
    }

    pub fn rate_limited(
        provider: impl Into<String>,
        message: impl Into<String>,
        retry_after: DateTime<Utc>,
    ) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::with_disposition(provider, Disposition::RateLimited, message)
        }
    }

    pub fn permanent(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_disposition(provider, Disposition::Permanent, message)
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Vec<VendorMessage>) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn with_session_mismatch(mut self) -> Self {
        self.session_mismatch = true;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.disposition.is_retryable()
    }

    /// The error was retryable but persisted past the retry budget.
    pub fn gave_up_after_retry(&self) -> bool {
        self.is_retryable() && self.attempts > 1
    }

    /// Whether this is an expected outcome (bad input, conflict, missing
    /// resource), used to pick the log level.
    ///
    /// `true` logs at `warn`, `false` at `error`.
    pub fn is_expected(&self) -> bool {
        matches!(
            self.disposition,
            Disposition::Validation | Disposition::Permanent
        )
    }
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ", self.provider)?;
        if let Some(code) = &self.code {
            write!(f, "{code}: ")?;
        }
        f.write_str(&self.message)?;
        for line in &self.details {
            write!(f, "\n  {line}")?;
        }
        if self.gave_up_after_retry() {
            write!(
                f,
                " ({} after {} attempts)",
                self.disposition, self.attempts
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ClassifiedError {}

/// Convenience type alias for `Result<T, ClassifiedError>`.
pub type Result<T> = std::result::Result<T, ClassifiedError>;
