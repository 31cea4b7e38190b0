//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error types
pub use dnsmux_provider::{ClassifiedError, Disposition};

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// No record set with this identity exists in the zone
    #[error("Record set not found: {0}")]
    RecordSetNotFound(String),

    /// The record set cannot be written as given
    #[error("Invalid record set: {0}")]
    InvalidRecordSet(String),

    /// Client configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vendor error after classification and retries
    #[error("{0}")]
    Provider(#[from] ClassifiedError),
}

impl CoreError {
    /// Whether it is expected behavior (bad input, missing record set, ...),
    /// used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::RecordSetNotFound(_) | Self::InvalidRecordSet(_) | Self::Config(_) => true,
            Self::Provider(e) => e.is_expected(),
        }
    }

    /// Retry classification of a vendor error; `None` for service-level
    /// failures.
    #[must_use]
    pub fn disposition(&self) -> Option<Disposition> {
        match self {
            Self::Provider(e) => Some(e.disposition),
            _ => None,
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
