//! # dnsmux-provider
//!
//! The provider side of a vendor-agnostic DNS client: one record-set model
//! and the machinery every vendor adapter needs to feed it.
//!
//! ## Mechanisms
//!
//! | Module | What it does |
//! |--------|--------------|
//! | [`merge`] | Folds a vendor's flat per-value rows into [`ResourceRecordSet`]s, overlaying geo and weighted membership |
//! | [`pagination`] | One forward-only iterator over any "next page" convention, with optional filtering |
//! | [`session`] | Memoizes an expensive session artifact; refreshes on TTL expiry, credential or endpoint change |
//! | [`classify`] / [`retry`] | Maps vendor errors to a [`Disposition`] and retries transient or rate-limited calls once |
//!
//! Everything is synchronous and blocking on the calling thread.
//!
//! ## Feature Flags
//!
//! - **`mock`** *(default)*: [`MockProvider`], an in-memory adapter.
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls. Recommended for cross-compilation.
//!
//! ## Usage
//!
//! ```rust
//! use dnsmux_provider::{merge, paginate, RecordEntry, Page, Result};
//!
//! let pages = vec![
//!     vec![RecordEntry::new("www.io", 1, vec!["192.0.2.1".into()]).with_ttl(300)],
//!     vec![RecordEntry::new("www.io", 1, vec!["198.51.100.1".into()]).with_ttl(300)],
//! ];
//! let rows = paginate(|token: Option<usize>| {
//!     let i = token.unwrap_or(0);
//!     Ok(Page::new(pages[i].clone(), (i + 1 < pages.len()).then_some(i + 1)))
//! });
//!
//! let sets = merge(rows).collect::<Result<Vec<_>>>()?;
//! assert_eq!(sets.len(), 1);
//! assert_eq!(sets[0].rdata.len(), 2);
//! # Ok::<(), dnsmux_provider::ClassifiedError>(())
//! ```
//!
//! ## Error Handling
//!
//! Adapters report vendor failures as [`RawApiError`]. An [`ErrorClassifier`]
//! turns them into a [`ClassifiedError`] whose [`Disposition`] decides what
//! [`Invoker`] does:
//!
//! - [`Disposition::Validation`]: caller input is insufficient; never retried
//! - [`Disposition::Transient`]: retried once, after invalidating the session
//!   when it no longer matches
//! - [`Disposition::RateLimited`]: retried once, after `retry_after`
//! - [`Disposition::Permanent`]: never retried; vendor text kept verbatim

pub mod classify;
mod error;
mod http_client;
pub mod merge;
pub mod pagination;
mod providers;
pub mod rdata;
pub mod retry;
pub mod session;
mod traits;
mod types;
mod utils;

// Re-export error types
pub use error::{ClassifiedError, Disposition, Result, VendorMessage};

// Re-export adapter traits
pub use traits::{
    CredentialSource, ErrorClassifier, GroupResolver, RawApiError, RawResult, SessionHandle,
    VendorAdapter,
};

// Re-export types
pub use types::{
    CredentialRequirements, Credentials, GroupDetail, MergeKey, Page, PageRequest, Profile,
    ProfileKind, ProviderMetadata, RecordEntry, RecordSetBuilder, RecordSetKey, ResourceRecordSet,
    Zone, sort_for_merge,
};

// Re-export the mechanisms
pub use classify::{ClassificationRules, RuleClassifier};
pub use merge::{MergedRecordSets, merge};
pub use pagination::{Paginator, paginate, paginate_filtered};
pub use rdata::RData;
pub use retry::{Invoker, RetryPolicy, invoke};
pub use session::{RefreshMode, SessionCache, SessionSettings};

// Re-export HTTP helpers for adapters
pub use http_client::{HttpUtils, PARSE_ERROR, TRANSPORT_ERROR};
pub use providers::common;

// Re-export utils
pub use utils::clock::{Clock, ManualClock, SystemClock};
pub use utils::{datetime, log_sanitizer};

#[cfg(feature = "mock")]
pub use providers::{MockOp, MockProvider, MockProviderBuilder};
