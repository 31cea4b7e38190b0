//! Vendor adapter implementations

/// Shared utilities used by adapter implementations.
pub mod common;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockOp, MockProvider, MockProviderBuilder};
