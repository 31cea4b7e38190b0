//! dnsmux Core Library
//!
//! The service layer over a [`VendorAdapter`](dnsmux_provider::VendorAdapter):
//! - Zone Service
//! - Record set management (Record Set Service)
//! - Record set filters
//!
//! Every vendor call runs under the configured retry policy. Listings are
//! lazy: pages are fetched and merged into record sets as the caller
//! iterates.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use dnsmux_core::DnsClient;
//! use dnsmux_provider::{MockProvider, RecordEntry, Zone};
//!
//! let provider = Arc::new(MockProvider::new());
//! let zone = provider.add_zone(Zone::new("example.io."));
//! provider.add_entries(
//!     &zone,
//!     [
//!         RecordEntry::new("www.example.io.", 1, vec!["192.0.2.1".into()]).with_ttl(300),
//!         RecordEntry::new("www.example.io.", 1, vec!["198.51.100.1".into()]).with_ttl(300),
//!     ],
//! );
//!
//! let client = DnsClient::new(provider)?;
//! let set = client
//!     .record_sets(&zone)
//!     .get_by_name_and_type("www.example.io.", "A")?
//!     .expect("www A exists");
//! assert_eq!(set.rdata.len(), 2);
//! # Ok::<(), dnsmux_core::CoreError>(())
//! ```

mod client;
pub mod config;
pub mod error;
pub mod filters;
pub mod services;

// Re-export common types
pub use client::{DnsClient, DnsClientBuilder};
pub use config::ClientConfig;
pub use error::{CoreError, CoreResult};
pub use services::{RecordSetChanges, RecordSetService, ServiceContext, ZoneService};

pub use dnsmux_provider::{Profile, ProfileKind, RData, ResourceRecordSet, Zone};
