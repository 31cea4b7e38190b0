//! Service layer

mod record_set_service;
mod zone_service;

pub use record_set_service::{RecordSetChanges, RecordSetService};
pub use zone_service::ZoneService;

use std::sync::Arc;

use dnsmux_provider::{ErrorClassifier, Invoker, PageRequest, RawResult, Result, VendorAdapter};

use crate::config::ClientConfig;

/// Service context - holds everything a service needs
///
/// Built once by [`DnsClient`](crate::DnsClient) and shared by every service
/// it hands out.
pub struct ServiceContext {
    /// The vendor adapter
    pub adapter: Arc<dyn VendorAdapter>,
    /// Retry policy, bound to the adapter's session
    pub invoker: Invoker,
    pub config: ClientConfig,
}

impl ServiceContext {
    #[must_use]
    pub fn new(adapter: Arc<dyn VendorAdapter>, invoker: Invoker, config: ClientConfig) -> Self {
        Self {
            adapter,
            invoker,
            config,
        }
    }

    /// Adapter identifier, for log prefixes.
    pub fn provider(&self) -> &'static str {
        self.adapter.id()
    }

    /// Request for the listing page after `token`, sized by the config.
    pub fn page(&self, token: Option<String>) -> PageRequest {
        PageRequest::new(token, self.config.page_size)
    }

    /// Run one vendor call under the retry policy, classifying its failures
    /// with the adapter's classifier.
    pub fn invoke<T>(&self, op: impl FnMut() -> RawResult<T>) -> Result<T> {
        self.invoker.invoke(op, |raw| self.adapter.classify(raw))
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("provider", &self.provider())
            .field("invoker", &self.invoker)
            .field("config", &self.config)
            .finish()
    }
}
