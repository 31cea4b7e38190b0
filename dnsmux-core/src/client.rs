//! Configured entry point over one vendor adapter

use std::sync::Arc;

use dnsmux_provider::{Clock, CredentialSource, Invoker, ProviderMetadata, VendorAdapter, Zone};

use crate::config::ClientConfig;
use crate::error::CoreResult;
use crate::services::{RecordSetService, ServiceContext, ZoneService};

/// DNS client bound to one vendor account.
///
/// Cheap to clone; services handed out share the adapter, its session and
/// the retry policy.
#[derive(Debug, Clone)]
pub struct DnsClient {
    ctx: Arc<ServiceContext>,
}

/// Builder for [`DnsClient`].
pub struct DnsClientBuilder {
    adapter: Arc<dyn VendorAdapter>,
    config: ClientConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl DnsClientBuilder {
    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of retries after the first attempt of a vendor call.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Clock used for rate-limit waits.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> CoreResult<DnsClient> {
        let mut config = self.config;
        config.validate()?;

        let max_page_size = self.adapter.metadata().max_page_size;
        let page_size = config.page_size_for(max_page_size);
        if page_size != config.page_size {
            log::warn!(
                "[{}] page size {} exceeds the adapter limit, using {page_size}",
                self.adapter.id(),
                config.page_size
            );
            config.page_size = page_size;
        }

        let mut invoker = Invoker::new(config.retry_policy());
        if let Some(clock) = self.clock {
            invoker = invoker.with_clock(clock);
        }
        if let Some(session) = self.adapter.session() {
            session.configure(config.session_settings());
            invoker = invoker.with_session(session);
        }

        log::debug!(
            "[{}] client ready (max retries {}, page size {})",
            self.adapter.id(),
            config.max_retries,
            config.page_size
        );
        Ok(DnsClient {
            ctx: Arc::new(ServiceContext::new(self.adapter, invoker, config)),
        })
    }
}

impl DnsClient {
    pub fn builder(adapter: Arc<dyn VendorAdapter>) -> DnsClientBuilder {
        DnsClientBuilder {
            adapter,
            config: ClientConfig::default(),
            clock: None,
        }
    }

    /// A client with the default configuration.
    pub fn new(adapter: Arc<dyn VendorAdapter>) -> CoreResult<Self> {
        Self::builder(adapter).build()
    }

    pub fn zones(&self) -> ZoneService {
        ZoneService::new(Arc::clone(&self.ctx))
    }

    /// Record sets of `zone`.
    pub fn record_sets(&self, zone: &Zone) -> RecordSetService {
        RecordSetService::new(Arc::clone(&self.ctx), zone.clone())
    }

    /// Adapter identifier.
    pub fn provider(&self) -> &'static str {
        self.ctx.provider()
    }

    pub fn metadata(&self) -> ProviderMetadata {
        self.ctx.adapter.metadata()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.ctx.config
    }

    /// Check the adapter's current credentials against the shapes it
    /// accepts, without calling the vendor.
    pub fn check_credentials(&self) -> CoreResult<()> {
        let requirements = self.ctx.adapter.metadata().credentials;
        let credentials = self.ctx.adapter.credentials()?;
        requirements.require(Some(&credentials))?;
        Ok(())
    }
}
