//! Zone management service

use std::sync::Arc;

use dnsmux_provider::common::normalize_domain_name;
use dnsmux_provider::{Zone, paginate, paginate_filtered};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;

/// Zone management service
pub struct ZoneService {
    ctx: Arc<ServiceContext>,
}

impl ZoneService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Every zone of the account, fetched a page at a time as the iterator
    /// advances.
    pub fn iter(&self) -> impl Iterator<Item = CoreResult<Zone>> {
        let ctx = Arc::clone(&self.ctx);
        paginate(move |token: Option<String>| {
            log::debug!("[{}] listing zones (token {token:?})", ctx.provider());
            let page = ctx.page(token);
            ctx.invoke(|| ctx.adapter.list_zones(&page))
        })
        .map(|zone| zone.map_err(CoreError::from))
    }

    /// Zones named `name`. Vendors that allow duplicate names may yield more
    /// than one.
    pub fn iter_by_name(&self, name: &str) -> impl Iterator<Item = CoreResult<Zone>> {
        let ctx = Arc::clone(&self.ctx);
        let wanted = normalize_domain_name(name);
        paginate_filtered(
            move |token: Option<String>| {
                let page = ctx.page(token);
                ctx.invoke(|| ctx.adapter.list_zones(&page))
            },
            move |zone: &Zone| normalize_domain_name(&zone.name) == wanted,
        )
        .map(|zone| zone.map_err(CoreError::from))
    }

    /// The first zone named `name`, if any.
    pub fn get_by_name(&self, name: &str) -> CoreResult<Option<Zone>> {
        self.iter_by_name(name).next().transpose()
    }

    /// Create a zone, or update the one with the same id.
    pub fn put(&self, zone: &Zone) -> CoreResult<Zone> {
        let stored = self.ctx.invoke(|| self.ctx.adapter.put_zone(zone))?;
        log::info!("[{}] put zone {}", self.ctx.provider(), stored.name);
        Ok(stored)
    }

    pub fn delete(&self, zone_id: &str) -> CoreResult<()> {
        self.ctx.invoke(|| self.ctx.adapter.delete_zone(zone_id))?;
        log::info!("[{}] deleted zone {zone_id}", self.ctx.provider());
        Ok(())
    }
}
