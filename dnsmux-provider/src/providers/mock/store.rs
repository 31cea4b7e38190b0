//! Backing storage of the mock vendor.

use std::collections::HashMap;

use crate::providers::common::normalize_domain_name;
use crate::traits::{RawApiError, RawResult};
use crate::types::{GroupDetail, Page, PageRequest, RecordEntry, Zone, sort_for_merge};

use super::MockProvider;

#[derive(Debug, Default)]
pub(crate) struct Store {
    zones: Vec<Zone>,
    /// Rows keyed by zone id.
    entries: HashMap<String, Vec<RecordEntry>>,
    pub(crate) groups: HashMap<String, GroupDetail>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn not_found(what: impl std::fmt::Display) -> RawApiError {
    RawApiError::with_code(MockProvider::NOT_FOUND, format!("{what} not found"))
}

impl Store {
    fn position(&self, zone: &Zone) -> Option<usize> {
        match &zone.id {
            Some(id) => self.zones.iter().position(|z| z.id.as_ref() == Some(id)),
            None => {
                let name = normalize_domain_name(&zone.name);
                self.zones
                    .iter()
                    .position(|z| normalize_domain_name(&z.name) == name)
            }
        }
    }

    /// Id of a stored zone, looked up by id or else by name.
    pub(crate) fn zone_id(&self, zone: &Zone) -> RawResult<String> {
        self.position(zone)
            .and_then(|i| self.zones[i].id.clone())
            .ok_or_else(|| not_found(format_args!("zone {}", zone.name)))
    }

    /// Zones ordered by name.
    pub(crate) fn zones(&self) -> Vec<Zone> {
        let mut zones = self.zones.clone();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        zones
    }

    /// Insert or update without conflict checks.
    pub(crate) fn upsert_zone(&mut self, zone: Zone) -> Zone {
        if let Some(i) = self.position(&zone) {
            let stored = &mut self.zones[i];
            stored.ttl = zone.ttl;
            stored.email = zone.email;
            return stored.clone();
        }
        let zone = Zone {
            id: zone.id.or_else(|| Some(new_id())),
            ..zone
        };
        self.zones.push(zone.clone());
        zone
    }

    /// Create or update a zone the way the remote API would: an unknown id
    /// is an error, and names are unique.
    pub(crate) fn put_zone(&mut self, zone: &Zone) -> RawResult<Zone> {
        let name = normalize_domain_name(&zone.name);
        let clash = self.zones.iter().any(|z| {
            normalize_domain_name(&z.name) == name && zone.id.is_some() && z.id != zone.id
        });
        if clash {
            return Err(RawApiError::with_code(
                MockProvider::TARGET_EXISTS,
                format!("zone {} already exists", zone.name),
            ));
        }
        if zone.id.is_some() && self.position(zone).is_none() {
            return Err(not_found(format_args!("zone {}", zone.id_or_name())));
        }
        Ok(self.upsert_zone(zone.clone()))
    }

    pub(crate) fn remove_zone(&mut self, zone_id: &str) -> RawResult<()> {
        let i = self
            .zones
            .iter()
            .position(|z| z.id.as_deref() == Some(zone_id))
            .ok_or_else(|| not_found(format_args!("zone {zone_id}")))?;
        self.zones.remove(i);
        self.entries.remove(zone_id);
        Ok(())
    }

    /// Rows of a zone in merge order; empty when the zone is unknown.
    pub(crate) fn entries_of(&self, zone: &Zone) -> Vec<RecordEntry> {
        let mut rows = self
            .zone_id(zone)
            .ok()
            .and_then(|id| self.entries.get(&id).cloned())
            .unwrap_or_default();
        sort_for_merge(&mut rows);
        rows
    }

    pub(crate) fn insert_entry(
        &mut self,
        zone: &Zone,
        entry: RecordEntry,
    ) -> RawResult<RecordEntry> {
        let zone_id = self.zone_id(zone)?;
        Ok(self.push_entry(zone_id, entry))
    }

    /// Append a row to a zone known to exist, assigning an id if needed.
    pub(crate) fn push_entry(&mut self, zone_id: String, entry: RecordEntry) -> RecordEntry {
        let entry = RecordEntry {
            id: entry.id.or_else(|| Some(new_id())),
            ..entry
        };
        self.entries.entry(zone_id).or_default().push(entry.clone());
        entry
    }

    pub(crate) fn update_entry(
        &mut self,
        zone: &Zone,
        entry: &RecordEntry,
    ) -> RawResult<RecordEntry> {
        let zone_id = self.zone_id(zone)?;
        let Some(id) = entry.id.as_deref() else {
            return Err(RawApiError::with_code(
                MockProvider::INVALID_INPUT,
                "record id is required for update",
            ));
        };
        let stored = self
            .entries
            .get_mut(&zone_id)
            .and_then(|rows| rows.iter_mut().find(|r| r.id.as_deref() == Some(id)))
            .ok_or_else(|| not_found(format_args!("record {id}")))?;
        *stored = entry.clone();
        Ok(entry.clone())
    }

    pub(crate) fn remove_entry(&mut self, zone: &Zone, entry_id: &str) -> RawResult<()> {
        let zone_id = self.zone_id(zone)?;
        let rows = self.entries.entry(zone_id).or_default();
        let before = rows.len();
        rows.retain(|r| r.id.as_deref() != Some(entry_id));
        if rows.len() == before {
            return Err(not_found(format_args!("record {entry_id}")));
        }
        Ok(())
    }
}

/// Cut one page out of `items`; the token is the offset of the page. The
/// page holds `request.page_size` items, capped at `max_size`.
pub(crate) fn page<T>(
    items: Vec<T>,
    request: &PageRequest,
    max_size: usize,
) -> RawResult<Page<T>> {
    let size = usize::try_from(request.page_size)
        .unwrap_or(usize::MAX)
        .clamp(1, max_size.max(1));
    let offset = match request.token.as_deref() {
        None => 0,
        Some(token) => token.parse::<usize>().map_err(|_| {
            RawApiError::with_code(
                MockProvider::INVALID_INPUT,
                format!("invalid page token '{token}'"),
            )
        })?,
    };
    let end = offset.saturating_add(size).min(items.len());
    let next_token = (end < items.len()).then(|| end.to_string());
    let items = items
        .into_iter()
        .skip(offset)
        .take(end.saturating_sub(offset))
        .collect();
    Ok(Page::new(items, next_token))
}
