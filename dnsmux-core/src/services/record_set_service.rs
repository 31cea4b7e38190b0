//! Record set management service
//!
//! Reads page through the vendor's raw rows lazily and merge them into
//! record sets on the fly. Writes diff the desired set against the rows
//! currently stored and issue only the row calls needed to get there.

use std::collections::BTreeSet;
use std::sync::Arc;

use dnsmux_provider::rdata::{self, RData};
use dnsmux_provider::{
    ProfileKind, RecordEntry, ResourceRecordSet, Result, Zone, merge, paginate,
};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;

/// Row calls issued by [`RecordSetService::put`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordSetChanges {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl RecordSetChanges {
    /// The stored rows already matched the set.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// Rows stored for one record set and the vendor group they belong to.
struct StoredSet {
    group_id: Option<String>,
    rows: Vec<RecordEntry>,
}

/// Human-readable identity of a record set, for messages.
fn describe(name: &str, record_type: &str, qualifier: Option<&str>) -> String {
    match qualifier {
        Some(qualifier) => format!("{name} {record_type} ({qualifier})"),
        None => format!("{name} {record_type}"),
    }
}

fn parse_type(record_type: &str) -> CoreResult<u16> {
    rdata::type_code(record_type)
        .ok_or_else(|| CoreError::InvalidRecordSet(format!("unknown record type '{record_type}'")))
}

/// Re-check a caller-built set against the model invariants; the fields
/// are public, so it may not have come from the builder. The record type
/// comes back in upper case.
fn validated(set: &ResourceRecordSet) -> CoreResult<ResourceRecordSet> {
    let record_type = set.record_type.to_ascii_uppercase();
    let mut builder = ResourceRecordSet::builder(set.name.as_str(), record_type)
        .add_all(set.rdata.iter().cloned());
    if let Some(qualifier) = &set.qualifier {
        builder = builder.qualifier(qualifier.as_str());
    }
    if let Some(ttl) = set.ttl {
        builder = builder.ttl(ttl);
    }
    for profile in &set.profiles {
        builder = builder.profile(profile.clone());
    }
    builder
        .build()
        .map_err(|e| CoreError::InvalidRecordSet(e.message))
}

fn profile_key(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Geo => "geo",
        ProfileKind::Weighted => "weighted",
        ProfileKind::Alias => "alias",
    }
}

/// Record set management service, scoped to one zone
pub struct RecordSetService {
    ctx: Arc<ServiceContext>,
    zone: Zone,
}

impl RecordSetService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, zone: Zone) -> Self {
        Self { ctx, zone }
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    // ============ Reads ============

    /// Raw rows of the zone, optionally narrowed, one page per vendor call.
    fn rows(
        &self,
        name: Option<String>,
        type_code: Option<u16>,
    ) -> impl Iterator<Item = Result<RecordEntry>> {
        let ctx = Arc::clone(&self.ctx);
        let zone = self.zone.clone();
        paginate(move |token: Option<String>| {
            log::debug!(
                "[{}] listing rows of {} (token {token:?})",
                ctx.provider(),
                zone.name
            );
            let page = ctx.page(token);
            ctx.invoke(|| {
                ctx.adapter
                    .list_raw_entries(&zone, name.as_deref(), type_code, &page)
            })
        })
    }

    fn sets(
        &self,
        name: Option<String>,
        type_code: Option<u16>,
    ) -> impl Iterator<Item = CoreResult<ResourceRecordSet>> {
        let ctx = Arc::clone(&self.ctx);
        let zone = self.zone.clone();
        merge(self.rows(name, type_code))
            .with_group_resolver(move |group_id: &str| {
                ctx.invoke(|| ctx.adapter.resolve_group_detail(&zone, group_id))
            })
            .for_provider(self.ctx.provider())
            .map(|set| set.map_err(CoreError::from))
    }

    /// Every record set of the zone.
    pub fn iter(&self) -> impl Iterator<Item = CoreResult<ResourceRecordSet>> {
        self.sets(None, None)
    }

    /// Record sets of the zone that satisfy `filter` (see
    /// [`filters`](crate::filters)). Errors are passed through.
    pub fn iter_matching<P>(&self, filter: P) -> impl Iterator<Item = CoreResult<ResourceRecordSet>>
    where
        P: Fn(&ResourceRecordSet) -> bool,
    {
        self.iter()
            .filter(move |set| set.as_ref().map_or(true, |set| filter(set)))
    }

    /// Record sets owned by `name`, of any type.
    pub fn iter_by_name(&self, name: &str) -> impl Iterator<Item = CoreResult<ResourceRecordSet>> {
        self.sets(Some(name.to_string()), None)
    }

    /// Record sets owned by `name` of `record_type`: the unqualified set and
    /// every geo or weighted variant.
    pub fn iter_by_name_and_type(
        &self,
        name: &str,
        record_type: &str,
    ) -> CoreResult<impl Iterator<Item = CoreResult<ResourceRecordSet>>> {
        let type_code = parse_type(record_type)?;
        Ok(self.sets(Some(name.to_string()), Some(type_code)))
    }

    /// The unqualified record set of `name` and `record_type`.
    pub fn get_by_name_and_type(
        &self,
        name: &str,
        record_type: &str,
    ) -> CoreResult<Option<ResourceRecordSet>> {
        self.find(name, record_type, None)
    }

    pub fn get_by_name_type_and_qualifier(
        &self,
        name: &str,
        record_type: &str,
        qualifier: &str,
    ) -> CoreResult<Option<ResourceRecordSet>> {
        self.find(name, record_type, Some(qualifier))
    }

    fn find(
        &self,
        name: &str,
        record_type: &str,
        qualifier: Option<&str>,
    ) -> CoreResult<Option<ResourceRecordSet>> {
        for set in self.iter_by_name_and_type(name, record_type)? {
            let set = set?;
            if set.qualifier.as_deref() == qualifier {
                return Ok(Some(set));
            }
        }
        Ok(None)
    }

    // ============ Writes ============

    /// Replace the stored record set with `set`.
    ///
    /// Rows whose rdata is still wanted are kept (and updated when TTL or
    /// weight changed), missing rdata is created, and rows no longer wanted
    /// are deleted, in that order.
    pub fn put(&self, set: &ResourceRecordSet) -> CoreResult<RecordSetChanges> {
        let set = validated(set)?;
        let label = describe(&set.name, &set.record_type, set.qualifier.as_deref());
        if set.alias().is_some() {
            return Err(CoreError::InvalidRecordSet(format!(
                "{label}: alias sets cannot be written through {}",
                self.ctx.provider()
            )));
        }
        self.check_supported(&set, &label)?;

        let type_code = parse_type(&set.record_type)?;
        let wanted = set
            .rdata
            .iter()
            .map(|data| {
                rdata::to_values(&set.record_type, data)
                    .map(|values| (data, values))
                    .map_err(|e| CoreError::InvalidRecordSet(format!("{label}: {e}")))
            })
            .collect::<CoreResult<Vec<(&RData, Vec<String>)>>>()?;
        let weight = set.weight();

        let stored = match self.stored_set(&set.name, type_code, set.qualifier.as_deref())? {
            Some(stored) => stored,
            None if set.geo().is_some() => {
                return Err(CoreError::InvalidRecordSet(format!(
                    "{label}: no geo group named '{}' exists",
                    set.qualifier.as_deref().unwrap_or_default()
                )));
            }
            None => StoredSet {
                group_id: set.qualifier.clone(),
                rows: Vec::new(),
            },
        };

        let mut changes = RecordSetChanges::default();
        let mut surplus = stored.rows;
        let mut missing = Vec::new();
        for (data, values) in wanted {
            let matching = surplus.iter().position(|row| {
                rdata::from_values(&set.record_type, &row.rdata_values).is_ok_and(|d| d == *data)
            });
            let Some(i) = matching else {
                missing.push(values);
                continue;
            };
            let row = surplus.remove(i);
            if row.ttl == set.ttl && row.weight == weight {
                changes.unchanged += 1;
                continue;
            }
            let row = RecordEntry {
                ttl: set.ttl,
                weight,
                ..row
            };
            self.ctx
                .invoke(|| self.ctx.adapter.update_raw(&self.zone, &row))?;
            changes.updated += 1;
        }

        for values in missing {
            let row = RecordEntry {
                ttl: set.ttl,
                group_id: stored.group_id.clone(),
                weight,
                ..RecordEntry::new(set.name.as_str(), type_code, values)
            };
            self.ctx
                .invoke(|| self.ctx.adapter.create_raw(&self.zone, &row))?;
            changes.created += 1;
        }

        changes.deleted = self.delete_rows(&surplus)?;

        log::info!(
            "[{}] put {label} in {}: {} created, {} updated, {} deleted",
            self.ctx.provider(),
            self.zone.name,
            changes.created,
            changes.updated,
            changes.deleted
        );
        Ok(changes)
    }

    /// Delete the unqualified record set; returns the number of rows removed.
    pub fn delete_by_name_and_type(&self, name: &str, record_type: &str) -> CoreResult<usize> {
        self.delete(name, record_type, None)
    }

    pub fn delete_by_name_type_and_qualifier(
        &self,
        name: &str,
        record_type: &str,
        qualifier: &str,
    ) -> CoreResult<usize> {
        self.delete(name, record_type, Some(qualifier))
    }

    fn delete(&self, name: &str, record_type: &str, qualifier: Option<&str>) -> CoreResult<usize> {
        let label = describe(name, record_type, qualifier);
        let type_code = parse_type(record_type)?;
        let stored = self
            .stored_set(name, type_code, qualifier)?
            .ok_or_else(|| CoreError::RecordSetNotFound(label.clone()))?;

        let deleted = self.delete_rows(&stored.rows)?;
        log::info!(
            "[{}] deleted {label} from {} ({deleted} rows)",
            self.ctx.provider(),
            self.zone.name
        );
        Ok(deleted)
    }

    // ============ Helpers ============

    fn delete_rows(&self, rows: &[RecordEntry]) -> CoreResult<usize> {
        let mut deleted = 0;
        for row in rows {
            let Some(id) = row.id.as_deref() else {
                log::warn!(
                    "[{}] cannot delete {} {} without a row id",
                    self.ctx.provider(),
                    row.name,
                    row.record_type()
                );
                continue;
            };
            self.ctx
                .invoke(|| self.ctx.adapter.delete_raw(&self.zone, id))?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// The adapter must list the record type for the set's profile, or as a
    /// basic type when it has none.
    fn check_supported(&self, set: &ResourceRecordSet, label: &str) -> CoreResult<()> {
        let metadata = self.ctx.adapter.metadata();
        let record_type = set.record_type.to_ascii_uppercase();
        let supported = match set.profiles.first() {
            Some(profile) => metadata
                .profile_record_types
                .get(profile_key(profile.kind()))
                .is_some_and(|types| types.contains(&record_type)),
            None => metadata.basic_record_types.contains(&record_type),
        };
        if supported {
            Ok(())
        } else {
            Err(CoreError::InvalidRecordSet(format!(
                "{label}: not supported by {}",
                metadata.id
            )))
        }
    }

    /// Rows currently stored for the set `(name, type, qualifier)`.
    ///
    /// An unqualified set owns the rows without a group. A qualifier names
    /// either the group id directly (weighted pools, unresolved groups) or a
    /// geo group by its resolved name. `None` when nothing is stored.
    fn stored_set(
        &self,
        name: &str,
        type_code: u16,
        qualifier: Option<&str>,
    ) -> CoreResult<Option<StoredSet>> {
        let rows = self
            .rows(Some(name.to_string()), Some(type_code))
            .filter(|row| !matches!(row, Ok(row) if row.no_response))
            .collect::<Result<Vec<_>>>()?;

        let group_id = match qualifier {
            None => None,
            Some(qualifier) if rows.iter().any(|r| r.group_id.as_deref() == Some(qualifier)) => {
                Some(qualifier.to_string())
            }
            Some(qualifier) => match self.geo_group_named(&rows, qualifier)? {
                Some(group_id) => Some(group_id),
                None => return Ok(None),
            },
        };

        let rows: Vec<_> = rows
            .into_iter()
            .filter(|r| r.group_id == group_id)
            .collect();
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(StoredSet { group_id, rows }))
    }

    /// Id of the geo group among `rows` whose resolved name is `qualifier`.
    fn geo_group_named(&self, rows: &[RecordEntry], qualifier: &str) -> CoreResult<Option<String>> {
        let candidates: BTreeSet<&str> = rows
            .iter()
            .filter(|r| r.weight.is_none())
            .filter_map(|r| r.group_id.as_deref())
            .collect();
        for group_id in candidates {
            let detail = self
                .ctx
                .invoke(|| self.ctx.adapter.resolve_group_detail(&self.zone, group_id))?;
            if detail.name == qualifier {
                return Ok(Some(group_id.to_string()));
            }
        }
        Ok(None)
    }
}
