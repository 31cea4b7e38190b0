//! Merge engine.
//!
//! Vendors hand out one row per record value. [`merge`] folds a sorted stream
//! of those rows into record sets with a single pass and one entry of
//! lookahead, so a source backed by a [`Paginator`](crate::Paginator) fetches
//! the next page only when the lookahead needs it.

use std::collections::HashMap;

use crate::error::{ClassifiedError, Result};
use crate::rdata;
use crate::traits::GroupResolver;
use crate::types::{GroupDetail, Profile, RecordEntry, ResourceRecordSet};

/// Resolver type of a merge without geo group lookups.
pub type NoResolver = fn(&str) -> Result<GroupDetail>;

/// Merge pre-sorted raw entries into record sets.
///
/// `entries` must be ordered by [`RecordEntry::cmp_for_merge`]. Rows marked
/// `no_response` are dropped. Without a group resolver, a geo row's group id
/// becomes the qualifier of its set; see
/// [`MergedRecordSets::with_group_resolver`].
pub fn merge<I>(entries: I) -> MergedRecordSets<I::IntoIter>
where
    I: IntoIterator<Item = Result<RecordEntry>>,
{
    MergedRecordSets {
        source: entries.into_iter(),
        provider: "merge".to_string(),
        peeked: None,
        done: false,
        resolver: None,
        groups: HashMap::new(),
    }
}

/// Lazy iterator of merged record sets. See [`merge`].
///
/// A source error discards the group being assembled and is yielded in its
/// place. The iterator is fused afterwards.
pub struct MergedRecordSets<I, R = NoResolver> {
    source: I,
    provider: String,
    peeked: Option<RecordEntry>,
    done: bool,
    resolver: Option<R>,
    /// Group details resolved so far, keyed by group id.
    groups: HashMap<String, GroupDetail>,
}

impl<I, R> MergedRecordSets<I, R>
where
    I: Iterator<Item = Result<RecordEntry>>,
    R: GroupResolver,
{
    /// Resolve geo group ids through `resolver`.
    ///
    /// Each distinct group id is looked up once for the lifetime of this
    /// iterator; the detail supplies the set's qualifier (the group name)
    /// and its geo profile.
    pub fn with_group_resolver<R2: GroupResolver>(self, resolver: R2) -> MergedRecordSets<I, R2> {
        MergedRecordSets {
            source: self.source,
            provider: self.provider,
            peeked: self.peeked,
            done: self.done,
            resolver: Some(resolver),
            groups: HashMap::new(),
        }
    }

    /// Adapter id used in errors raised while assembling sets.
    #[must_use]
    pub fn for_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Next usable entry from the source, skipping no-response rows.
    fn pull(&mut self) -> Option<Result<RecordEntry>> {
        loop {
            match self.source.next()? {
                Ok(entry) if entry.no_response => {
                    log::trace!(
                        "[{}] skipping no-response row {} {}",
                        self.provider,
                        entry.name,
                        entry.record_type()
                    );
                }
                other => return Some(other),
            }
        }
    }

    fn group_detail(&mut self, group_id: &str) -> Result<Option<GroupDetail>> {
        let Some(resolver) = &self.resolver else {
            return Ok(None);
        };
        if let Some(detail) = self.groups.get(group_id) {
            return Ok(Some(detail.clone()));
        }
        log::debug!("[{}] resolving group {group_id}", self.provider);
        let detail = resolver.resolve_group(group_id)?;
        self.groups.insert(group_id.to_string(), detail.clone());
        Ok(Some(detail))
    }

    fn assemble(&mut self, group: Vec<RecordEntry>) -> Result<ResourceRecordSet> {
        let head = &group[0];
        let record_type = head.record_type();
        let name = head.name.clone();
        let group_id = head.group_id.clone();

        // first non-null wins; later values are ignored
        let ttl = group.iter().find_map(|e| e.ttl);
        let weight = group.iter().find_map(|e| e.weight);

        let mut builder = ResourceRecordSet::builder(name, record_type.as_str());
        if let Some(ttl) = ttl {
            builder = builder.ttl(ttl);
        }
        for entry in &group {
            let data = rdata::from_values(&record_type, &entry.rdata_values).map_err(|e| {
                ClassifiedError::permanent(self.provider.clone(), e.to_string())
            })?;
            builder = builder.add(data);
        }

        if let Some(group_id) = group_id {
            match weight {
                Some(weight) => {
                    builder = builder
                        .qualifier(group_id)
                        .profile(Profile::weighted(weight)?);
                }
                None => match self.group_detail(&group_id)? {
                    Some(detail) => {
                        builder = builder
                            .qualifier(detail.name.as_str())
                            .profile(detail.to_profile()?);
                    }
                    None => builder = builder.qualifier(group_id),
                },
            }
        }

        builder.build()
    }
}

impl<I, R> Iterator for MergedRecordSets<I, R>
where
    I: Iterator<Item = Result<RecordEntry>>,
    R: GroupResolver,
{
    type Item = Result<ResourceRecordSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let first = match self.peeked.take() {
            Some(entry) => entry,
            None => match self.pull() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    return None;
                }
            },
        };

        let mut group = vec![first];
        loop {
            match self.pull() {
                Some(Ok(entry)) if entry.merge_key() == group[0].merge_key() => group.push(entry),
                Some(Ok(entry)) => {
                    self.peeked = Some(entry);
                    break;
                }
                Some(Err(err)) => {
                    log::debug!(
                        "[{}] dropping partial set {} {} after a failed fetch",
                        self.provider,
                        group[0].name,
                        group[0].record_type()
                    );
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        Some(self.assemble(group))
    }
}
