use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ClassifiedError, Result};
use crate::rdata::{RData, type_name};
use crate::utils::log_sanitizer::redact;

// ============ Pagination ============

/// One page of a vendor listing.
///
/// `next_token` is the vendor's continuation marker (page number, opaque
/// cursor, "next record name", ...). `None` means this is the last page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T, K = String> {
    /// Items in vendor order.
    pub items: Vec<T>,
    /// Token for the following page, if there is one.
    pub next_token: Option<K>,
}

impl<T, K> Page<T, K> {
    pub fn new(items: Vec<T>, next_token: Option<K>) -> Self {
        Self { items, next_token }
    }

    /// A final page.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Which page of a listing to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// `next_token` of the previous page; `None` for the first page.
    pub token: Option<String>,
    /// Items wanted per page. Adapters cap it at their `max_page_size`.
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(token: Option<String>, page_size: u32) -> Self {
        Self { token, page_size }
    }

    pub fn first(page_size: u32) -> Self {
        Self::new(None, page_size)
    }
}

// ============ Zone ============

/// A DNS zone under management by one vendor account.
///
/// Identified by `name`; vendors that allow duplicate names distinguish them
/// by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Zone name (e.g. `"example.io."`).
    pub name: String,
    /// Vendor-specific zone id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Default TTL of the zone, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Administrative contact (SOA RNAME).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            ttl: None,
            email: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The id when the vendor assigned one, otherwise the name.
    pub fn id_or_name(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

// ============ Raw entries ============

/// One vendor-native record row, prior to grouping into a record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEntry {
    /// Vendor row id, needed to update or delete the row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owner name.
    pub name: String,
    /// Numeric record type (1 = A, 28 = AAAA, ...).
    pub type_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, with = "crate::utils::datetime")]
    pub created_at: Option<DateTime<Utc>>,
    /// Field values in wire order.
    pub rdata_values: Vec<String>,
    /// Geo group or weighted pool this row belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Weight of the row within a weighted pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    /// Vendor sentinel meaning "do not answer from this region". Such rows
    /// have no counterpart in the unified model and are dropped on merge.
    #[serde(default)]
    pub no_response: bool,
}

/// The key that groups raw entries into one record set.
pub type MergeKey<'a> = (&'a str, u16, Option<&'a str>);

impl RecordEntry {
    pub fn new(name: impl Into<String>, type_code: u16, rdata_values: Vec<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            type_code,
            ttl: None,
            created_at: None,
            rdata_values,
            group_id: None,
            weight: None,
            no_response: false,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    #[must_use]
    pub fn no_response(mut self) -> Self {
        self.no_response = true;
        self
    }

    /// Mnemonic of `type_code`.
    pub fn record_type(&self) -> String {
        type_name(self.type_code)
    }

    pub fn merge_key(&self) -> MergeKey<'_> {
        (&self.name, self.type_code, self.group_id.as_deref())
    }

    /// Ordering the merge engine expects its input in: by merge key, then
    /// creation time with undated rows first, then rdata. The rdata tiebreak
    /// keeps the order stable across endpoints that return equal timestamps
    /// in different orders.
    pub fn cmp_for_merge(&self, other: &Self) -> Ordering {
        self.merge_key()
            .cmp(&other.merge_key())
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.rdata_values.cmp(&other.rdata_values))
    }
}

/// Sort entries into the order [`merge`](crate::merge) requires.
pub fn sort_for_merge(entries: &mut [RecordEntry]) {
    entries.sort_by(RecordEntry::cmp_for_merge);
}

// ============ Profiles ============

/// The kind of a [`Profile`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Geo,
    Weighted,
    Alias,
}

/// A policy overlay on a record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Profile {
    /// Answer only to resolvers in the listed territories.
    #[serde(rename_all = "camelCase")]
    Geo {
        region_to_territories: BTreeMap<String, BTreeSet<String>>,
    },
    /// Share traffic with sibling sets in proportion to `weight`.
    Weighted { weight: u32 },
    /// Answer with the records of another name. The owning set has no rdata
    /// and no TTL of its own.
    #[serde(rename_all = "camelCase")]
    Alias {
        target_zone_id: String,
        target_name: String,
    },
}

impl Profile {
    /// A geo profile; at least one region must list at least one territory.
    /// Regions with no territories are dropped.
    pub fn geo(region_to_territories: BTreeMap<String, BTreeSet<String>>) -> Result<Self> {
        let regions: BTreeMap<_, _> = region_to_territories
            .into_iter()
            .filter(|(_, territories)| !territories.is_empty())
            .collect();
        if regions.is_empty() {
            return Err(ClassifiedError::validation(
                "model",
                "geo profile needs at least one region with at least one territory",
            ));
        }
        Ok(Self::Geo {
            region_to_territories: regions,
        })
    }

    /// A weighted profile; `weight` must be positive.
    pub fn weighted(weight: u32) -> Result<Self> {
        if weight == 0 {
            return Err(ClassifiedError::validation(
                "model",
                "weight must be greater than zero",
            ));
        }
        Ok(Self::Weighted { weight })
    }

    pub fn alias(target_zone_id: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self::Alias {
            target_zone_id: target_zone_id.into(),
            target_name: target_name.into(),
        }
    }

    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::Geo { .. } => ProfileKind::Geo,
            Self::Weighted { .. } => ProfileKind::Weighted,
            Self::Alias { .. } => ProfileKind::Alias,
        }
    }
}

/// Metadata of a geo group, resolved by a separate (more expensive) vendor
/// call than the one listing its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    /// Group name, used as the record set qualifier.
    pub name: String,
    pub regions: BTreeMap<String, BTreeSet<String>>,
}

impl GroupDetail {
    pub fn to_profile(&self) -> Result<Profile> {
        Profile::geo(self.regions.clone())
    }
}

// ============ Record sets ============

/// Identity of a record set: `(name, type, qualifier)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSetKey {
    pub name: String,
    pub record_type: String,
    pub qualifier: Option<String>,
}

/// The unified, vendor-independent representation of one or more
/// same-name/type DNS records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    /// Distinguishes sets sharing name and type (geo group, weighted pool
    /// member). `None` is "the" unqualified set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub rdata: Vec<RData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
}

impl ResourceRecordSet {
    pub fn builder(name: impl Into<String>, record_type: impl Into<String>) -> RecordSetBuilder {
        RecordSetBuilder {
            name: name.into(),
            record_type: record_type.into(),
            qualifier: None,
            ttl: None,
            rdata: Vec::new(),
            profiles: Vec::new(),
        }
    }

    pub fn key(&self) -> RecordSetKey {
        RecordSetKey {
            name: self.name.clone(),
            record_type: self.record_type.clone(),
            qualifier: self.qualifier.clone(),
        }
    }

    pub fn profile(&self, kind: ProfileKind) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.kind() == kind)
    }

    pub fn geo(&self) -> Option<&BTreeMap<String, BTreeSet<String>>> {
        match self.profile(ProfileKind::Geo)? {
            Profile::Geo {
                region_to_territories,
            } => Some(region_to_territories),
            _ => None,
        }
    }

    pub fn weight(&self) -> Option<u32> {
        match self.profile(ProfileKind::Weighted)? {
            Profile::Weighted { weight } => Some(*weight),
            _ => None,
        }
    }

    /// `(target_zone_id, target_name)` of an alias set.
    pub fn alias(&self) -> Option<(&str, &str)> {
        match self.profile(ProfileKind::Alias)? {
            Profile::Alias {
                target_zone_id,
                target_name,
            } => Some((target_zone_id, target_name)),
            _ => None,
        }
    }
}

/// Builder for [`ResourceRecordSet`] that enforces the model invariants.
#[derive(Debug, Clone)]
pub struct RecordSetBuilder {
    name: String,
    record_type: String,
    qualifier: Option<String>,
    ttl: Option<u32>,
    rdata: Vec<RData>,
    profiles: Vec<Profile>,
}

impl RecordSetBuilder {
    #[must_use]
    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    #[must_use]
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn add(mut self, rdata: RData) -> Self {
        self.rdata.push(rdata);
        self
    }

    #[must_use]
    pub fn add_all(mut self, rdata: impl IntoIterator<Item = RData>) -> Self {
        self.rdata.extend(rdata);
        self
    }

    #[must_use]
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Checks:
    /// - name and type are non-empty
    /// - at most one profile of each kind
    /// - an alias set has no rdata and no TTL; any other set has rdata
    /// - a geo or weighted set carries a qualifier
    pub fn build(self) -> Result<ResourceRecordSet> {
        let invalid = |msg: String| -> Result<ResourceRecordSet> {
            Err(ClassifiedError::validation("model", msg))
        };

        if self.name.is_empty() || self.record_type.is_empty() {
            return invalid("record set needs a name and a type".to_string());
        }

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if !seen.insert(profile.kind()) {
                return invalid(format!(
                    "{} {}: duplicate {:?} profile",
                    self.name,
                    self.record_type,
                    profile.kind()
                ));
            }
        }

        let is_alias = self.profiles.iter().any(|p| p.kind() == ProfileKind::Alias);
        if is_alias && (!self.rdata.is_empty() || self.ttl.is_some()) {
            return invalid(format!(
                "{} {}: alias sets carry neither rdata nor ttl",
                self.name, self.record_type
            ));
        }
        if !is_alias && self.rdata.is_empty() {
            return invalid(format!(
                "{} {}: at least one rdata value is required",
                self.name, self.record_type
            ));
        }

        let needs_qualifier = self
            .profiles
            .iter()
            .any(|p| matches!(p.kind(), ProfileKind::Geo | ProfileKind::Weighted));
        if needs_qualifier && self.qualifier.is_none() {
            return invalid(format!(
                "{} {}: geo and weighted sets need a qualifier",
                self.name, self.record_type
            ));
        }

        Ok(ResourceRecordSet {
            name: self.name,
            record_type: self.record_type,
            qualifier: self.qualifier,
            ttl: self.ttl,
            rdata: self.rdata,
            profiles: self.profiles,
        })
    }
}

// ============ Credentials ============

/// Credentials handed to an adapter.
///
/// Equality and hashing are structural; the session cache compares
/// [`fingerprint`](Self::fingerprint)s to notice rotated credentials.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "form", content = "values", rename_all = "camelCase")]
pub enum Credentials {
    /// Positional secrets, e.g. `[customer, username, password]`.
    List(Vec<String>),
    /// Named secrets, e.g. `{accessKey, secretKey}`.
    Map(BTreeMap<String, String>),
}

impl Credentials {
    pub fn list<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    pub fn map<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Self::List(values) => values.len(),
            Self::Map(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// SHA-256 over a length-prefixed canonical encoding, hex encoded.
    ///
    /// Stable across processes; map entries are hashed in key order.
    pub fn fingerprint(&self) -> String {
        fn feed(hasher: &mut Sha256, s: &str) {
            hasher.update((s.len() as u64).to_be_bytes());
            hasher.update(s.as_bytes());
        }

        let mut hasher = Sha256::new();
        match self {
            Self::List(values) => {
                hasher.update(b"L");
                for v in values {
                    feed(&mut hasher, v);
                }
            }
            Self::Map(values) => {
                hasher.update(b"M");
                for (k, v) in values {
                    feed(&mut hasher, k);
                    feed(&mut hasher, v);
                }
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Value of a named parameter, positional credentials resolved through
    /// `names` (the parameter names of the matching shape).
    pub fn get<'a>(&'a self, names: &[&str], key: &str) -> Option<&'a str> {
        match self {
            Self::Map(values) => values.get(key).map(String::as_str),
            Self::List(values) => names
                .iter()
                .position(|n| *n == key)
                .and_then(|i| values.get(i))
                .map(String::as_str),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(values) => f
                .debug_tuple("List")
                .field(&values.iter().map(|v| redact(v)).collect::<Vec<_>>())
                .finish(),
            Self::Map(values) => f
                .debug_tuple("Map")
                .field(
                    &values
                        .iter()
                        .map(|(k, v)| (k.as_str(), redact(v)))
                        .collect::<BTreeMap<_, _>>(),
                )
                .finish(),
        }
    }
}

/// The credential shapes an adapter accepts, keyed by a label (e.g.
/// `"password"`, `"accessKey"`), each listing its parameter names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequirements {
    pub provider: String,
    pub shapes: BTreeMap<String, Vec<String>>,
}

impl CredentialRequirements {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            shapes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn shape(mut self, label: impl Into<String>, parameters: &[&str]) -> Self {
        self.shapes.insert(
            label.into(),
            parameters.iter().map(|p| (*p).to_string()).collect(),
        );
        self
    }

    /// Whether no credentials are needed at all.
    pub fn is_anonymous(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Label of the first shape `credentials` satisfy.
    ///
    /// List credentials match a shape by count; map credentials match when
    /// every parameter is present and non-blank.
    pub fn matching_shape(&self, credentials: &Credentials) -> Option<&str> {
        self.shapes
            .iter()
            .find(|(_, params)| match credentials {
                Credentials::List(values) => {
                    values.len() == params.len() && values.iter().all(|v| !v.trim().is_empty())
                }
                Credentials::Map(values) => params
                    .iter()
                    .all(|p| values.get(p).is_some_and(|v| !v.trim().is_empty())),
            })
            .map(|(label, _)| label.as_str())
    }

    /// Fail with a Validation error naming the accepted shapes when
    /// `credentials` match none of them.
    pub fn require(&self, credentials: Option<&Credentials>) -> Result<()> {
        if self.is_anonymous() {
            return Ok(());
        }
        let matched = credentials
            .filter(|c| !c.is_empty())
            .and_then(|c| self.matching_shape(c));
        if matched.is_some() {
            return Ok(());
        }

        let expected = self
            .shapes
            .values()
            .map(|params| params.join(","))
            .collect::<Vec<_>>()
            .join(" or ");
        let message = match credentials {
            Some(c) if !c.is_empty() => format!(
                "incorrect credentials supplied. {} requires {expected}",
                self.provider
            ),
            _ => format!(
                "no credentials supplied. {} requires {expected}",
                self.provider
            ),
        };
        Err(ClassifiedError::validation(self.provider.clone(), message))
    }
}

// ============ Provider metadata ============

/// Self-description of a vendor adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    /// Adapter id (e.g. `"mock"`).
    pub id: String,
    /// Base URL of the vendor API.
    pub url: String,
    /// Whether several zones may share a name (told apart by id).
    pub supports_duplicate_zone_names: bool,
    pub credentials: CredentialRequirements,
    /// Record types supported without a profile.
    pub basic_record_types: BTreeSet<String>,
    /// Record types supported per profile kind.
    pub profile_record_types: BTreeMap<String, BTreeSet<String>>,
    /// Largest page the vendor's listing calls return.
    pub max_page_size: u32,
}
