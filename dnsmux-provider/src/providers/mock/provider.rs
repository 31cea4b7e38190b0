//! Mock `VendorAdapter` implementation

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{ClassifiedError, Disposition, Result};
use crate::providers::common::normalize_domain_name;
use crate::traits::{CredentialSource, RawApiError, RawResult, SessionHandle, VendorAdapter};
use crate::types::{
    Credentials, GroupDetail, Page, PageRequest, ProviderMetadata, RecordEntry, Zone,
};

use super::store::page;
use super::{MOCK_ID, MockOp, MockProvider};

/// Record types the mock accepts without a profile.
const BASIC_RECORD_TYPES: &[&str] = &[
    "A", "AAAA", "CAA", "CERT", "CNAME", "DS", "MX", "NAPTR", "NS", "PTR", "SPF", "SRV", "SSHFP",
    "TXT",
];
const GEO_RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME", "MX", "TXT"];
const WEIGHTED_RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME"];

/// Session derivation: a real vendor would log in here.
pub(crate) fn login(credentials: &Credentials, endpoint: &str) -> Result<String> {
    log::debug!(
        "[{MOCK_ID}] login to {endpoint} with {} credential values",
        credentials.len()
    );
    Ok(format!("mock-session-{}", uuid::Uuid::new_v4()))
}

/// The session cache fails with classified errors; hand them back as the
/// vendor payload they stand for.
fn session_error(err: ClassifiedError) -> RawApiError {
    let code = match err.disposition {
        Disposition::Validation => Some(MockProvider::MISSING_CREDENTIALS.to_string()),
        _ => err.code,
    };
    RawApiError {
        code,
        message: err.message,
        messages: err.details,
        ..RawApiError::default()
    }
}

fn type_set(types: &[&str]) -> BTreeSet<String> {
    types.iter().map(|t| (*t).to_string()).collect()
}

impl MockProvider {
    /// Count the call, make sure a session exists, then fail with the next
    /// queued fault for `op`, if any.
    fn begin(&self, op: MockOp) -> RawResult<()> {
        self.calls.lock().push(op);
        self.session.get().map_err(session_error)?;

        let fault = {
            let mut faults = self.faults.lock();
            let Some(i) = faults
                .iter()
                .position(|f| f.op == MockOp::Any || f.op == op)
            else {
                return Ok(());
            };
            if faults[i].skip > 0 {
                faults[i].skip -= 1;
                return Ok(());
            }
            faults.remove(i)
        };
        match fault {
            Some(fault) => {
                log::debug!("[{MOCK_ID}] injected fault for {op:?}: {}", fault.error);
                Err(fault.error)
            }
            None => Ok(()),
        }
    }
}

impl CredentialSource for MockProvider {
    fn credentials(&self) -> Result<Credentials> {
        self.settings.credentials()
    }

    fn endpoint(&self) -> String {
        self.settings.endpoint()
    }
}

impl VendorAdapter for MockProvider {
    fn id(&self) -> &'static str {
        MOCK_ID
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            id: MOCK_ID.to_string(),
            url: self.settings.endpoint(),
            supports_duplicate_zone_names: false,
            credentials: MockProvider::credential_requirements(),
            basic_record_types: type_set(BASIC_RECORD_TYPES),
            profile_record_types: BTreeMap::from([
                ("geo".to_string(), type_set(GEO_RECORD_TYPES)),
                ("weighted".to_string(), type_set(WEIGHTED_RECORD_TYPES)),
            ]),
            max_page_size: u32::try_from(self.max_page_size).unwrap_or(u32::MAX),
        }
    }

    fn list_zones(&self, request: &PageRequest) -> RawResult<Page<Zone>> {
        self.begin(MockOp::ListZones)?;
        let zones = self.store.lock().zones();
        page(zones, request, self.max_page_size)
    }

    fn put_zone(&self, zone: &Zone) -> RawResult<Zone> {
        self.begin(MockOp::PutZone)?;
        self.store.lock().put_zone(zone)
    }

    fn delete_zone(&self, zone_id: &str) -> RawResult<()> {
        self.begin(MockOp::DeleteZone)?;
        self.store.lock().remove_zone(zone_id)
    }

    fn list_raw_entries(
        &self,
        zone: &Zone,
        name: Option<&str>,
        type_code: Option<u16>,
        request: &PageRequest,
    ) -> RawResult<Page<RecordEntry>> {
        self.begin(MockOp::ListEntries)?;
        let rows = {
            let store = self.store.lock();
            store.zone_id(zone)?;
            store.entries_of(zone)
        };
        let name = name.map(normalize_domain_name);
        let rows = rows
            .into_iter()
            .filter(|r| {
                name.as_deref()
                    .is_none_or(|n| normalize_domain_name(&r.name) == n)
            })
            .filter(|r| type_code.is_none_or(|t| r.type_code == t))
            .collect();
        page(rows, request, self.max_page_size)
    }

    fn list_group_entries(
        &self,
        zone: &Zone,
        group_id: &str,
        request: &PageRequest,
    ) -> RawResult<Page<RecordEntry>> {
        self.begin(MockOp::ListGroupEntries)?;
        let rows = {
            let store = self.store.lock();
            store.zone_id(zone)?;
            store.entries_of(zone)
        };
        let rows = rows
            .into_iter()
            .filter(|r| r.group_id.as_deref() == Some(group_id))
            .collect();
        page(rows, request, self.max_page_size)
    }

    fn resolve_group_detail(&self, zone: &Zone, group_id: &str) -> RawResult<GroupDetail> {
        self.begin(MockOp::ResolveGroup)?;
        let store = self.store.lock();
        store.zone_id(zone)?;
        store.groups.get(group_id).cloned().ok_or_else(|| {
            RawApiError::with_code(
                MockProvider::NOT_FOUND,
                format!("group {group_id} not found"),
            )
        })
    }

    fn create_raw(&self, zone: &Zone, entry: &RecordEntry) -> RawResult<RecordEntry> {
        self.begin(MockOp::Create)?;
        let entry = RecordEntry {
            id: None,
            ..entry.clone()
        };
        self.store.lock().insert_entry(zone, entry)
    }

    fn update_raw(&self, zone: &Zone, entry: &RecordEntry) -> RawResult<RecordEntry> {
        self.begin(MockOp::Update)?;
        self.store.lock().update_entry(zone, entry)
    }

    fn delete_raw(&self, zone: &Zone, entry_id: &str) -> RawResult<()> {
        self.begin(MockOp::Delete)?;
        self.store.lock().remove_entry(zone, entry_id)
    }

    fn session(&self) -> Option<Arc<dyn SessionHandle>> {
        Some(self.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorClassifier;

    fn zone(provider: &MockProvider) -> Zone {
        provider.add_zone(Zone::new("example.io."))
    }

    fn a(name: &str, address: &str) -> RecordEntry {
        RecordEntry::new(name, 1, vec![address.to_string()]).with_ttl(300)
    }

    #[test]
    fn lists_entries_a_page_at_a_time() {
        let provider = MockProvider::builder().max_page_size(2).build();
        let zone = zone(&provider);
        provider.add_entries(
            &zone,
            [
                a("www.example.io.", "192.0.2.3"),
                a("www.example.io.", "192.0.2.1"),
                a("api.example.io.", "192.0.2.2"),
            ],
        );

        let first = provider
            .list_raw_entries(&zone, None, None, &PageRequest::first(100))
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].name, "api.example.io.");
        let second = provider
            .list_raw_entries(&zone, None, None, &PageRequest::new(first.next_token, 100))
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_token.is_none());
        assert_eq!(provider.calls(MockOp::ListEntries), 2);
    }

    #[test]
    fn narrows_by_name_and_type() {
        let provider = MockProvider::new();
        let zone = zone(&provider);
        provider.add_entries(
            &zone,
            [
                a("www.example.io.", "192.0.2.1"),
                RecordEntry::new("www.example.io.", 28, vec!["2001:db8::1".into()]),
                a("api.example.io.", "192.0.2.2"),
            ],
        );
        let page = provider
            .list_raw_entries(&zone, Some("WWW.example.io"), Some(28), &PageRequest::first(10))
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].type_code, 28);
    }

    #[test]
    fn unknown_zone_is_not_found() {
        let provider = MockProvider::new();
        let err = provider
            .list_raw_entries(&Zone::new("missing.io."), None, None, &PageRequest::first(10))
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some(MockProvider::NOT_FOUND));
    }

    #[test]
    fn create_update_delete_rows() {
        let provider = MockProvider::new();
        let zone = zone(&provider);

        let created = provider
            .create_raw(&zone, &a("www.example.io.", "192.0.2.1"))
            .unwrap();
        let id = created.id.clone().unwrap();

        let updated = provider
            .update_raw(&zone, &created.clone().with_ttl(60))
            .unwrap();
        assert_eq!(updated.ttl, Some(60));
        assert_eq!(provider.entries(&zone)[0].ttl, Some(60));

        provider.delete_raw(&zone, &id).unwrap();
        assert!(provider.entries(&zone).is_empty());
        let again = provider.delete_raw(&zone, &id).unwrap_err();
        assert_eq!(again.code.as_deref(), Some(MockProvider::NOT_FOUND));
    }

    #[test]
    fn session_is_derived_once_and_reused() {
        let provider = MockProvider::new();
        provider.list_zones(&PageRequest::first(10)).unwrap();
        provider.list_zones(&PageRequest::first(10)).unwrap();
        assert_eq!(provider.session_derives(), 1);
    }

    #[test]
    fn rotated_credentials_derive_new_session() {
        let provider = MockProvider::new();
        provider.list_zones(&PageRequest::first(10)).unwrap();
        provider.set_credentials(Some(Credentials::map([
            ("username", "mock-user"),
            ("password", "rotated"),
        ])));
        provider.list_zones(&PageRequest::first(10)).unwrap();
        assert_eq!(provider.session_derives(), 2);
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let provider = MockProvider::builder().without_credentials().build();
        let raw = provider.list_zones(&PageRequest::first(10)).unwrap_err();
        let err = provider.classify(raw);
        assert_eq!(err.disposition, Disposition::Validation);
        assert_eq!(
            err.message,
            "no credentials supplied. mock requires username,password"
        );
    }

    #[test]
    fn faults_are_consumed_in_order() {
        let provider = MockProvider::new();
        provider.inject_fault(
            MockOp::PutZone,
            RawApiError::with_code(MockProvider::OPERATION_IN_PROGRESS, "job running"),
        );
        assert!(provider.list_zones(&PageRequest::first(10)).is_ok());
        assert!(provider.put_zone(&Zone::new("a.io.")).is_err());
        assert!(provider.put_zone(&Zone::new("a.io.")).is_ok());
        assert_eq!(provider.calls(MockOp::PutZone), 2);
        assert_eq!(provider.calls(MockOp::Any), 3);
    }

    #[test]
    fn delayed_fault_lets_calls_through_first() {
        let provider = MockProvider::new();
        provider.inject_fault_after(
            MockOp::ListZones,
            1,
            RawApiError::with_code(MockProvider::NOT_FOUND, "gone"),
        );
        let page = PageRequest::first(10);
        assert!(provider.put_zone(&Zone::new("a.io.")).is_ok());
        assert!(provider.list_zones(&page).is_ok());
        assert!(provider.list_zones(&page).is_err());
        assert!(provider.list_zones(&page).is_ok());
    }

    #[test]
    fn metadata_describes_the_mock() {
        let provider = MockProvider::builder().max_page_size(25).build();
        let meta = provider.metadata();
        assert_eq!(meta.id, "mock");
        assert_eq!(meta.max_page_size, 25);
        assert!(meta.basic_record_types.contains("MX"));
        assert!(meta.profile_record_types["weighted"].contains("A"));
        assert!(!meta.credentials.is_anonymous());
    }

    #[test]
    fn resolves_registered_groups() {
        let provider = MockProvider::new();
        let zone = zone(&provider);
        let detail = GroupDetail {
            name: "europe".into(),
            regions: BTreeMap::from([("Europe".into(), BTreeSet::from(["DE".to_string()]))]),
        };
        provider.add_group("g-1", detail.clone());
        assert_eq!(provider.resolve_group_detail(&zone, "g-1").unwrap(), detail);
        assert!(provider.resolve_group_detail(&zone, "g-2").is_err());
    }
}
