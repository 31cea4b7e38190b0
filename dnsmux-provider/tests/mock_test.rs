//! The mechanisms composed over the in-memory adapter, the way a service
//! layer drives a real vendor.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{a_row, europe, mock_with_zone};
use dnsmux_provider::{
    Disposition, ErrorClassifier, Invoker, ManualClock, MockOp, MockProvider, PageRequest,
    RawApiError, Result, RetryPolicy, VendorAdapter, VendorMessage, Zone, merge, paginate,
};

/// Larger than any page the tests' mocks hand out.
const PAGE_SIZE: u32 = 100;

/// Every record set of `zone`, each page fetched through `invoker`.
fn record_sets(
    provider: &MockProvider,
    invoker: &Invoker,
    zone: &Zone,
) -> Result<Vec<dnsmux_provider::ResourceRecordSet>> {
    let rows = paginate(|token: Option<String>| {
        invoker.invoke(
            || {
                let page = PageRequest::new(token.clone(), PAGE_SIZE);
                provider.list_raw_entries(zone, None, None, &page)
            },
            |raw| provider.classify(raw),
        )
    });
    merge(rows)
        .with_group_resolver(|group_id: &str| {
            invoker.invoke(
                || provider.resolve_group_detail(zone, group_id),
                |raw| provider.classify(raw),
            )
        })
        .for_provider(provider.id())
        .collect()
}

fn invoker_for(provider: &MockProvider, clock: Arc<ManualClock>) -> Invoker {
    let mut invoker = Invoker::new(RetryPolicy::default()).with_clock(clock);
    if let Some(session) = provider.session() {
        invoker = invoker.with_session(session);
    }
    invoker
}

#[test]
fn test_sets_span_pages_and_groups() {
    let (provider, zone, clock) = mock_with_zone(2);
    provider.add_group("g-eu", europe());
    provider.add_entries(
        &zone,
        [
            a_row("www.example.io.", 300, "192.0.2.1"),
            a_row("www.example.io.", 300, "192.0.2.2"),
            a_row("www.example.io.", 300, "192.0.2.3"),
            a_row("www.example.io.", 60, "198.51.100.1").with_group("g-eu"),
            a_row("www.example.io.", 60, "198.51.100.2").with_group("g-eu"),
            a_row("www.example.io.", 60, "0.0.0.0")
                .with_group("g-eu")
                .no_response(),
        ],
    );
    let invoker = invoker_for(&provider, clock);

    let sets = require_ok!(record_sets(&provider, &invoker, &zone));
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].rdata.len(), 3);
    assert_eq!(sets[1].qualifier.as_deref(), Some("europe"));
    assert_eq!(sets[1].rdata.len(), 2);
    assert_eq!(provider.calls(MockOp::ListEntries), 3);
    assert_eq!(provider.calls(MockOp::ResolveGroup), 1);
}

#[test]
fn test_session_mismatch_invalidates_and_retries_once() {
    let (provider, zone, clock) = mock_with_zone(100);
    provider.add_entries(&zone, [a_row("www.example.io.", 300, "192.0.2.1")]);
    provider.inject_fault(
        MockOp::ListEntries,
        RawApiError::from_messages(vec![
            VendorMessage::coded("ILLEGAL_OPERATION", "IP address does not match current session"),
            VendorMessage::info("login: Login successful"),
        ]),
    );
    let invoker = invoker_for(&provider, clock);

    let sets = require_ok!(record_sets(&provider, &invoker, &zone));
    assert_eq!(sets.len(), 1);
    assert_eq!(provider.calls(MockOp::ListEntries), 2);
    assert_eq!(provider.session_derives(), 2);
}

#[test]
fn test_persistent_transient_surfaces_with_disposition() {
    let (provider, zone, clock) = mock_with_zone(100);
    for _ in 0..3 {
        provider.inject_fault(
            MockOp::ListEntries,
            RawApiError::with_code(
                MockProvider::OPERATION_IN_PROGRESS,
                "This session already has a job running",
            ),
        );
    }
    let invoker = invoker_for(&provider, clock);

    let err = require_some!(record_sets(&provider, &invoker, &zone).err());
    assert_eq!(err.disposition, Disposition::Transient);
    assert_eq!(err.attempts, 2);
    assert!(err.gave_up_after_retry());
    assert_eq!(provider.calls(MockOp::ListEntries), 2);
}

#[test]
fn test_rate_limit_waits_then_succeeds() {
    let (provider, zone, clock) = mock_with_zone(100);
    provider.add_entries(&zone, [a_row("www.example.io.", 300, "192.0.2.1")]);
    provider.inject_fault(
        MockOp::ListEntries,
        RawApiError::with_code(MockProvider::THROTTLED, "Rate exceeded").with_retry_after(4),
    );
    let invoker = invoker_for(&provider, clock.clone());

    require_ok!(record_sets(&provider, &invoker, &zone));
    assert_eq!(clock.slept(), vec![Duration::from_secs(4)]);
}

#[test]
fn test_permanent_is_verbatim_and_not_retried() {
    let (provider, _, clock) = mock_with_zone(100);
    let invoker = invoker_for(&provider, clock);
    let missing = Zone::new("missing.io.");

    let err = require_some!(record_sets(&provider, &invoker, &missing).err());
    assert_eq!(err.disposition, Disposition::Permanent);
    assert_eq!(err.code.as_deref(), Some(MockProvider::NOT_FOUND));
    assert_eq!(err.message, "zone missing.io. not found");
    assert_eq!(provider.calls(MockOp::ListEntries), 1);
}

#[test]
fn test_missing_credentials_is_validation() {
    let provider = MockProvider::builder().without_credentials().build();
    let invoker = Invoker::default();

    let err = require_some!(
        invoker
            .invoke(
                || provider.list_zones(&PageRequest::first(PAGE_SIZE)),
                |raw| provider.classify(raw),
            )
            .err()
    );
    assert_eq!(err.disposition, Disposition::Validation);
    assert_eq!(err.attempts, 1);
    assert!(err.message.contains("requires username,password"));
}

#[test]
fn test_group_entries_are_paged() {
    let (provider, zone, clock) = mock_with_zone(1);
    provider.add_entries(
        &zone,
        [
            a_row("www.example.io.", 60, "203.0.113.1").with_group("blue").with_weight(10),
            a_row("www.example.io.", 60, "203.0.113.2").with_group("blue").with_weight(10),
            a_row("www.example.io.", 60, "203.0.113.3").with_group("green").with_weight(30),
        ],
    );
    let invoker = invoker_for(&provider, clock);

    let blue = require_ok!(
        paginate(|token: Option<String>| {
            invoker.invoke(
                || {
                    let page = PageRequest::new(token.clone(), PAGE_SIZE);
                    provider.list_group_entries(&zone, "blue", &page)
                },
                |raw| provider.classify(raw),
            )
        })
        .collect::<Result<Vec<_>>>()
    );
    assert_eq!(blue.len(), 2);
    assert!(blue.iter().all(|e| e.weight == Some(10)));
    assert_eq!(provider.calls(MockOp::ListGroupEntries), 2);
}
