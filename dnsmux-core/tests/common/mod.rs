//! Shared test helpers and fixtures

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dnsmux_core::{ClientConfig, DnsClient};
use dnsmux_provider::{GroupDetail, ManualClock, MockProvider, RecordEntry, Zone};

/// Assert `Option` is `Some` and unwrap the inner value (fail the test otherwise).
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Assert `Result` is `Ok` and unwrap the inner value (fail the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

pub const ZONE: &str = "example.io.";
pub const WWW: &str = "www.example.io.";

/// An A row with a TTL.
pub fn a_row(name: &str, ttl: u32, address: &str) -> RecordEntry {
    RecordEntry::new(name, 1, vec![address.to_string()]).with_ttl(ttl)
}

pub fn europe() -> GroupDetail {
    GroupDetail {
        name: "europe".to_string(),
        regions: BTreeMap::from([(
            "Western Europe".to_string(),
            BTreeSet::from(["DE".to_string(), "FR".to_string()]),
        )]),
    }
}

/// A mock on a manual clock serving one empty zone, and a client over it.
pub struct Fixture {
    pub provider: Arc<MockProvider>,
    pub client: DnsClient,
    pub zone: Zone,
    pub clock: Arc<ManualClock>,
}

/// Pages are as large as the client asks for, up to `max_page_size`.
pub fn fixture(max_page_size: usize) -> Fixture {
    fixture_with(max_page_size, ClientConfig::default())
}

pub fn fixture_with(max_page_size: usize, config: ClientConfig) -> Fixture {
    let clock = Arc::new(ManualClock::at_epoch());
    let provider = Arc::new(
        MockProvider::builder()
            .max_page_size(max_page_size)
            .clock(clock.clone())
            .build(),
    );
    let zone = provider.add_zone(Zone::new(ZONE));
    let client = match DnsClient::builder(provider.clone())
        .config(config)
        .clock(clock.clone())
        .build()
    {
        Ok(client) => client,
        Err(e) => panic!("client config rejected: {e}"),
    };
    Fixture {
        provider,
        client,
        zone,
        clock,
    }
}
