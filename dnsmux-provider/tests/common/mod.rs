//! Shared test helpers and fixtures

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dnsmux_provider::{
    GroupDetail, ManualClock, MockProvider, Page, RecordEntry, Result, Zone,
};

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

/// An A row with a TTL.
pub fn a_row(name: &str, ttl: u32, address: &str) -> RecordEntry {
    RecordEntry::new(name, 1, vec![address.to_string()]).with_ttl(ttl)
}

/// Pages served by index; every page but the last links to the next.
pub fn paged<T: Clone>(pages: Vec<Vec<T>>) -> impl FnMut(Option<usize>) -> Result<Page<T, usize>> {
    move |token| {
        let index = token.unwrap_or(0);
        let next = (index + 1 < pages.len()).then_some(index + 1);
        Ok(Page::new(pages[index].clone(), next))
    }
}

pub fn europe() -> GroupDetail {
    GroupDetail {
        name: "europe".to_string(),
        regions: BTreeMap::from([
            (
                "Western Europe".to_string(),
                BTreeSet::from(["DE".to_string(), "FR".to_string()]),
            ),
            (
                "Northern Europe".to_string(),
                BTreeSet::from(["SE".to_string()]),
            ),
        ]),
    }
}

/// A mock on a manual clock with one empty zone.
pub fn mock_with_zone(max_page_size: usize) -> (MockProvider, Zone, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_epoch());
    let provider = MockProvider::builder()
        .max_page_size(max_page_size)
        .clock(clock.clone())
        .build();
    let zone = provider.add_zone(Zone::new(ZONE));
    (provider, zone, clock)
}
