//! Record set predicates for [`RecordSetService::iter_matching`](crate::RecordSetService::iter_matching)
//!
//! ```rust
//! use dnsmux_core::filters::{and, name_equal_to, type_equal_to};
//! use dnsmux_core::RData;
//! use dnsmux_provider::ResourceRecordSet;
//!
//! let set = ResourceRecordSet::builder("www.example.io.", "A")
//!     .add(RData::from([("address".to_string(), "192.0.2.1".to_string())]))
//!     .build()?;
//! let www_a = and(name_equal_to("WWW.example.io"), type_equal_to("a"));
//! assert!(www_a(&set));
//! # Ok::<(), dnsmux_provider::ClassifiedError>(())
//! ```

use dnsmux_provider::common::normalize_domain_name;
use dnsmux_provider::{ProfileKind, ResourceRecordSet};

/// Owner name equal to `name`, ignoring case and a trailing dot.
pub fn name_equal_to(name: &str) -> impl Fn(&ResourceRecordSet) -> bool + use<> {
    let name = normalize_domain_name(name);
    move |set| normalize_domain_name(&set.name) == name
}

/// Record type equal to `record_type`, ignoring case.
pub fn type_equal_to(record_type: &str) -> impl Fn(&ResourceRecordSet) -> bool + use<> {
    let record_type = record_type.to_ascii_uppercase();
    move |set| set.record_type.eq_ignore_ascii_case(&record_type)
}

/// Qualifier equal to `qualifier`; `None` selects unqualified sets.
pub fn qualifier_equal_to(qualifier: Option<&str>) -> impl Fn(&ResourceRecordSet) -> bool + use<> {
    let qualifier = qualifier.map(str::to_string);
    move |set| set.qualifier == qualifier
}

/// Sets carrying a profile of `kind`.
pub fn with_profile(kind: ProfileKind) -> impl Fn(&ResourceRecordSet) -> bool {
    move |set| set.profile(kind).is_some()
}

/// Both predicates hold.
pub fn and<A, B>(a: A, b: B) -> impl Fn(&ResourceRecordSet) -> bool
where
    A: Fn(&ResourceRecordSet) -> bool,
    B: Fn(&ResourceRecordSet) -> bool,
{
    move |set| a(set) && b(set)
}
