//! In-memory DNS vendor
//!
//! Behaves like a remote vendor that authenticates with a session token and
//! hands out one row per record value, a page at a time. Failures can be
//! queued per operation to exercise classification and retries.

mod error;
mod provider;
mod store;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::classify::RuleClassifier;
use crate::error::Result;
use crate::session::{DEFAULT_SESSION_TTL, RefreshMode, SessionCache};
use crate::traits::{CredentialSource, RawApiError};
use crate::types::{CredentialRequirements, Credentials, GroupDetail, RecordEntry, Zone};
use crate::utils::clock::{Clock, SystemClock};

use store::Store;

pub(crate) const MOCK_ID: &str = "mock";
pub(crate) const MOCK_ENDPOINT: &str = "https://dns.mock.invalid/v1";
/// Default largest page
pub(crate) const DEFAULT_PAGE_SIZE: usize = 100;

/// Operations of [`MockProvider`], for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// Matches every operation when injecting a fault.
    Any,
    ListZones,
    PutZone,
    DeleteZone,
    ListEntries,
    ListGroupEntries,
    ResolveGroup,
    Create,
    Update,
    Delete,
}

/// A queued failure: `op` succeeds `skip` more times, then fails with
/// `error`.
pub(crate) struct Fault {
    pub(crate) op: MockOp,
    pub(crate) skip: usize,
    pub(crate) error: RawApiError,
}

/// Credentials and endpoint as currently configured; read by the session
/// cache on every call.
pub(crate) struct MockSettings {
    pub(crate) requirements: CredentialRequirements,
    pub(crate) credentials: Mutex<Option<Credentials>>,
    pub(crate) endpoint: Mutex<String>,
}

impl CredentialSource for MockSettings {
    fn credentials(&self) -> Result<Credentials> {
        let credentials = self.credentials.lock().clone();
        self.requirements.require(credentials.as_ref())?;
        Ok(credentials.unwrap_or_else(|| Credentials::list(Vec::<String>::new())))
    }

    fn endpoint(&self) -> String {
        self.endpoint.lock().clone()
    }
}

/// In-memory [`VendorAdapter`](crate::VendorAdapter).
///
/// # Construction
///
/// ```rust
/// use dnsmux_provider::{Credentials, MockProvider};
///
/// let provider = MockProvider::builder()
///     .credentials(Credentials::map([("username", "jdoe"), ("password", "pw")]))
///     .max_page_size(2)
///     .build();
/// ```
pub struct MockProvider {
    pub(crate) settings: Arc<MockSettings>,
    pub(crate) session: Arc<SessionCache<String>>,
    pub(crate) store: Mutex<Store>,
    pub(crate) faults: Mutex<VecDeque<Fault>>,
    pub(crate) calls: Mutex<Vec<MockOp>>,
    pub(crate) max_page_size: usize,
    pub(crate) classifier: RuleClassifier,
}

/// Builder for [`MockProvider`].
pub struct MockProviderBuilder {
    credentials: Option<Credentials>,
    endpoint: String,
    max_page_size: usize,
    session_ttl: Duration,
    refresh_mode: RefreshMode,
    clock: Arc<dyn Clock>,
}

impl MockProviderBuilder {
    fn new() -> Self {
        Self {
            credentials: Some(Credentials::map([
                ("username", "mock-user"),
                ("password", "mock-password"),
            ])),
            endpoint: MOCK_ENDPOINT.to_string(),
            max_page_size: DEFAULT_PAGE_SIZE,
            session_ttl: DEFAULT_SESSION_TTL,
            refresh_mode: RefreshMode::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Start without credentials; every call then fails validation.
    pub fn without_credentials(mut self) -> Self {
        self.credentials = None;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Largest page the vendor hands out, whatever the caller asks for
    /// (default: 100, minimum 1).
    pub fn max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    /// Lifetime of a session token (default: 60s).
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    /// Clock for session expiry and rate-limit hints.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the [`MockProvider`] instance.
    pub fn build(self) -> MockProvider {
        let settings = Arc::new(MockSettings {
            requirements: MockProvider::credential_requirements(),
            credentials: Mutex::new(self.credentials),
            endpoint: Mutex::new(self.endpoint),
        });
        let source: Arc<dyn CredentialSource> = settings.clone();
        let session = SessionCache::new(source, provider::login, self.session_ttl)
            .named(MOCK_ID)
            .with_clock(self.clock.clone())
            .with_refresh_mode(self.refresh_mode);

        MockProvider {
            settings,
            session: Arc::new(session),
            store: Mutex::new(Store::default()),
            faults: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            max_page_size: self.max_page_size,
            classifier: error::classifier(self.clock),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Vendor code: the zone, row or group does not exist.
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    /// Vendor code: a zone with that name exists already.
    pub const TARGET_EXISTS: &'static str = "TARGET_EXISTS";
    /// Vendor code: credentials missing or of the wrong shape.
    pub const MISSING_CREDENTIALS: &'static str = "MISSING_CREDENTIALS";
    /// Vendor code: another job is still running on this session.
    pub const OPERATION_IN_PROGRESS: &'static str = "OPERATION_IN_PROGRESS";
    /// Vendor code: the session token no longer matches the caller.
    pub const SESSION_MISMATCH: &'static str = "SESSION_MISMATCH";
    /// Vendor code: too many requests.
    pub const THROTTLED: &'static str = "THROTTLED";
    /// Vendor code: malformed request.
    pub const INVALID_INPUT: &'static str = "INVALID_INPUT";

    /// Creates a mock with default credentials and settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder for customizing the mock.
    pub fn builder() -> MockProviderBuilder {
        MockProviderBuilder::new()
    }

    pub(crate) fn credential_requirements() -> CredentialRequirements {
        CredentialRequirements::new(MOCK_ID).shape("password", &["username", "password"])
    }

    // ============ Configuration at runtime ============

    /// Replace the credentials, as a credential rotation would.
    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        *self.settings.credentials.lock() = credentials;
    }

    pub fn set_endpoint(&self, endpoint: impl Into<String>) {
        *self.settings.endpoint.lock() = endpoint.into();
    }

    // ============ Seeding and inspection ============

    /// Store a zone directly, assigning an id when it has none.
    pub fn add_zone(&self, zone: Zone) -> Zone {
        self.store.lock().upsert_zone(zone)
    }

    /// Store rows directly, adding the zone if needed and assigning ids to
    /// rows without one.
    pub fn add_entries(&self, zone: &Zone, entries: impl IntoIterator<Item = RecordEntry>) {
        let mut store = self.store.lock();
        let zone_id = store.upsert_zone(zone.clone()).id_or_name().to_string();
        for entry in entries {
            store.push_entry(zone_id.clone(), entry);
        }
    }

    /// Register the detail of a geo group.
    pub fn add_group(&self, group_id: impl Into<String>, detail: GroupDetail) {
        self.store.lock().groups.insert(group_id.into(), detail);
    }

    /// All rows of a zone in merge order.
    pub fn entries(&self, zone: &Zone) -> Vec<RecordEntry> {
        self.store.lock().entries_of(zone)
    }

    /// Fail the next call of `op` (or of any operation, for
    /// [`MockOp::Any`]) with `error`. Faults are consumed in order.
    pub fn inject_fault(&self, op: MockOp, error: RawApiError) {
        self.inject_fault_after(op, 0, error);
    }

    /// Like [`inject_fault`](Self::inject_fault), but let `successes` calls
    /// of `op` through first, e.g. to fail a listing on its second page.
    pub fn inject_fault_after(&self, op: MockOp, successes: usize, error: RawApiError) {
        self.faults.lock().push_back(Fault {
            op,
            skip: successes,
            error,
        });
    }

    /// Calls made of `op` so far, failed ones included; [`MockOp::Any`]
    /// counts all.
    pub fn calls(&self, op: MockOp) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|o| op == MockOp::Any || **o == op)
            .count()
    }

    /// Session tokens derived so far.
    pub fn session_derives(&self) -> usize {
        self.session.derive_count()
    }
}
