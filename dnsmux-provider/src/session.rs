//! Session cache.
//!
//! Adapters that authenticate with an expensive derived artifact (a login
//! token, signed headers, an account id) keep it in a [`SessionCache`]. The
//! cached value is reused until its TTL runs out, the credentials or the
//! endpoint change, or someone calls [`SessionCache::invalidate`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::traits::{CredentialSource, SessionHandle};
use crate::types::Credentials;
use crate::utils::clock::{Clock, SystemClock};

/// Default lifetime of a derived session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60);

/// What a caller does when it needs a refresh that another caller is
/// already performing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshMode {
    /// Wait for the refresh to finish and return its value.
    #[default]
    Block,
    /// Return the previous value, if there is one, without waiting.
    ServeStale,
}

/// Lifetime and refresh behavior of a [`SessionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub ttl: Duration,
    pub refresh_mode: RefreshMode,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            refresh_mode: RefreshMode::default(),
        }
    }
}

/// Derives the session value from the current credentials and endpoint.
pub type DeriveFn<V> = dyn Fn(&Credentials, &str) -> Result<V> + Send + Sync;

struct State<V> {
    value: Option<V>,
    fingerprint: String,
    endpoint: String,
    /// `None` until the first refresh and after an invalidation.
    expires_at: Option<DateTime<Utc>>,
}

impl<V> State<V> {
    fn is_fresh(&self, fingerprint: &str, endpoint: &str, now: DateTime<Utc>) -> bool {
        self.value.is_some()
            && self.expires_at.is_some_and(|at| now < at)
            && self.fingerprint == fingerprint
            && self.endpoint == endpoint
    }
}

/// Memoizes a value derived from credentials, safe to share across threads.
///
/// Fresh reads take only a shared lock. At most one `derive` runs at a time;
/// callers racing on a stale value re-check after acquiring the refresh lock
/// so the winner's value is reused instead of derived again.
pub struct SessionCache<V> {
    provider: String,
    source: Arc<dyn CredentialSource>,
    derive: Box<DeriveFn<V>>,
    settings: RwLock<SessionSettings>,
    clock: Arc<dyn Clock>,
    state: RwLock<State<V>>,
    refresh: Mutex<()>,
    derives: AtomicUsize,
}

impl<V: Clone> SessionCache<V> {
    pub fn new<D>(source: Arc<dyn CredentialSource>, derive: D, ttl: Duration) -> Self
    where
        D: Fn(&Credentials, &str) -> Result<V> + Send + Sync + 'static,
    {
        Self {
            provider: "session".to_string(),
            source,
            derive: Box::new(derive),
            settings: RwLock::new(SessionSettings {
                ttl,
                refresh_mode: RefreshMode::default(),
            }),
            clock: Arc::new(SystemClock),
            state: RwLock::new(State {
                value: None,
                fingerprint: String::new(),
                endpoint: String::new(),
                expires_at: None,
            }),
            refresh: Mutex::new(()),
            derives: AtomicUsize::new(0),
        }
    }

    /// Adapter id used in log lines.
    #[must_use]
    pub fn named(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.settings.get_mut().refresh_mode = mode;
        self
    }

    /// Replace the lifetime and refresh mode. A value derived earlier keeps
    /// the expiry it was given.
    pub fn configure(&self, settings: SessionSettings) {
        log::debug!("[{}] session settings {settings:?}", self.provider);
        *self.settings.write() = settings;
    }

    pub fn settings(&self) -> SessionSettings {
        *self.settings.read()
    }

    /// The current session value, deriving a new one when needed.
    ///
    /// Errors from reading the credentials or from `derive` are returned
    /// unchanged and leave the cached state as it was.
    pub fn get(&self) -> Result<V> {
        let credentials = self.source.credentials()?;
        let fingerprint = credentials.fingerprint();
        let endpoint = self.source.endpoint();

        if let Some(value) = self.fresh_value(&fingerprint, &endpoint) {
            return Ok(value);
        }

        let settings = self.settings();
        let _guard = match settings.refresh_mode {
            RefreshMode::Block => self.refresh.lock(),
            RefreshMode::ServeStale => match self.refresh.try_lock() {
                Some(guard) => guard,
                None => {
                    if let Some(stale) = self.state.read().value.clone() {
                        log::debug!("[{}] refresh in flight, serving stale session", self.provider);
                        return Ok(stale);
                    }
                    self.refresh.lock()
                }
            },
        };

        // another caller may have refreshed while we waited
        if let Some(value) = self.fresh_value(&fingerprint, &endpoint) {
            return Ok(value);
        }

        log::debug!("[{}] deriving session for {endpoint}", self.provider);
        let value = (self.derive)(&credentials, &endpoint)?;
        self.derives.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(settings.ttl).unwrap_or(chrono::Duration::MAX);
        *self.state.write() = State {
            value: Some(value.clone()),
            fingerprint,
            endpoint,
            expires_at: Some(now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)),
        };
        Ok(value)
    }

    /// Force the next [`get`](Self::get) to derive a new value.
    pub fn invalidate(&self) {
        log::debug!("[{}] session invalidated", self.provider);
        self.state.write().expires_at = None;
    }

    /// Number of successful `derive` calls so far.
    pub fn derive_count(&self) -> usize {
        self.derives.load(Ordering::Relaxed)
    }

    fn fresh_value(&self, fingerprint: &str, endpoint: &str) -> Option<V> {
        let state = self.state.read();
        state
            .is_fresh(fingerprint, endpoint, self.clock.now())
            .then(|| state.value.clone())
            .flatten()
    }
}

impl<V: Clone + Send + Sync> SessionHandle for SessionCache<V> {
    fn invalidate(&self) {
        SessionCache::invalidate(self);
    }

    fn configure(&self, settings: SessionSettings) {
        SessionCache::configure(self, settings);
    }
}

impl<V> fmt::Debug for SessionCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCache")
            .field("provider", &self.provider)
            .field("settings", &*self.settings.read())
            .field("derives", &self.derives.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
