//! Bounded retry around vendor calls.
//!
//! [`Invoker::invoke`] runs a call, classifies any failure and decides:
//! validation and permanent errors return at once; transient errors are
//! retried (after invalidating the session if it no longer matches); rate
//! limited calls wait out the advised delay first. Once the retry budget is
//! spent the last error is returned with its own disposition and the number
//! of attempts made.

use std::sync::Arc;
use std::time::Duration;

use crate::classify::DEFAULT_MIN_RATE_LIMIT_DELAY;
use crate::error::{ClassifiedError, Disposition, Result};
use crate::traits::SessionHandle;
use crate::utils::clock::{Clock, SystemClock};

/// Longest wait for a rate limit before retrying.
pub const DEFAULT_MAX_RATE_LIMIT_DELAY: Duration = Duration::from_secs(30);

/// Retry budget and rate-limit waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-issues allowed after the first attempt.
    pub max_retries: u32,
    /// Wait used when a rate-limited error carries no `retry_after`.
    pub min_rate_limit_delay: Duration,
    /// Upper bound on any rate-limit wait.
    pub max_rate_limit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            min_rate_limit_delay: DEFAULT_MIN_RATE_LIMIT_DELAY,
            max_rate_limit_delay: DEFAULT_MAX_RATE_LIMIT_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// How long to wait before retrying `err`, given the current time.
    fn rate_limit_wait(
        &self,
        err: &ClassifiedError,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Duration {
        let wait = err.retry_after.map_or(self.min_rate_limit_delay, |at| {
            (at - now).to_std().unwrap_or(Duration::ZERO)
        });
        wait.min(self.max_rate_limit_delay)
    }
}

/// Runs vendor calls under a [`RetryPolicy`].
#[derive(Clone)]
pub struct Invoker {
    policy: RetryPolicy,
    session: Option<Arc<dyn SessionHandle>>,
    clock: Arc<dyn Clock>,
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("policy", &self.policy)
            .field("session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl Invoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            session: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Session to invalidate when a call fails with a session mismatch.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn SessionHandle>) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op`, classifying its failures with `classify` and retrying per
    /// the policy.
    pub fn invoke<T, E, Op, C>(&self, mut op: Op, classify: C) -> Result<T>
    where
        Op: FnMut() -> std::result::Result<T, E>,
        C: Fn(E) -> ClassifiedError,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let mut err = match op() {
                Ok(value) => return Ok(value),
                Err(raw) => classify(raw),
            };
            err.attempts = attempts;

            if !err.is_retryable() || attempts > self.policy.max_retries {
                if err.is_expected() {
                    log::warn!("[{}] {err}", err.provider);
                } else {
                    log::error!("[{}] {err}", err.provider);
                }
                return Err(err);
            }

            match err.disposition {
                Disposition::Transient if err.session_mismatch => {
                    log::warn!(
                        "[{}] session mismatch (attempt {attempts}), invalidating and retrying: {}",
                        err.provider,
                        err.message
                    );
                    if let Some(session) = &self.session {
                        session.invalidate();
                    }
                }
                Disposition::RateLimited => {
                    let wait = self.policy.rate_limit_wait(&err, self.clock.now());
                    log::warn!(
                        "[{}] rate limited (attempt {attempts}), retrying in {:.1}s",
                        err.provider,
                        wait.as_secs_f32()
                    );
                    if !wait.is_zero() {
                        self.clock.sleep(wait);
                    }
                }
                _ => {
                    log::warn!(
                        "[{}] transient failure (attempt {attempts}), retrying: {}",
                        err.provider,
                        err.message
                    );
                }
            }
        }
    }
}

/// [`Invoker::invoke`] with the default policy, no session and the system
/// clock.
pub fn invoke<T, E, Op, C>(op: Op, classify: C) -> Result<T>
where
    Op: FnMut() -> std::result::Result<T, E>,
    C: Fn(E) -> ClassifiedError,
{
    Invoker::default().invoke(op, classify)
}
