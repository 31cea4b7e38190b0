//! Wall clock abstraction.
//!
//! The session cache measures its TTL and the retry policy waits out rate
//! limits through this trait, so tests can drive time by hand.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of "now" and a way to block until a later instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Block until `deadline`; returns immediately if it already passed.
    fn sleep_until(&self, deadline: DateTime<Utc>) {
        if let Ok(remaining) = (deadline - self.now()).to_std() {
            self.sleep(remaining);
        }
    }
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A clock that only moves when told to. `sleep` advances it instantly and
/// records the requested duration.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Starts at the Unix epoch.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::default())
    }

    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.lock();
        *now = now.checked_add_signed(by).unwrap_or(*now);
    }

    /// Durations passed to [`Clock::sleep`], in call order.
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::at_epoch();
        clock.sleep(Duration::from_secs(5));
        assert_eq!(clock.now().timestamp(), 5);
        assert_eq!(clock.slept(), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn sleep_until_past_deadline_does_not_sleep() {
        let clock = ManualClock::at_epoch();
        clock.advance(Duration::from_secs(10));
        clock.sleep_until(DateTime::from_timestamp(3, 0).unwrap());
        assert!(clock.slept().is_empty());
    }

    #[test]
    fn sleep_until_waits_remaining_time() {
        let clock = ManualClock::at_epoch();
        clock.advance(Duration::from_secs(1));
        clock.sleep_until(DateTime::from_timestamp(4, 0).unwrap());
        assert_eq!(clock.slept(), vec![Duration::from_secs(3)]);
        assert_eq!(clock.now().timestamp(), 4);
    }
}
