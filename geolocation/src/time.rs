//! Wall-clock abstraction.
//!
//! Readings carry epoch-millisecond timestamps, and the coordinator compares
//! them against "now" to decide cache hits. Reading "now" through [`Clock`]
//! lets tests pin it to the millisecond.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        epoch_millis(SystemTime::now())
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Convert a `SystemTime` to milliseconds since the Unix epoch.
///
/// Times before the epoch yield negative values.
///
/// # Example
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use geolocation::time::epoch_millis;
///
/// assert_eq!(epoch_millis(UNIX_EPOCH + Duration::from_millis(1_500)), 1_500);
/// ```
pub fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_close_to_now() {
        let expected = epoch_millis(SystemTime::now());
        let actual = SystemClock.now_millis();
        assert!((actual - expected).abs() < 1_000);
    }

    #[test]
    fn manual_clock_set_and_advance() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);

        clock.advance(Duration::from_millis(59_999));
        assert_eq!(clock.now_millis(), 60_999);

        clock.set(5);
        assert_eq!(clock.now_millis(), 5);
    }

    #[test]
    fn epoch_millis_before_epoch_is_negative() {
        let before = UNIX_EPOCH - Duration::from_millis(250);
        assert_eq!(epoch_millis(before), -250);
    }
}
