//! Time Source

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// 2000-01-01T00:00:00Z. Anything earlier means the clock has not synced yet.
pub const MIN_VALID_UTC: i64 = 946_684_800;

/// UTC time source in whole seconds
pub trait Clock {
    fn now_utc(&self) -> i64;

    /// Current time, or `None` while the clock is below [`MIN_VALID_UTC`]
    fn valid_utc(&self) -> Option<i64> {
        let now = self.now_utc();
        (now >= MIN_VALID_UTC).then_some(now)
    }
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now)),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsynced_clock_is_invalid() {
        let clock = ManualClock::new(3600);
        assert_eq!(clock.valid_utc(), None);

        clock.set(MIN_VALID_UTC);
        assert_eq!(clock.valid_utc(), Some(MIN_VALID_UTC));
    }

    #[test]
    fn test_clones_share_time() {
        let clock = ManualClock::new(MIN_VALID_UTC);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now_utc(), MIN_VALID_UTC + 5);
    }

    #[test]
    fn test_system_clock_is_valid() {
        assert!(SystemClock.valid_utc().is_some());
    }
}
