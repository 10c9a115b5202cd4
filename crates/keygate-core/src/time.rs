//! Clock abstraction for time-dependent checks.
//!
//! Assertion expiry and plaintext lifetimes are evaluated against an injected
//! [`Clock`] so tests can move time deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current Unix time in milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to. Clones share state.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(initial_millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(initial_millis)),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1_704_067_200_000) // 2024-01-01 00:00:00 UTC
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_reasonable() {
        let now = SystemClock.now_millis();
        assert!(now > 1_577_836_800_000, "after 2020");
        assert!(now < 4_102_444_800_000, "before 2100");
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let a = ManualClock::new(1_000);
        let b = a.clone();
        a.advance(500);
        assert_eq!(b.now_millis(), 1_500);
        b.set(42);
        assert_eq!(a.now_millis(), 42);
    }
}
