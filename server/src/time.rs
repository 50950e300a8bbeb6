//! Time source abstraction.
//!
//! Token issuance and expiry checks read the clock through [`TimeSource`] so
//! that tests can pin and advance time instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction over the wall clock.
pub trait TimeSource: Send + Sync {
    /// Current time in whole seconds since the Unix epoch.
    fn now_secs(&self) -> u64;
}

/// Real time source using the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> u64 {
        // Only fails if the system clock is set before 1970.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_secs())
    }
}

/// A clock that only moves when told to.
///
/// Backed by an atomic so it can be shared with a `TokenAuthority` that is
/// itself shared across request tasks.
#[derive(Debug)]
pub struct ManualTimeSource {
    current_secs: AtomicU64,
}

impl ManualTimeSource {
    #[must_use]
    pub const fn new(initial_secs: u64) -> Self {
        Self {
            current_secs: AtomicU64::new(initial_secs),
        }
    }

    /// Advance time by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .current_secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(secs))
            });
    }

    pub fn set(&self, secs: u64) {
        self.current_secs.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_secs(&self) -> u64 {
        self.current_secs.load(Ordering::SeqCst)
    }
}
