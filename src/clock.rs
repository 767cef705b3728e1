//! Time sources for the control loop.
//!
//! Every "timeout" in this crate is an elapsed-time comparison against a
//! stored timestamp, never a blocking wait. Components read the current time
//! through [`Clock`] so tests can step time forward deterministically.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// Clock backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually advanced clock with millisecond resolution.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Start at `start` past the Unix epoch.
    #[must_use]
    pub fn starting_at(start: Duration) -> Self {
        Self {
            millis: AtomicU64::new(duration_millis(start)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(duration_millis(by), Ordering::Relaxed);
    }

    /// Jump to an absolute offset from the epoch.
    pub fn set(&self, since_epoch: Duration) {
        self.millis
            .store(duration_millis(since_epoch), Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.millis.load(Ordering::Relaxed))
    }
}

/// Time elapsed from `earlier` to `now`, zero if `earlier` lies in the future.
#[must_use]
pub fn elapsed(now: SystemTime, earlier: SystemTime) -> Duration {
    now.duration_since(earlier).unwrap_or_default()
}

/// True when `since` is unset or more than `window` ago.
#[must_use]
pub fn window_elapsed(now: SystemTime, since: Option<SystemTime>, window: Duration) -> bool {
    since.is_none_or(|at| elapsed(now, at) > window)
}

fn duration_millis(d: Duration) -> u64 {
    d.as_millis().try_into().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::starting_at(Duration::from_secs(10));
        let start = clock.now();
        clock.advance(Duration::from_millis(250));
        assert_eq!(elapsed(clock.now(), start), Duration::from_millis(250));
    }

    #[test]
    fn elapsed_saturates_for_future_timestamps() {
        let now = UNIX_EPOCH + Duration::from_secs(5);
        let later = now + Duration::from_secs(1);
        assert_eq!(elapsed(now, later), Duration::ZERO);
    }

    #[test]
    fn window_is_strict() {
        let start = UNIX_EPOCH + Duration::from_secs(1);
        let window = Duration::from_millis(200);
        assert!(window_elapsed(start, None, window));
        assert!(!window_elapsed(start + window, Some(start), window));
        assert!(window_elapsed(
            start + window + Duration::from_millis(1),
            Some(start),
            window
        ));
    }
}
