//! ## parkgate-core::time
//! **Virtual clock shared by every admission decision on a gate**
//!
//! Virtual time is a `u64` counted in milliseconds of the traffic source's
//! clock. Two clocks implement [`Clock`]:
//! - [`ManualClock`]: atomic counter advanced explicitly, lock-free reads.
//! - [`SyncClock`]: anchored to an external [`TimeAuthority`] and
//!   extrapolated with local wall time between synchronisations.
//!
//! Waiting for a virtual deadline sleeps rather than spins; the deadline
//! is still evaluated against the same clock source.

mod sync;

pub use sync::{SyncClock, TimeAuthority};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ClockError;
use crate::vehicle::Time;

pub trait Clock: Send + Sync {
    /// Current virtual time. Non-decreasing between calls.
    fn now(&self) -> Result<Time, ClockError>;

    /// Upper bound on a single sleep inside [`Clock::wait_until`].
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(10)
    }

    /// Blocks the calling thread until `now() >= deadline` and returns the
    /// observed time.
    fn wait_until(&self, deadline: Time) -> Result<Time, ClockError> {
        loop {
            let now = self.now()?;
            if now >= deadline {
                return Ok(now);
            }
            let remaining = Duration::from_millis(deadline - now);
            std::thread::sleep(remaining.min(self.poll_interval()));
        }
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Result<Time, ClockError> {
        (**self).now()
    }

    fn poll_interval(&self) -> Duration {
        (**self).poll_interval()
    }

    fn wait_until(&self, deadline: Time) -> Result<Time, ClockError> {
        (**self).wait_until(deadline)
    }
}

/// A clock that only moves when told to.
#[derive(Clone, Debug)]
pub struct ManualClock {
    offset: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock starting at `seed`.
    pub fn new(seed: Time) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(seed)),
        }
    }

    #[inline]
    pub fn advance(&self, by: Time) {
        self.offset.fetch_add(by, Ordering::Release);
    }

    /// Moves the clock forward to `to`; earlier values are ignored.
    #[inline]
    pub fn set(&self, to: Time) {
        self.offset.fetch_max(to, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Result<Time, ClockError> {
        Ok(self.offset.load(Ordering::Acquire))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn manual_clock_initial_value() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), Ok(100));
    }

    #[test]
    fn manual_clock_advance() {
        let clock = ManualClock::new(0);
        clock.advance(500);
        assert_eq!(clock.now(), Ok(500));
        clock.advance(250);
        assert_eq!(clock.now(), Ok(750));
    }

    #[test]
    fn manual_clock_never_moves_backwards() {
        let clock = ManualClock::new(300);
        clock.set(100);
        assert_eq!(clock.now(), Ok(300));
        clock.set(400);
        assert_eq!(clock.now(), Ok(400));
    }

    #[test]
    fn wait_until_returns_immediately_for_past_deadline() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.wait_until(10), Ok(1_000));
    }

    #[test]
    fn wait_until_blocks_until_clock_reaches_deadline() {
        let clock = ManualClock::new(0);
        let driver = clock.clone();

        let handle = thread::spawn(move || {
            for _ in 0..50 {
                thread::sleep(Duration::from_millis(1));
                driver.advance(5);
            }
        });

        let observed = clock.wait_until(200).unwrap();
        assert!(observed >= 200);
        handle.join().unwrap();
    }
}
