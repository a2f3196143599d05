//! Clock anchored to an external time authority.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::Clock;
use crate::error::ClockError;
use crate::vehicle::Time;

/// The external source of truth for virtual time.
#[async_trait]
pub trait TimeAuthority: Send + Sync {
    async fn current_time(&self) -> Result<Time, ClockError>;
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    authority_time: Time,
    taken_at: Instant,
}

impl Sample {
    fn new(authority_time: Time) -> Self {
        Self {
            authority_time,
            taken_at: Instant::now(),
        }
    }

    fn extrapolate(&self) -> Time {
        let elapsed = self.taken_at.elapsed().as_millis();
        self.authority_time
            .saturating_add(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}

/// `now()` is the last authority sample plus the wall time elapsed since it
/// was taken, never lower than a value already handed out.
#[derive(Debug)]
pub struct SyncClock {
    sample: Mutex<Sample>,
    floor: AtomicU64,
    poll_interval: Duration,
}

impl SyncClock {
    /// Performs the startup handshake. Any failure here means the gate has
    /// no usable clock.
    pub async fn connect<A>(authority: &A) -> Result<Self, ClockError>
    where
        A: TimeAuthority + ?Sized,
    {
        let authority_time = authority.current_time().await.map_err(|e| match e {
            ClockError::Unavailable(reason) => ClockError::Unavailable(reason),
            ClockError::Malformed(reason) => {
                ClockError::Unavailable(format!("handshake failed: {reason}"))
            }
        })?;
        debug!(authority_time, "Clock handshake complete");
        Ok(Self::from_sample(authority_time))
    }

    pub fn from_sample(authority_time: Time) -> Self {
        Self {
            sample: Mutex::new(Sample::new(authority_time)),
            floor: AtomicU64::new(authority_time),
            poll_interval: Duration::from_millis(10),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Re-anchors the clock. On failure the previous sample stays in use.
    pub async fn resync<A>(&self, authority: &A) -> Result<Time, ClockError>
    where
        A: TimeAuthority + ?Sized,
    {
        let authority_time = authority.current_time().await?;
        *self.sample.lock() = Sample::new(authority_time);
        Ok(authority_time)
    }
}

impl Clock for SyncClock {
    fn now(&self) -> Result<Time, ClockError> {
        let candidate = self.sample.lock().extrapolate();
        let previous = self.floor.fetch_max(candidate, Ordering::AcqRel);
        Ok(previous.max(candidate))
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct FixedAuthority {
        time: AtomicU64,
        reachable: AtomicBool,
    }

    impl FixedAuthority {
        fn new(time: Time) -> Self {
            Self {
                time: AtomicU64::new(time),
                reachable: AtomicBool::new(true),
            }
        }
    }

    #[async_trait]
    impl TimeAuthority for FixedAuthority {
        async fn current_time(&self) -> Result<Time, ClockError> {
            if self.reachable.load(Ordering::Acquire) {
                Ok(self.time.load(Ordering::Acquire))
            } else {
                Err(ClockError::Unavailable("connection refused".into()))
            }
        }
    }

    #[tokio::test]
    async fn handshake_anchors_clock_to_authority() {
        let authority = FixedAuthority::new(10_000);
        let clock = SyncClock::connect(&authority).await.unwrap();
        let now = clock.now().unwrap();
        assert!(now >= 10_000);
        assert!(now < 10_000 + 1_000);
    }

    #[tokio::test]
    async fn handshake_failure_is_clock_unavailable() {
        let authority = FixedAuthority::new(0);
        authority.reachable.store(false, Ordering::Release);
        let err = SyncClock::connect(&authority).await.unwrap_err();
        assert!(matches!(err, ClockError::Unavailable(_)));
    }

    #[tokio::test]
    async fn resync_never_moves_time_backwards() {
        let authority = FixedAuthority::new(50_000);
        let clock = SyncClock::connect(&authority).await.unwrap();
        let before = clock.now().unwrap();

        authority.time.store(1_000, Ordering::Release);
        clock.resync(&authority).await.unwrap();

        assert!(clock.now().unwrap() >= before);
    }

    #[tokio::test]
    async fn failed_resync_keeps_previous_sample() {
        let authority = FixedAuthority::new(2_000);
        let clock = SyncClock::connect(&authority).await.unwrap();
        authority.reachable.store(false, Ordering::Release);

        assert!(clock.resync(&authority).await.is_err());
        assert!(clock.now().unwrap() >= 2_000);
    }

    #[test]
    fn clock_advances_with_wall_time() {
        let clock = SyncClock::from_sample(0).with_poll_interval(Duration::from_millis(2));
        let reached = clock.wait_until(20).unwrap();
        assert!(reached >= 20);
    }
}
