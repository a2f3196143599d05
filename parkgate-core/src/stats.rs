//! ## parkgate-core::stats
//! **Gate counters exposed for monitoring**
//!
//! Written only by the pipeline thread, read from any thread. Each counter
//! is word-atomic; the counters are not updated as one unit, so a reader
//! may see them slightly out of step.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::vehicle::Time;

#[derive(Debug, Default)]
pub struct GateStats {
    total_waiting_time: AtomicU64,
    cars_processed: AtomicU64,
    vehicles_dropped: AtomicU64,
}

/// Point-in-time copy of [`GateStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_waiting_time: Time,
    pub cars_processed_count: u64,
    pub vehicles_dropped: u64,
}

impl GateStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the waiting time of the vehicle just processed and counts it.
    #[inline]
    pub fn record_processed(&self, waited: Time) {
        self.total_waiting_time.store(waited, Ordering::Relaxed);
        self.cars_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.vehicles_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_waiting_time(&self) -> Time {
        self.total_waiting_time.load(Ordering::Relaxed)
    }

    pub fn cars_processed_count(&self) -> u64 {
        self.cars_processed.load(Ordering::Relaxed)
    }

    pub fn vehicles_dropped(&self) -> u64 {
        self.vehicles_dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_waiting_time: self.total_waiting_time(),
            cars_processed_count: self.cars_processed_count(),
            vehicles_dropped: self.vehicles_dropped(),
        }
    }
}
