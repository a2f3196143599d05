//! ## parkgate-core::pipeline
//! **Per-gate processing loop**
//!
//! The single consumer of the arrival queue. Per vehicle:
//!
//! ```text
//! Arrived -> Queued -> { DepartedWithoutAdmission | TokenAcquired }
//! TokenAcquired -> TransferWindow -> { Forwarded | ForwardFailed (token returned) }
//! ```
//!
//! Token acquisition may block indefinitely on an exhausted pool. The
//! transfer window sleeps on the virtual clock until
//! `acquisition + transfer_duration`.

use std::sync::Arc;

use parkgate_telemetry::MetricsRecorder;
use tracing::{debug, info, instrument, warn};

use crate::error::{ClockError, ForwardError};
use crate::queue::ArrivalQueue;
use crate::stats::GateStats;
use crate::time::Clock;
use crate::tokens::TokenPool;
use crate::vehicle::{Arrival, Time, VehicleWithToken};

/// The parking space that receives admitted vehicles.
pub trait Downstream: Send + Sync {
    fn forward(&self, payload: &VehicleWithToken) -> Result<(), ForwardError>;
}

/// Terminal state of one pipeline iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The vehicle left before it was admitted; no token was taken.
    DepartedWithoutAdmission,
    Forwarded,
    /// Forwarding failed and the token went back to the pool.
    ForwardFailedTokenReturned,
    /// The token wait was interrupted; the vehicle is counted as dropped.
    Dropped,
    /// The clock could not be read; the same arrival is tried again.
    ClockRetry,
}

impl Outcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::DepartedWithoutAdmission => "departed",
            Self::Forwarded => "forwarded",
            Self::ForwardFailedTokenReturned => "forward_failed",
            Self::Dropped => "dropped",
            Self::ClockRetry => "clock_retry",
        }
    }
}

pub struct Pipeline {
    clock: Arc<dyn Clock>,
    queue: Arc<ArrivalQueue>,
    pool: Arc<TokenPool>,
    downstream: Arc<dyn Downstream>,
    stats: Arc<GateStats>,
    metrics: MetricsRecorder,
    transfer_duration: Time,
}

impl Pipeline {
    pub fn new(
        clock: Arc<dyn Clock>,
        queue: Arc<ArrivalQueue>,
        pool: Arc<TokenPool>,
        downstream: Arc<dyn Downstream>,
        stats: Arc<GateStats>,
        metrics: MetricsRecorder,
        transfer_duration: Time,
    ) -> Self {
        Self {
            clock,
            queue,
            pool,
            downstream,
            stats,
            metrics,
            transfer_duration,
        }
    }

    /// Consumes the arrival queue until it is closed and drained.
    ///
    /// Blocks the calling thread; run it on a dedicated one.
    pub fn run(&self) {
        info!(
            strategy = ?self.pool.strategy(),
            transfer_duration = self.transfer_duration,
            "Pipeline started"
        );
        let mut pending: Option<Arrival> = None;

        loop {
            let arrival = match pending.take() {
                Some(arrival) => arrival,
                None => match self.queue.dequeue() {
                    Some(arrival) => arrival,
                    None => break,
                },
            };

            if self.process(&arrival) == Outcome::ClockRetry {
                std::thread::sleep(self.clock.poll_interval());
                pending = Some(arrival);
            }
        }
        info!("Arrival queue closed, pipeline stopped");
    }

    /// Runs one arrival through every stage.
    #[instrument(level = "debug", skip_all, fields(vehicle = %arrival.vehicle))]
    pub fn process(&self, arrival: &Arrival) -> Outcome {
        let now = match self.clock.now() {
            Ok(now) => now,
            Err(e) => {
                warn!("Clock read failed, vehicle will be retried: {e}");
                return self.finish(Outcome::ClockRetry);
            }
        };

        if arrival.vehicle.has_departed(now) {
            debug!(now, "Vehicle departed before admission");
            self.record_processed(arrival, now);
            return self.finish(Outcome::DepartedWithoutAdmission);
        }

        let token = match self.pool.get_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("Getting token was interrupted, vehicle dropped: {e}");
                self.stats.record_dropped();
                return self.finish(Outcome::Dropped);
            }
        };
        self.record_processed(arrival, now);

        let payload = VehicleWithToken {
            vehicle: arrival.vehicle,
            token,
        };
        self.transfer();

        match self.downstream.forward(&payload) {
            Ok(()) => {
                info!("(Gate -> ParkingSpace) {payload}");
                self.finish(Outcome::Forwarded)
            }
            Err(e) => {
                warn!(
                    "Unable to send car with token {} to the parking space: {e}",
                    payload.token
                );
                info!("Returning token {} to the pool", payload.token);
                self.pool.add_token(payload.token);
                self.finish(Outcome::ForwardFailedTokenReturned)
            }
        }
    }

    /// Holds the vehicle for `transfer_duration` of virtual time.
    fn transfer(&self) {
        let start = self.read_clock_until_ok();
        let deadline = start.saturating_add(self.transfer_duration);
        loop {
            match self.clock.wait_until(deadline) {
                Ok(_) => return,
                Err(e) => self.clock_failed_in_transfer(e),
            }
        }
    }

    /// A vehicle in its transfer window already holds a token, so clock
    /// failures here are waited out rather than abandoning the vehicle.
    fn read_clock_until_ok(&self) -> Time {
        loop {
            match self.clock.now() {
                Ok(now) => return now,
                Err(e) => self.clock_failed_in_transfer(e),
            }
        }
    }

    fn clock_failed_in_transfer(&self, e: ClockError) {
        warn!("Clock read failed during transfer, retrying: {e}");
        std::thread::sleep(self.clock.poll_interval());
    }

    fn record_processed(&self, arrival: &Arrival, now: Time) {
        let waited = arrival.waited(now);
        self.stats.record_processed(waited);
        self.metrics.observe_waiting_time(waited);
    }

    #[inline]
    fn finish(&self, outcome: Outcome) -> Outcome {
        self.metrics.record_outcome(outcome.as_label());
        outcome
    }
}
