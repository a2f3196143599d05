//! Vehicle records and the payloads built from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Virtual-clock instant, in milliseconds of the traffic source's clock.
pub type Time = u64;

/// A car as produced by the traffic source. Read-only to the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub arrival_timestamp: Time,
    pub departure_timestamp: Time,
}

impl Vehicle {
    #[inline]
    pub fn new(arrival_timestamp: Time, departure_timestamp: Time) -> Self {
        Self {
            arrival_timestamp,
            departure_timestamp,
        }
    }

    /// True once `now` is past the vehicle's departure time.
    #[inline]
    pub fn has_departed(&self, now: Time) -> bool {
        now > self.departure_timestamp
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "car[arrival={}, departure={}]",
            self.arrival_timestamp, self.departure_timestamp
        )
    }
}

/// A vehicle stamped with the gate-local time at which it was queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arrival {
    pub vehicle: Vehicle,
    pub arrival_time: Time,
}

impl Arrival {
    #[inline]
    pub fn new(vehicle: Vehicle, arrival_time: Time) -> Self {
        Self {
            vehicle,
            arrival_time,
        }
    }

    /// Waiting time measured against `now`.
    #[inline]
    pub fn waited(&self, now: Time) -> Time {
        now.saturating_sub(self.arrival_time)
    }
}

/// One unit of parking capacity. The identifier never changes while the
/// token moves between gates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload handed to the parking space, and sent back when the car leaves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleWithToken {
    pub vehicle: Vehicle,
    pub token: Token,
}

impl fmt::Display for VehicleWithToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with token {}", self.vehicle, self.token)
    }
}
