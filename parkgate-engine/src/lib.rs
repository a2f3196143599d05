//! ## parkgate-engine
//! **Network adapters and gate lifecycle**
//!
//! Wires the network-free `parkgate-core` pipeline to the outside world:
//! vehicle ingest over TCP, the HTTP control surface, the coordinator,
//! peer gates, the parking space and the time authority.

pub mod error;
pub mod net;
pub mod protocol;
pub mod runtime;

pub use error::GateError;
pub use runtime::{Gate, RunningGate};
