//! # Parkgate Telemetry
//!
//! Logging initialisation and the Prometheus metrics every gate exposes.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
