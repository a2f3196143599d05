use thiserror::Error;
use tokio::task::JoinError;

use parkgate_config::ConfigError;
use parkgate_core::prelude::ClockError;

/// Failures that stop a gate from starting or running.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Time authority unavailable: {0}")]
    ClockUnavailable(#[source] ClockError),

    #[error("Registration with coordinator failed: {0}")]
    Registration(String),

    #[error("Unable to bind {role} listener on {addr}: {source}")]
    Bind {
        role: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid setting: {0}")]
    Setting(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Join(#[from] JoinError),
}
