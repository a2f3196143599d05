//! Time authority and synchronisation cadence.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct ClockConfig {
    /// TCP address of the time authority.
    #[validate(custom(function = validation::validate_host_port))]
    #[serde(default = "default_authority_addr")]
    pub authority_addr: String,

    #[validate(range(min = 1, max = 60_000))]
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,

    /// 0 disables periodic resynchronisation.
    #[serde(default = "default_resync_interval")]
    pub resync_interval_ms: u64,

    /// Longest single sleep while waiting for a virtual deadline.
    #[validate(range(min = 1, max = 1_000))]
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_authority_addr() -> String {
    "127.0.0.1:6000".into()
}

fn default_handshake_timeout() -> u64 {
    3_000
}

fn default_resync_interval() -> u64 {
    10_000
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            authority_addr: default_authority_addr(),
            handshake_timeout_ms: default_handshake_timeout(),
            resync_interval_ms: default_resync_interval(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}
