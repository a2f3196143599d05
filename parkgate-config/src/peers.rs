//! Peer borrowing for the distributed token strategy.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct PeersConfig {
    /// Upper bound on one borrow round trip to one peer.
    #[validate(range(min = 1, max = 60_000))]
    #[serde(default = "default_borrow_timeout")]
    pub borrow_timeout_ms: u64,

    /// Local wait between two rounds of asking peers.
    #[validate(range(min = 1, max = 60_000))]
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
}

fn default_borrow_timeout() -> u64 {
    1_000
}

fn default_retry_interval() -> u64 {
    500
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            borrow_timeout_ms: default_borrow_timeout(),
            retry_interval_ms: default_retry_interval(),
        }
    }
}
