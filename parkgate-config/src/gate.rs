//! Gate listeners, admission parameters and registration target.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Identity used in peer topologies. Overridden by the coordinator when
    /// it assigns one; otherwise `<advertised_host>:<http port>`.
    #[validate(custom(function = validation::validate_gate_id))]
    #[serde(default)]
    pub id: Option<String>,

    /// TCP listener for the vehicle stream.
    #[validate(custom(function = validation::validate_socket_addr))]
    #[serde(default = "default_ingest_addr")]
    pub ingest_addr: String,

    /// HTTP control surface (stats, topology, borrow, car leaving).
    #[validate(custom(function = validation::validate_socket_addr))]
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Host name peers and the coordinator use to reach this gate.
    #[validate(length(min = 1, max = 253))]
    #[serde(default = "default_advertised_host")]
    pub advertised_host: String,

    /// Virtual time between token acquisition and hand-off to the space.
    #[validate(range(max = 86_400_000))]
    #[serde(default = "default_transfer_duration")]
    pub transfer_duration: u64,

    /// Wall-clock limit for handing a vehicle to the parking space.
    #[validate(range(min = 1, max = 60_000))]
    #[serde(default = "default_forward_timeout")]
    pub forward_timeout_ms: u64,
}

fn default_ingest_addr() -> String {
    "0.0.0.0:7000".into()
}

fn default_http_addr() -> String {
    "0.0.0.0:7001".into()
}

fn default_advertised_host() -> String {
    "localhost".into()
}

fn default_transfer_duration() -> u64 {
    60_000
}

fn default_forward_timeout() -> u64 {
    5_000
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            id: None,
            ingest_addr: default_ingest_addr(),
            http_addr: default_http_addr(),
            advertised_host: default_advertised_host(),
            transfer_duration: default_transfer_duration(),
            forward_timeout_ms: default_forward_timeout(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Registration endpoint.
    #[validate(custom(function = validation::validate_http_url))]
    #[serde(default = "default_register_url")]
    pub register_url: String,

    #[validate(range(min = 1, max = 60_000))]
    #[serde(default = "default_coordinator_timeout")]
    pub timeout_ms: u64,
}

fn default_register_url() -> String {
    "http://127.0.0.1:8080/gates/register".into()
}

fn default_coordinator_timeout() -> u64 {
    5_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            register_url: default_register_url(),
            timeout_ms: default_coordinator_timeout(),
        }
    }
}
