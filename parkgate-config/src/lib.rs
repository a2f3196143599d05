//! # Parkgate Configuration System
//!
//! Hierarchical configuration for a parking gate.
//!
//! ## Layers (later wins)
//! 1. Default values
//! 2. `config/parkgate.yaml`, if present
//! 3. `config/<PARKGATE_ENV>.yaml`, if present
//! 4. `PARKGATE_*` environment variables, `__` separating sections
//!
//! Every loaded configuration is validated before it is returned.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod clock;
mod error;
mod gate;
mod peers;
mod queue;
mod telemetry;
mod validation;

pub use clock::ClockConfig;
pub use error::ConfigError;
pub use gate::{CoordinatorConfig, GateConfig};
pub use peers::PeersConfig;
pub use queue::QueueConfig;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/parkgate.yaml";
const ENV_PREFIX: &str = "PARKGATE_";

/// Top-level configuration container for a gate process.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct ParkgateConfig {
    /// Listeners and admission parameters.
    #[validate(nested)]
    #[serde(default)]
    pub gate: GateConfig,

    /// Where to register at startup.
    #[validate(nested)]
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Time authority and synchronisation cadence.
    #[validate(nested)]
    #[serde(default)]
    pub clock: ClockConfig,

    /// Peer borrowing behaviour for the distributed strategy.
    #[validate(nested)]
    #[serde(default)]
    pub peers: PeersConfig,

    /// Arrival queue sizing.
    #[validate(nested)]
    #[serde(default)]
    pub queue: QueueConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ParkgateConfig {
    /// Load configuration from default files and environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Self::defaults();

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        if let Ok(env) = std::env::var("PARKGATE_ENV") {
            let env_file = format!("config/{env}.yaml");
            if Path::new(&env_file).exists() {
                figment = figment.merge(Yaml::file(env_file));
            }
        }

        Self::finish(figment)
    }

    /// Load defaults, then `path`, then the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Self::finish(Self::defaults().merge(Yaml::file(path)))
    }

    /// Re-runs validation after programmatic changes such as CLI overrides.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        Ok(())
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(ParkgateConfig::default()))
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
