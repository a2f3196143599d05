use parkgate_config::ConfigError;
use parkgate_engine::GateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Unable to initialise telemetry: {0}")]
    Telemetry(String),

    #[error("Unable to render configuration: {0}")]
    Render(#[from] serde_yaml::Error),
}
