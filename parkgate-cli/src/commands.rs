use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use parkgate_config::ParkgateConfig;
use parkgate_engine::Gate;
use parkgate_telemetry::{EventLogger, MetricsRecorder};

use crate::error::CliError;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a gate: sync the clock, register, then admit vehicles
    Run(RunArgs),
    /// Print the effective configuration after all layers and overrides
    CheckConfig(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// YAML file used instead of config/parkgate.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub gate_id: Option<String>,
    #[arg(long)]
    pub ingest_addr: Option<String>,
    #[arg(long)]
    pub http_addr: Option<String>,
    #[arg(long)]
    pub advertised_host: Option<String>,
    #[arg(long)]
    pub register_url: Option<String>,
    /// host:port of the time authority
    #[arg(long)]
    pub time_authority: Option<String>,
    /// Virtual milliseconds between token acquisition and hand-off
    #[arg(long)]
    pub transfer_duration: Option<u64>,
    #[arg(long)]
    pub log_level: Option<String>,
}

impl RunArgs {
    /// Loads the layered configuration and applies flags on top.
    pub fn resolve(&self) -> Result<ParkgateConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ParkgateConfig::load_from_path(path)?,
            None => ParkgateConfig::load()?,
        };
        self.apply(&mut config);
        config.check()?;
        Ok(config)
    }

    fn apply(&self, config: &mut ParkgateConfig) {
        if let Some(id) = &self.gate_id {
            config.gate.id = Some(id.clone());
        }
        if let Some(addr) = &self.ingest_addr {
            config.gate.ingest_addr = addr.clone();
        }
        if let Some(addr) = &self.http_addr {
            config.gate.http_addr = addr.clone();
        }
        if let Some(host) = &self.advertised_host {
            config.gate.advertised_host = host.clone();
        }
        if let Some(url) = &self.register_url {
            config.coordinator.register_url = url.clone();
        }
        if let Some(addr) = &self.time_authority {
            config.clock.authority_addr = addr.clone();
        }
        if let Some(duration) = self.transfer_duration {
            config.gate.transfer_duration = duration;
        }
        if let Some(level) = &self.log_level {
            config.telemetry.log_level = level.clone();
        }
    }
}

pub async fn run_command(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Run(args) => run_gate(args).await,
        Commands::CheckConfig(args) => {
            let config = args.resolve()?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

async fn run_gate(args: RunArgs) -> Result<(), CliError> {
    let config = args.resolve()?;
    EventLogger::init(&config.telemetry.log_level)
        .map_err(|e| CliError::Telemetry(e.to_string()))?;
    let metrics = MetricsRecorder::new().map_err(|e| CliError::Telemetry(e.to_string()))?;

    info!(
        ingest = %config.gate.ingest_addr,
        http = %config.gate.http_addr,
        "Starting gate"
    );
    Gate::new(config, metrics).run().await?;
    Ok(())
}
