//! ## parkgate
//! **Command-line entry point for a parking gate**
//!
//! `parkgate run` starts one gate; `parkgate check-config` prints the
//! configuration it would run with.

use clap::Parser;

mod commands;
mod error;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    commands::run_command(cli).await?;
    Ok(())
}
