//! ## iotsim-cli
//! **Operational interface for the device telemetry simulator**
//!
//! Starts the device fleet, waits for Ctrl-C (or a fixed run duration) and
//! shuts the fleet down in order.

use clap::Parser;

mod commands;
mod error;

use commands::Cli;
use error::CliError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    match commands::run_command(cli).await {
        // Returning would wait for the device threads still being joined.
        Err(CliError::Interrupted) => std::process::exit(130),
        result => Ok(result?),
    }
}
