use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use iotsim_config::IotsimConfig;
use iotsim_engine::{Orchestrator, ShutdownReport};
use iotsim_telemetry::{EventLogger, MetricsRecorder};

use crate::error::CliError;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file; defaults to config/iotsim.yaml plus IOTSIM_* variables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the device fleet until Ctrl-C or until the run duration elapses
    Run(RunArgs),
    /// Print the effective configuration as YAML
    Config(Overrides),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Stop automatically after this many seconds
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

/// Command-line values that win over the loaded configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Number of device simulators
    #[arg(short = 'n', long)]
    pub devices: Option<usize>,

    /// Milliseconds between two readings of one device
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Directory for the per-device CSV logs
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seed for reproducible readings
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Overrides {
    pub fn apply(self, mut config: IotsimConfig) -> IotsimConfig {
        if let Some(count) = self.devices {
            config.devices.count = count;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.devices.tick_ms = tick_ms;
        }
        if let Some(dir) = self.output_dir {
            config.storage.output_dir = dir;
        }
        if self.seed.is_some() {
            config.devices.seed = self.seed;
        }
        if let Some(level) = self.log_level {
            config.telemetry.log_level = level;
        }
        config
    }
}

pub fn load_config(
    path: Option<&PathBuf>,
    overrides: Overrides,
) -> Result<IotsimConfig, CliError> {
    let config = match path {
        Some(path) => IotsimConfig::load_from_path(path)?,
        None => IotsimConfig::load()?,
    };
    Ok(overrides.apply(config).validated()?)
}

pub async fn run_command(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Run(args) => {
            let config = load_config(cli.config.as_ref(), args.overrides)?;
            EventLogger::init(&config.telemetry.log_level, config.telemetry.thread_names)
                .map_err(|e| CliError::Logging(e.to_string()))?;
            run_fleet(config, args.duration_secs.map(Duration::from_secs)).await
        }
        Commands::Config(overrides) => {
            let config = load_config(cli.config.as_ref(), overrides)?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn run_fleet(config: IotsimConfig, duration: Option<Duration>) -> Result<(), CliError> {
    let metrics = Arc::new(MetricsRecorder::new()?);
    let orchestrator = Orchestrator::start(&config, Arc::clone(&metrics))?;
    info!("Simulation running, press Ctrl-C to stop");

    wait_for_termination(duration).await?;
    info!("Stopping simulation, press Ctrl-C again to exit immediately");

    let shutdown = tokio::task::spawn_blocking(move || orchestrator.shutdown());
    let report = await_shutdown(shutdown, signal::ctrl_c()).await?;
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            error!(device_id = %failure.device_id, error = %e, "Device failed");
        }
    }
    info!(counters = %metrics.summary(), "Simulation finished");

    match report.failures().count() {
        0 => Ok(()),
        failed => Err(CliError::DeviceFailures(failed)),
    }
}

/// Waits for the fleet shutdown unless `interrupt` completes first.
async fn await_shutdown<F>(
    shutdown: JoinHandle<ShutdownReport>,
    interrupt: F,
) -> Result<ShutdownReport, CliError>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        report = shutdown => Ok(report?),
        result = interrupt => {
            result?;
            warn!("Interrupted again, abandoning device shutdown");
            Err(CliError::Interrupted)
        }
    }
}

async fn wait_for_termination(duration: Option<Duration>) -> Result<(), CliError> {
    match duration {
        Some(duration) => {
            tokio::select! {
                result = signal::ctrl_c() => result?,
                _ = tokio::time::sleep(duration) => info!(?duration, "Run duration elapsed"),
            }
        }
        None => signal::ctrl_c().await?,
    }
    Ok(())
}
