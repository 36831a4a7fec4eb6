use thiserror::Error;
use tokio::task::JoinError;

use iotsim_config::ConfigError;
use iotsim_engine::EngineError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Metrics setup failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Signal handling failed: {0}")]
    Signal(#[from] std::io::Error),

    #[error("Shutdown task failed: {0}")]
    Shutdown(#[from] JoinError),

    #[error("{0} device(s) ended with errors")]
    DeviceFailures(usize),

    #[error("Interrupted during shutdown")]
    Interrupted,
}
