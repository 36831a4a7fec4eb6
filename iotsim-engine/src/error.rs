use std::path::PathBuf;

use thiserror::Error;

use iotsim_config::ConfigError;
use iotsim_simulator::DeviceError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot prepare output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn consumer thread: {0}")]
    ConsumerSpawn(#[source] std::io::Error),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}
