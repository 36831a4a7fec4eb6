use thiserror::Error;

use iotsim_core::SinkError;

use crate::device::DeviceState;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device {device_id} cannot start from state {state:?}")]
    InvalidState {
        device_id: String,
        state: DeviceState,
    },

    #[error("Device {0} has no running loop to join")]
    NotStarted(String),

    #[error("Failed to spawn thread for device {device_id}: {source}")]
    Spawn {
        device_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage failure on device {device_id}: {source}")]
    Sink {
        device_id: String,
        #[source]
        source: SinkError,
    },

    #[error("Device {device_id} loop panicked: {message}")]
    Panicked { device_id: String, message: String },
}

impl DeviceError {
    pub fn device_id(&self) -> &str {
        match self {
            Self::InvalidState { device_id, .. }
            | Self::Spawn { device_id, .. }
            | Self::Sink { device_id, .. }
            | Self::Panicked { device_id, .. } => device_id,
            Self::NotStarted(device_id) => device_id,
        }
    }
}
