//! Device fleet configuration.
//!
//! Controls how many simulators run, how often they tick and how they
//! are named.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Simulated device fleet parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Number of device simulators started at launch.
    #[validate(range(min = 1, max = 1024))]
    #[serde(default = "default_count")]
    pub count: usize,

    /// Period between two readings of one device (milliseconds).
    #[validate(range(min = 1, max = 86_400_000))]
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Prefix of generated device ids; the zero-padded index is appended.
    #[validate(custom(function = validation::validate_id_prefix))]
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Base seed for reproducible readings. Device `i` uses `seed + i`.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_count() -> usize {
    3
}

fn default_tick_ms() -> u64 {
    10_000
}

fn default_id_prefix() -> String {
    "DEVICE_".into()
}

impl DeviceConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Deterministic id of the device at `index`, e.g. `DEVICE_007`.
    pub fn device_id(&self, index: usize) -> String {
        format!("{}{:03}", self.id_prefix, index)
    }

    pub fn device_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(index as u64))
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            tick_ms: default_tick_ms(),
            id_prefix: default_id_prefix(),
            seed: None,
        }
    }
}
