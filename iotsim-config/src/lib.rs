//! # iotsim Configuration System
//!
//! Hierarchical configuration for the device telemetry simulator.
//!
//! ## Features
//! - **Unified Configuration**: one tree covering devices, storage and telemetry
//! - **Validation**: every loaded value is checked before use
//! - **Environment Awareness**: per-environment YAML overlays and `IOTSIM_*` variables

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod devices;
mod error;
mod storage;
mod telemetry;
mod validation;

pub use devices::DeviceConfig;
pub use error::ConfigError;
pub use storage::StorageConfig;
pub use telemetry::TelemetryConfig;

const BASE_CONFIG: &str = "config/iotsim.yaml";
const ENV_PREFIX: &str = "IOTSIM_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct IotsimConfig {
    /// Device fleet (count, tick period, naming).
    #[validate(nested)]
    #[serde(default)]
    pub devices: DeviceConfig,

    /// Log file location.
    #[validate(nested)]
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging parameters.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl IotsimConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/iotsim.yaml`, if present
    /// 3. `config/<IOTSIM_ENV>.yaml`, if present
    /// 4. `IOTSIM_*` environment variables (`__` separates nesting levels)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(IotsimConfig::default()));

        if Path::new(BASE_CONFIG).exists() {
            figment = figment.merge(Yaml::file(BASE_CONFIG));
        }

        if let Ok(env) = std::env::var("IOTSIM_ENV") {
            let env_file = format!("config/{}.yaml", env);
            if Path::new(&env_file).exists() {
                figment = figment.merge(Yaml::file(env_file));
            }
        }

        Self::extract(figment)
    }

    /// Load configuration from one explicit file plus environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let figment = Figment::from(Serialized::defaults(IotsimConfig::default()))
            .merge(Yaml::file(path));
        Self::extract(figment)
    }

    /// Re-runs validation, e.g. after command-line overrides.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Renders the effective configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| config.validated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn full_config_validation() {
        let config = IotsimConfig::default();
        config.validate().expect("Default config should validate");
        assert_eq!(config.devices.count, 3);
        assert_eq!(config.devices.tick_ms, 10_000);
        assert_eq!(config.storage.file_prefix, "infos");
    }

    #[test]
    fn load_without_files_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = IotsimConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config, IotsimConfig::default());
            Ok(())
        });
    }

    #[test]
    fn yaml_file_and_environment_override() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/iotsim.yaml",
                "devices:\n  count: 5\n  tick_ms: 250\nstorage:\n  file_prefix: telemetry\n",
            )?;
            jail.set_env("IOTSIM_DEVICES__COUNT", "7");

            let config = IotsimConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.devices.count, 7);
            assert_eq!(config.devices.tick_ms, 250);
            assert_eq!(config.storage.file_prefix, "telemetry");
            assert_eq!(config.telemetry.log_level, "info");
            Ok(())
        });
    }

    #[test]
    fn environment_overlay_file() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/test.yaml", "devices:\n  seed: 99\n")?;
            jail.set_env("IOTSIM_ENV", "test");

            let config = IotsimConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.devices.seed, Some(99));
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "devices:\n  count: 0\n")?;

            let err = IotsimConfig::load_from_path("bad.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            assert!(err.to_string().contains("devices.count"));
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(matches!(
            IotsimConfig::load_from_path("does/not/exist.yaml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn yaml_rendering_round_trips_through_load() {
        Jail::expect_with(|jail| {
            let mut config = IotsimConfig::default();
            config.devices.count = 9;
            jail.create_file("rendered.yaml", &config.to_yaml().map_err(|e| e.to_string())?)?;

            let loaded = IotsimConfig::load_from_path("rendered.yaml").map_err(|e| e.to_string())?;
            assert_eq!(loaded, config);
            Ok(())
        });
    }
}
