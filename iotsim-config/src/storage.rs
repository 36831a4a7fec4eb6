//! Per-device log file location.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Where device logs are written: `<output_dir>/<file_prefix>-<index>.csv`.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct StorageConfig {
    /// Directory holding the log files. Created at startup if missing.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[validate(custom(function = validation::validate_file_prefix))]
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    "infos".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}
