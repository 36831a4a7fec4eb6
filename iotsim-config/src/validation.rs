//! Custom validation functions for configuration.
//!
//! Shared by the device, storage and telemetry sections.

use regex::Regex;
use validator::ValidationError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn is_identifier(value: &str) -> Result<bool, ValidationError> {
    let re = Regex::new("^[A-Za-z0-9_-]*$").map_err(|_| ValidationError::new("invalid_regex"))?;
    Ok(re.is_match(value))
}

/// Device id prefixes may be empty but only contain `[A-Za-z0-9_-]`.
pub fn validate_id_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.len() <= 32 && is_identifier(prefix)? {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_id_prefix"))
    }
}

/// File prefixes end up in file names, so they must be non-empty and path-safe.
pub fn validate_file_prefix(prefix: &str) -> Result<(), ValidationError> {
    if !prefix.is_empty() && prefix.len() <= 64 && is_identifier(prefix)? {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_file_prefix"))
    }
}

pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
