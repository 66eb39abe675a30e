//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ShutdownSettings;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate shutdown settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<ShutdownSettings, ConfigError> {
    let content = fs::read_to_string(path)?;
    let settings: ShutdownSettings = toml::from_str(&content)?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    tracing::debug!(path = %path.display(), ?settings, "Shutdown settings loaded");
    Ok(settings)
}
