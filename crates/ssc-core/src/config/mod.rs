//! Configuration management for ssc

pub mod serde_utils;
mod supervisor;

pub use serde_utils::parse_duration;
pub use supervisor::SupervisorConfig;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ssc")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file {:?} does not exist", path);
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    tracing::debug!("Loading config from {:?}", path);

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}
