//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::KilnConfig;
use std::path::Path;

/// File name of the configuration file at the project root.
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Highest accepted `cache.remote.max_retries`.
const MAX_RETRIES_LIMIT: u32 = 10;

/// Loads and validates a `kiln.toml` configuration from a project directory.
///
/// Reads `<project_dir>/kiln.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if let Some(remote) = &config.cache.remote {
        if config.project.full_handle.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingField("project.full_handle".to_string()));
        }
        if remote.url.is_empty() {
            return Err(ConfigError::MissingField("cache.remote.url".to_string()));
        }
        if remote.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "cache.remote.max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                remote.max_retries
            )));
        }
    }
    for (name, profile) in &config.cache.profiles {
        if profile.configuration.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "cache.profiles.{name}.configuration"
            )));
        }
    }
    Ok(())
}
