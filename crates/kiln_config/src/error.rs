//! Error types for configuration loading and validation.

use kiln_common::{ErrorKind, FatalError};

/// Errors that can occur when loading or validating a `kiln.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A requested cache profile is not configured.
    #[error("unknown cache profile '{name}' (available: {})", available.join(", "))]
    UnknownProfile {
        /// The requested profile name.
        name: String,
        /// Configured profile names, sorted.
        available: Vec<String>,
    },

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl FatalError for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Abort
    }
}
