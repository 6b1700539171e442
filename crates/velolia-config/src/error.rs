//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error, or a value of the wrong shape for a section.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The `.env` file could not be loaded.
    #[error("failed to load .env file: {0}")]
    Dotenv(String),

    /// A setting has an invalid value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted key of the setting.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An environment override could not be parsed.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The variable name.
        var: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Anything else rejected during validation.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// A missing file.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// An unreadable file.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// An invalid setting.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// An unparseable environment override.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// A general validation failure.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}
