//! Application boot errors.

use thiserror::Error;
use velolia_config::ConfigError;
use velolia_container::ContainerError;
use velolia_telemetry::TelemetryError;

/// Errors raised while assembling an application, before any request runs.
#[derive(Error, Debug)]
pub enum BootError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A service or middleware registration was rejected.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// The log subscriber could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Result type for application boot.
pub type BootResult<T> = Result<T, BootError>;
