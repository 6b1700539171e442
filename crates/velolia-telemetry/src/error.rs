//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A setting could not be understood.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
