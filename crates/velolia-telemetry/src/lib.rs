//! # Velolia Telemetry
//!
//! Installs the `tracing-subscriber` stack that renders the framework's
//! logs: an `EnvFilter` plus a pretty, compact or JSON fmt layer.
//!
//! ```rust,ignore
//! use velolia_telemetry::{init_logging, LogConfig, LogFormat};
//!
//! let config = LogConfig {
//!     level: "velolia_router=debug,info".into(),
//!     format: LogFormat::Compact,
//!     ..LogConfig::development()
//! };
//! init_logging(&config)?;
//! ```

#![doc(html_root_url = "https://docs.rs/velolia-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
