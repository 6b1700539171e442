//! Subscriber setup for the framework's `tracing` output.
//!
//! The router logs registrations and matches at `debug`, the kernel logs
//! client errors at `warn` and server errors at `error`, and the
//! `log_requests` middleware emits one `info` line per request.
//!
//! # Example
//!
//! ```rust,ignore
//! use velolia_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(route = "posts.show", "Serving request");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-readable.
    Pretty,
    /// Single-line, human-readable.
    Compact,
    /// One JSON object per event.
    #[default]
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::InvalidConfig(format!("unknown log format: {other}"))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to install a subscriber at all.
    pub enabled: bool,

    /// An `EnvFilter` directive, e.g. `info` or `velolia_router=debug,warn`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to log span open and close events.
    pub span_events: bool,

    /// Whether to include file and line.
    pub file_line_info: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output at `debug`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// [`TelemetryError::LoggingInit`] for an invalid filter or when a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses an `EnvFilter` directive.
///
/// # Errors
///
/// [`TelemetryError::LoggingInit`] when the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.format, LogFormat::Pretty);
        assert_eq!(dev.level, "debug");
        assert!(dev.span_events);

        let prod = LogConfig::default();
        assert_eq!(prod.format, LogFormat::Json);
        assert_eq!(prod.level, "info");
        assert!(!prod.file_line_info);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
    }

    #[test]
    fn test_env_filter() {
        assert!(create_env_filter("velolia_router=debug,warn").is_ok());
        assert!(create_env_filter("velolia_router=loud").is_err());
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}
