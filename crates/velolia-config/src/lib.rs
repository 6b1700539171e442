//! # Velolia Config
//!
//! Typed, layered configuration for Velolia applications.
//!
//! - [`VeloliaConfig`] holds the `app`, `http` and `logging` sections the
//!   framework reads, plus any other sections the application defines.
//! - [`ConfigLoader`] layers defaults, TOML or JSON files, `.env` files and
//!   `PREFIX__SECTION__KEY` environment variables.
//! - Every value is reachable with a dotted key: `config.get("app.name")`.
//!
//! # Example
//!
//! ```no_run
//! use velolia_config::ConfigLoader;
//!
//! # fn main() -> Result<(), velolia_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_file("config/app.toml")?
//!     .with_env_prefix("VELOLIA")
//!     .load()?;
//!
//! if config.app.debug {
//!     println!("{} running in {}", config.app.name, config.app.env);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [app]
//! name = "Blog"
//! env = "local"
//! debug = true
//! url = "https://blog.test"
//!
//! [http]
//! middleware = ["request_id", "log_requests"]
//! trust_request_id = false
//!
//! [logging]
//! level = "velolia_router=debug,info"
//! format = "pretty"
//!
//! [mail]
//! from = "hello@blog.test"
//! ```
//!
//! # Environment Overrides
//!
//! - `VELOLIA__APP__DEBUG=true`
//! - `VELOLIA__HTTP__MIDDLEWARE=request_id,log_requests`
//! - `VELOLIA__MAIL__FROM=hello@blog.test` (sets `mail.from`)

#![doc(html_root_url = "https://docs.rs/velolia-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{AppConfig, HttpConfig, LoggingConfig, VeloliaConfig};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use velolia_telemetry::LogFormat;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
