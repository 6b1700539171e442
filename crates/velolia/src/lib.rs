//! # Velolia
//!
//! **The dispatch engine of the Velolia web framework**
//!
//! Velolia turns a request into a response through four cooperating parts:
//!
//! - **Container** – builds services, controllers and middleware from
//!   declared constructor parameters, with singletons and aliases
//! - **Router** – static and `{placeholder}` routes, groups, names, resource
//!   routes and URL generation, with route-model binding on dispatch
//! - **Pipeline** – onion-style middleware, given inline or by container
//!   alias
//! - **Kernel** – global middleware around the router and the error
//!   boundary that renders failures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use velolia::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Application::load_config()?;
//!     velolia::init_logging(&config)?;
//!
//!     let kernel = Application::builder(config)
//!         .controller::<PostController>()
//!         .store(Arc::new(MemoryStore::new()))
//!         .routes(|router| {
//!             router.get("/", Action::from_fn(|| async { "Welcome" })).name("home");
//!             router.resource("posts", "PostController").only(&["index", "show"]).register();
//!         })
//!         .build()?;
//!
//!     let response = kernel.handle(request).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → global middleware → Router → route middleware → handler
//!                                                              ↓
//! Response ← ErrorHandler ← global middleware ← route middleware ┘
//! ```

#![doc(html_root_url = "https://docs.rs/velolia/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod error;
mod error_handler;
mod kernel;

pub use application::{Application, ApplicationBuilder, CONFIG_ID};
pub use error::{BootError, BootResult};
pub use error_handler::ErrorHandler;
pub use kernel::Kernel;

// Re-export the component crates
pub use velolia_config as config;
pub use velolia_container as container;
pub use velolia_core as core;
pub use velolia_middleware as middleware;
pub use velolia_router as router;
pub use velolia_telemetry as telemetry;

/// Installs the log subscriber described by `config.logging`.
///
/// # Errors
///
/// [`BootError::Telemetry`] for an invalid filter or when a subscriber is
/// already installed.
pub fn init_logging(config: &velolia_config::VeloliaConfig) -> BootResult<()> {
    velolia_telemetry::init_logging(&config.logging.to_log_config())?;
    Ok(())
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use velolia::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{Application, ApplicationBuilder, BootError, ErrorHandler, Kernel};

    pub use velolia_config::{ConfigLoader, VeloliaConfig};

    pub use velolia_container::{
        Arguments, Container, ContainerError, ContainerResult, Injectable, Parameter,
    };

    pub use velolia_core::{
        IntoReply, Json, MemoryStore, Model, RecordStore, Reply, Request, RequestId, Response,
        ResponseExt, VeloliaError, VeloliaResult,
    };

    pub use velolia_middleware::{from_fn, ContainerMiddlewareExt, Middleware, Next, Pipeline, Stage};

    pub use velolia_router::{
        Action, Controller, GroupAttributes, HandlerArgs, ParamSpec, Router, UrlParams,
    };
}
