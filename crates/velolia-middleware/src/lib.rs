//! # Velolia Middleware
//!
//! Middleware composition for the Velolia dispatch engine.
//!
//! A chain is a list of [`Stage`]s folded around a terminal step, usually
//! the route handler. Stages are either ready middleware or string
//! identifiers resolved through the container when the chain reaches them.
//!
//! ```text
//! Request → A → B → handler
//!                      ↓
//! Response ← A ← B ←───┘
//! ```
//!
//! The kernel's global middleware and each route's middleware share the
//! same builder, [`compose`]. [`Pipeline`] is the fluent front end.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use http::{Method, StatusCode};
//! use velolia_container::Container;
//! use velolia_core::{Request, Response, ResponseExt};
//! use velolia_middleware::{ContainerMiddlewareExt, Pipeline, RequestIdMiddleware};
//!
//! # tokio_test::block_on(async {
//! let container = Arc::new(Container::new());
//! container.middleware::<RequestIdMiddleware>("request_id").unwrap();
//!
//! let response = Pipeline::new(container)
//!     .send(Request::new(Method::GET, "/".parse().unwrap()))
//!     .through(["request_id"])
//!     .then(|_request| async { Ok(Response::text(StatusCode::OK, "hello")) })
//!     .await
//!     .unwrap();
//!
//! assert!(response.headers().contains_key("x-request-id"));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/velolia-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stage;
pub mod stages;

pub use middleware::{from_fn, FnMiddleware, Middleware, Next, Terminal};
pub use pipeline::{compose, Pipeline};
pub use stage::{ContainerMiddlewareExt, MiddlewareHandle, Stage, StageResolver};
pub use stages::{LogRequestsMiddleware, RequestIdMiddleware, REQUEST_ID_HEADER};
pub use velolia_core::BoxFuture;
