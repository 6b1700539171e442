//! # Velolia Router
//!
//! Route registration, matching, argument binding and dispatch.
//!
//! ## Features
//!
//! - **Exact-match static routes**: looked up before any pattern is tried
//! - **Ordered dynamic routes**: `{name}` and `{name?}` placeholders, first
//!   registered match wins
//! - **Groups**: nested prefixes and middleware
//! - **Resources**: the seven conventional CRUD routes for a controller
//! - **Controllers**: `"Class@method"` handlers built through the container
//! - **Route-model binding**: records looked up from a [`RecordStore`]
//! - **Named routes**: URL generation from names and parameters
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use velolia_container::Container;
//! use velolia_core::Request;
//! use velolia_router::{Action, ParamSpec, Router};
//!
//! let mut router = Router::new(Arc::new(Container::new()));
//! router.get("/hello/{name}", Action::new(vec![ParamSpec::scalar("name")], |args| async move {
//!     Ok::<_, velolia_core::VeloliaError>(format!("Hello, {}!", args.str("name").unwrap_or("")))
//! }));
//!
//! let router = Arc::new(router);
//! let request = Request::new(Method::GET, "/hello/world".parse().unwrap());
//! let response = tokio_test::block_on(router.dispatch(request)).unwrap();
//! assert_eq!(response.status(), 200);
//! ```
//!
//! [`RecordStore`]: velolia_core::RecordStore

#![doc(html_root_url = "https://docs.rs/velolia-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod binding;
mod captures;
mod controller;
mod pattern;
mod resource;
mod route;
mod router;
mod url;

pub use action::{Action, HandlerArgs, ParamSpec, RecordDecoder, CAPTURES_PARAMETER};
pub use captures::Captures;
pub use controller::Controller;
pub use pattern::{normalize_path, normalize_prefix, PathPattern, Placeholder};
pub use resource::{PendingResource, RESOURCE_ACTIONS};
pub use route::{Handler, Route, RouteBuilder};
pub use router::{GroupAttributes, Router};
pub use url::UrlParams;

/// A matched route with the values captured from the path.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The matched route
    pub route: &'a Route,
    /// Captured placeholder values
    pub captures: Captures,
}

impl<'a> RouteMatch<'a> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(route: &'a Route, captures: Captures) -> Self {
        Self { route, captures }
    }
}
