//! Route definitions and the builder returned by registration.

use std::fmt;

use http::Method;
use velolia_middleware::Stage;

use crate::action::Action;
use crate::pattern::{PathPattern, Placeholder};
use crate::router::Router;

/// What a route runs.
#[derive(Debug, Clone)]
pub enum Handler {
    /// A handler with its own parameter list.
    Action(Action),
    /// A controller action, from `"Class@method"` or `(class, method)`.
    Controller {
        /// Container identifier of the controller.
        class: String,
        /// Action name.
        method: String,
    },
    /// Anything else; dispatching it fails.
    Invalid(String),
}

impl Handler {
    /// A controller action.
    pub fn controller(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Controller {
            class: class.into(),
            method: method.into(),
        }
    }
}

impl From<Action> for Handler {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

impl From<&str> for Handler {
    fn from(spec: &str) -> Self {
        match spec.split_once('@') {
            Some((class, method)) => Self::controller(class, method),
            None => Self::Invalid(spec.to_string()),
        }
    }
}

impl From<String> for Handler {
    fn from(spec: String) -> Self {
        Self::from(spec.as_str())
    }
}

impl From<(&str, &str)> for Handler {
    fn from((class, method): (&str, &str)) -> Self {
        Self::controller(class, method)
    }
}

impl From<(String, String)> for Handler {
    fn from((class, method): (String, String)) -> Self {
        Self::controller(class, method)
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(_) => f.write_str("Closure"),
            Self::Controller { class, method } => write!(f, "{class}@{method}"),
            Self::Invalid(spec) => f.write_str(spec),
        }
    }
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Handler,
    middleware: Vec<Stage>,
    name: Option<String>,
}

impl Route {
    pub(crate) fn new(method: Method, path: &str, handler: Handler, middleware: Vec<Stage>) -> Self {
        Self {
            method,
            pattern: PathPattern::compile(path),
            handler,
            middleware,
            name: None,
        }
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The normalised path, placeholders included.
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.path()
    }

    /// The compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Whether the path has placeholders.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.pattern.is_dynamic()
    }

    /// Placeholders in declaration order.
    #[must_use]
    pub fn placeholders(&self) -> &[Placeholder] {
        self.pattern.placeholders()
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Middleware, group middleware first.
    #[must_use]
    pub fn middleware(&self) -> &[Stage] {
        &self.middleware
    }

    /// The route name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub(crate) fn push_middleware(&mut self, stages: impl IntoIterator<Item = Stage>) {
        self.middleware.extend(stages);
    }
}

/// Returned by every registration call to name the route or add middleware.
///
/// ```rust
/// use std::sync::Arc;
/// use velolia_container::Container;
/// use velolia_router::{Action, Router};
///
/// let mut router = Router::new(Arc::new(Container::new()));
/// router
///     .get("/dashboard", Action::from_fn(|| async { "hi" }))
///     .name("dashboard")
///     .middleware(["auth"]);
///
/// assert_eq!(router.route_path("dashboard", ()).unwrap(), "/dashboard");
/// ```
pub struct RouteBuilder<'r> {
    router: &'r mut Router,
    id: usize,
}

impl<'r> RouteBuilder<'r> {
    pub(crate) fn new(router: &'r mut Router, id: usize) -> Self {
        Self { router, id }
    }

    /// Names this route.
    pub fn name(self, name: impl Into<String>) -> Self {
        self.router.name_route(self.id, name.into());
        self
    }

    /// Appends middleware to this route.
    pub fn middleware<I, S>(self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Stage>,
    {
        self.router
            .add_route_middleware(self.id, stages.into_iter().map(Into::into).collect());
        self
    }

    /// The registered route.
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.router.route_at(self.id)
    }
}

impl fmt::Debug for RouteBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder").field("id", &self.id).finish_non_exhaustive()
    }
}
