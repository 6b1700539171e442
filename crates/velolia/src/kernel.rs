//! The HTTP kernel.
//!
//! ```text
//! Request → global middleware → Router::dispatch → route middleware → handler
//!                                                                       ↓
//! Response ← ErrorHandler (on Err) ← global middleware ←────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use velolia_config::VeloliaConfig;
use velolia_container::Container;
use velolia_core::{Request, RequestId, Response, VeloliaResult};
use velolia_middleware::{Pipeline, Stage, StageResolver};
use velolia_router::Router;

use crate::error_handler::ErrorHandler;

/// Runs requests through the global middleware and the router.
///
/// Cloning is cheap; clones share the same router and container.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

struct KernelInner {
    container: Arc<Container>,
    router: Arc<Router>,
    middleware: Vec<Stage>,
    errors: ErrorHandler,
    config: Arc<VeloliaConfig>,
}

impl Kernel {
    /// A kernel over a finished router.
    ///
    /// The router's container is the one middleware names are resolved
    /// through.
    pub fn new(router: Router, middleware: Vec<Stage>, config: Arc<VeloliaConfig>) -> Self {
        let container = Arc::clone(router.container());
        let errors = ErrorHandler::new(config.app.debug);
        Self {
            inner: Arc::new(KernelInner {
                container,
                router: Arc::new(router),
                middleware,
                errors,
                config,
            }),
        }
    }

    /// Handles a request; errors become rendered error responses.
    pub async fn handle(&self, request: Request) -> Response {
        let wants_json = request.wants_json();
        let request_id = RequestId::of(&request).map(|id| id.to_string());

        match self.try_handle(request).await {
            Ok(response) => response,
            Err(err) => self.inner.errors.handle(&err, wants_json, request_id.as_deref()),
        }
    }

    /// Handles a plain `http` request.
    pub async fn handle_http(&self, request: http::Request<Bytes>) -> Response {
        self.handle(Request::from_http(request)).await
    }

    /// Handles a request and returns the raw result.
    ///
    /// The first call seals the container.
    ///
    /// # Errors
    ///
    /// Whatever a middleware, the router or the handler raised.
    pub async fn try_handle(&self, request: Request) -> VeloliaResult<Response> {
        if !self.inner.container.is_sealed() {
            debug!("sealing container on first dispatch");
            self.inner.container.seal();
        }

        let resolver: Arc<dyn StageResolver> = self.inner.container.clone();
        let router = Arc::clone(&self.inner.router);

        Pipeline::new(resolver)
            .send(request)
            .through(self.inner.middleware.iter().cloned())
            .then(move |request| async move { router.dispatch(request).await })
            .await
    }

    /// The service container.
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.inner.container
    }

    /// The router, for URL generation.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// The application configuration.
    #[must_use]
    pub fn config(&self) -> &VeloliaConfig {
        &self.inner.config
    }

    /// The global middleware, outermost first.
    #[must_use]
    pub fn middleware(&self) -> &[Stage] {
        &self.inner.middleware
    }

    /// The error boundary.
    #[must_use]
    pub fn error_handler(&self) -> ErrorHandler {
        self.inner.errors
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("router", &self.inner.router)
            .field("middleware", &self.inner.middleware)
            .field("debug", &self.inner.errors.is_debug())
            .finish_non_exhaustive()
    }
}
