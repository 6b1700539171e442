//! Request logging middleware.
//!
//! Opens one `tracing` span per request and emits a completion event with
//! the status and latency. Failed dispatches are logged at `warn` for client
//! errors and `error` for everything else; the error itself still propagates
//! to the error boundary.

use std::time::Instant;

use tracing::{error, info, info_span, warn, Instrument};
use velolia_container::{Arguments, ContainerError, Injectable};
use velolia_core::{BoxFuture, Request, RequestId, Response, VeloliaResult};

use crate::middleware::{Middleware, Next};

/// Middleware that logs every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequestsMiddleware;

impl LogRequestsMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Injectable for LogRequestsMiddleware {
    fn id() -> &'static str {
        "velolia.middleware.log_requests"
    }

    fn construct(_args: Arguments) -> Result<Self, ContainerError> {
        Ok(Self)
    }
}

impl Middleware for LogRequestsMiddleware {
    fn name(&self) -> &'static str {
        "log_requests"
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, VeloliaResult<Response>> {
        let request_id = RequestId::of(&request).map(|id| id.to_string()).unwrap_or_default();
        let span = info_span!(
            "request",
            method = %request.method(),
            path = %request.path(),
            request_id = %request_id,
        );

        Box::pin(
            async move {
                let start = Instant::now();
                let result = next.run(request).await;
                let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

                match &result {
                    Ok(response) => info!(
                        status = response.status().as_u16(),
                        duration_ms,
                        "request completed"
                    ),
                    Err(err) if err.is_client_error() => warn!(
                        status = err.status_code().as_u16(),
                        duration_ms,
                        error = %err,
                        "request rejected"
                    ),
                    Err(err) => error!(
                        status = err.status_code().as_u16(),
                        duration_ms,
                        error = %err,
                        "request failed"
                    ),
                }
                result
            }
            .instrument(span),
        )
    }
}
