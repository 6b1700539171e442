//! Core middleware trait and the continuation type.
//!
//! A [`Middleware`] receives the request and a [`Next`] continuation. It may
//! run code before calling `next.run(request)`, after it returns, or skip it
//! entirely to short-circuit the chain with its own response.
//!
//! # Example
//!
//! ```ignore
//! use velolia_middleware::{BoxFuture, Middleware, Next};
//! use velolia_core::{Request, Response, VeloliaResult};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         request: Request,
//!         next: Next,
//!     ) -> BoxFuture<'a, VeloliaResult<Response>> {
//!         Box::pin(async move {
//!             let start = std::time::Instant::now();
//!             let response = next.run(request).await;
//!             println!("took {:?}", start.elapsed());
//!             response
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::trace;
use velolia_core::{BoxFuture, Request, Response, VeloliaResult};

use crate::stage::{Stage, StageResolver};

/// The core middleware trait.
///
/// # Invariants
///
/// - Middleware calls `next.run()` at most once
/// - Not calling it short-circuits everything downstream, handler included
/// - Errors from downstream should be propagated, not swallowed
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used for logging.
    fn name(&self) -> &'static str;

    /// Processes the request.
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, VeloliaResult<Response>>;
}

/// The innermost step of a chain, usually the route handler.
pub type Terminal = Box<dyn FnOnce(Request) -> BoxFuture<'static, VeloliaResult<Response>> + Send>;

/// Continuation into the rest of the chain.
///
/// `Next` owns the remaining stages. Named stages are resolved when the chain
/// reaches them, so a short-circuiting middleware never resolves the ones
/// behind it.
pub struct Next {
    stages: Arc<[Stage]>,
    index: usize,
    resolver: Arc<dyn StageResolver>,
    terminal: Terminal,
}

impl Next {
    pub(crate) fn new(
        stages: Arc<[Stage]>,
        resolver: Arc<dyn StageResolver>,
        terminal: Terminal,
    ) -> Self {
        Self {
            stages,
            index: 0,
            resolver,
            terminal,
        }
    }

    /// Number of stages still ahead of the terminal.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stages.len().saturating_sub(self.index)
    }

    /// Invokes the next middleware or, at the end of the chain, the terminal.
    ///
    /// This consumes `self` so it can only be called once.
    pub fn run(self, request: Request) -> BoxFuture<'static, VeloliaResult<Response>> {
        Box::pin(async move {
            let Some(stage) = self.stages.get(self.index).cloned() else {
                return (self.terminal)(request).await;
            };

            let middleware = stage.resolve(self.resolver.as_ref())?;
            trace!(stage = middleware.name(), index = self.index, "entering middleware");

            let next = Self {
                index: self.index + 1,
                ..self
            };
            middleware.process(request, next).await
        })
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

/// A middleware built from an async closure.
///
/// # Example
///
/// ```ignore
/// let middleware = FnMiddleware::new("auth", |request: Request, next: Next| async move {
///     if request.header("authorization").is_none() {
///         return Err(VeloliaError::http(StatusCode::UNAUTHORIZED, "Unauthenticated"));
///     }
///     next.run(request).await
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = VeloliaResult<Response>> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, VeloliaResult<Response>> {
        Box::pin((self.func)(request, next))
    }
}

/// Shorthand for [`FnMiddleware::new`].
pub const fn from_fn<F>(name: &'static str, func: F) -> FnMiddleware<F> {
    FnMiddleware::new(name, func)
}
