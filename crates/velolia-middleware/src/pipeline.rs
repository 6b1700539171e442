//! Middleware composition.
//!
//! [`compose`] is the single chain builder: the kernel's global middleware
//! and every route's middleware go through it. [`Pipeline`] is the fluent
//! `send → through → then` front end over the same primitive.
//!
//! ```text
//! request → A → B → terminal
//!                      ↓
//! response ← A ← B ←───┘
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::debug;
use velolia_core::{Request, Response, VeloliaError, VeloliaResult};

use crate::middleware::{Next, Terminal};
use crate::stage::{Stage, StageResolver};

/// Folds `stages` around `terminal` and returns the entry continuation.
///
/// The first stage runs first on the way in and last on the way out.
/// Named stages are resolved through `resolver` when the chain reaches them.
pub fn compose<F, Fut>(
    stages: impl Into<Arc<[Stage]>>,
    terminal: F,
    resolver: Arc<dyn StageResolver>,
) -> Next
where
    F: FnOnce(Request) -> Fut + Send + 'static,
    Fut: Future<Output = VeloliaResult<Response>> + Send + 'static,
{
    let terminal: Terminal = Box::new(move |request| Box::pin(terminal(request)));
    Next::new(stages.into(), resolver, terminal)
}

/// Sends a request through a list of stages to a destination.
///
/// # Example
///
/// ```ignore
/// let response = Pipeline::new(container.clone())
///     .send(request)
///     .through(["request_id", "log_requests"])
///     .then(|request| async move { router.dispatch(request).await })
///     .await?;
/// ```
pub struct Pipeline {
    resolver: Arc<dyn StageResolver>,
    passable: Option<Request>,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Creates an empty pipeline resolving named stages through `resolver`.
    pub fn new(resolver: Arc<dyn StageResolver>) -> Self {
        Self {
            resolver,
            passable: None,
            stages: Vec::new(),
        }
    }

    /// Sets the request sent through the pipeline.
    #[must_use]
    pub fn send(mut self, request: Request) -> Self {
        self.passable = Some(request);
        self
    }

    /// Replaces the stage list.
    #[must_use]
    pub fn through<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Stage>,
    {
        self.stages = stages.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one stage.
    #[must_use]
    pub fn pipe(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    /// The configured stages.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs the pipeline with `destination` as the innermost step.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a stage or the destination, or
    /// [`VeloliaError::Internal`] when no request was sent.
    pub async fn then<F, Fut>(self, destination: F) -> VeloliaResult<Response>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = VeloliaResult<Response>> + Send + 'static,
    {
        let Some(request) = self.passable else {
            return Err(VeloliaError::internal("pipeline has no request to send"));
        };
        debug!(stages = self.stages.len(), "running pipeline");
        compose(self.stages, destination, self.resolver)
            .run(request)
            .await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("has_request", &self.passable.is_some())
            .finish_non_exhaustive()
    }
}
