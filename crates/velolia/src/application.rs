//! The composition root.
//!
//! [`Application::builder`] creates the container, registers the
//! configuration and the built-in middleware aliases, collects services,
//! routes and global middleware, and produces a [`Kernel`].
//!
//! Registration errors are kept and reported by [`ApplicationBuilder::build`]
//! so the builder chain stays fluent.

use std::sync::Arc;

use tracing::debug;
use velolia_config::{ConfigLoader, VeloliaConfig};
use velolia_container::{Container, ContainerResult, Injectable};
use velolia_core::RecordStore;
use velolia_middleware::{
    ContainerMiddlewareExt, LogRequestsMiddleware, Middleware, RequestIdMiddleware, Stage,
};
use velolia_router::{Controller, Router};

use crate::error::{BootError, BootResult};
use crate::kernel::Kernel;

/// Container identifier of the application configuration.
pub const CONFIG_ID: &str = "config";

/// Entry point for building an application.
#[derive(Debug, Clone, Copy)]
pub struct Application;

impl Application {
    /// Starts building an application around `config`.
    pub fn builder(config: VeloliaConfig) -> ApplicationBuilder {
        ApplicationBuilder::new(config)
    }

    /// Loads configuration the conventional way: `.env`, then
    /// `config/app.toml` if present, then `VELOLIA__*` variables.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`](velolia_config::ConfigError) from loading or
    /// validation.
    pub fn load_config() -> BootResult<VeloliaConfig> {
        let config = ConfigLoader::new()
            .with_dotenv()?
            .with_optional_file("config/app.toml")?
            .with_env_prefix("VELOLIA")
            .load()?;
        Ok(config)
    }
}

/// Collects registrations and builds a [`Kernel`].
///
/// # Example
///
/// ```
/// use http::{Method, StatusCode};
/// use velolia::prelude::*;
///
/// # tokio_test::block_on(async {
/// let kernel = Application::builder(VeloliaConfig::default())
///     .without_global_middleware()
///     .routes(|router| {
///         router.get("/", Action::from_fn(|| async { "Welcome" })).name("home");
///     })
///     .build()
///     .unwrap();
///
/// let response = kernel.handle(Request::new(Method::GET, "/".parse().unwrap())).await;
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
#[must_use]
pub struct ApplicationBuilder {
    config: Arc<VeloliaConfig>,
    router: Router,
    middleware: Vec<Stage>,
    error: Option<BootError>,
}

impl ApplicationBuilder {
    fn new(config: VeloliaConfig) -> Self {
        let config = Arc::new(config);
        let container = Arc::new(Container::new());
        let mut router = Router::new(Arc::clone(&container));
        if let Some(url) = &config.app.url {
            router.set_base_url(url.clone());
        }

        let middleware = config.http.middleware.iter().map(Stage::from).collect();
        let mut builder = Self {
            config: Arc::clone(&config),
            router,
            middleware,
            error: None,
        };

        let request_id = if config.http.trust_request_id {
            RequestIdMiddleware::trust_incoming()
        } else {
            RequestIdMiddleware::new()
        };
        builder.record(container.instance(CONFIG_ID, Arc::clone(&config)));
        builder.record(container.middleware_instance("request_id", request_id));
        builder.record(container.middleware::<LogRequestsMiddleware>("log_requests"));
        builder
    }

    /// The container being configured.
    pub fn container(&self) -> &Arc<Container> {
        self.router.container()
    }

    /// The configuration the application was built with.
    pub fn config(&self) -> &VeloliaConfig {
        &self.config
    }

    /// Registers the injectable `T`, built fresh on every resolution.
    pub fn service<T: Injectable>(mut self) -> Self {
        let result = self.container().register::<T>();
        self.record(result);
        self
    }

    /// Registers the injectable `T` as a shared instance.
    pub fn singleton<T: Injectable>(mut self) -> Self {
        let result = self.container().register_singleton::<T>();
        self.record(result);
        self
    }

    /// Runs arbitrary registrations against the container.
    pub fn bind<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&Container) -> ContainerResult<()>,
    {
        let result = register(self.container());
        self.record(result);
        self
    }

    /// Binds a middleware alias to the injectable middleware `M`.
    pub fn middleware_alias<M: Middleware + Injectable>(mut self, alias: &str) -> Self {
        let result = self.container().middleware::<M>(alias);
        self.record(result);
        self
    }

    /// Binds a middleware alias to a ready instance.
    pub fn middleware_instance<M: Middleware>(mut self, alias: &str, middleware: M) -> Self {
        let result = self.container().middleware_instance(alias, middleware);
        self.record(result);
        self
    }

    /// Appends a global middleware, innermost so far.
    pub fn global_middleware(mut self, stage: impl Into<Stage>) -> Self {
        self.middleware.push(stage.into());
        self
    }

    /// Drops every global middleware, including the configured ones.
    pub fn without_global_middleware(mut self) -> Self {
        self.middleware.clear();
        self
    }

    /// Sets the store route-model binding reads from.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.router.set_store(store);
        self
    }

    /// Registers the controller `C` and its actions.
    pub fn controller<C: Controller>(mut self) -> Self {
        self.router.controller::<C>();
        self
    }

    /// Defines routes.
    pub fn routes<F>(mut self, define: F) -> Self
    where
        F: FnOnce(&mut Router),
    {
        define(&mut self.router);
        self
    }

    /// Finishes the application.
    ///
    /// # Errors
    ///
    /// The first registration error raised while building.
    pub fn build(self) -> BootResult<Kernel> {
        if let Some(err) = self.error {
            return Err(err);
        }
        debug!(
            app = %self.config.app.name,
            env = %self.config.app.env,
            routes = self.router.routes().count(),
            middleware = self.middleware.len(),
            "application built"
        );
        Ok(Kernel::new(self.router, self.middleware, self.config))
    }

    fn record(&mut self, result: ContainerResult<()>) {
        if let Err(err) = result {
            self.error.get_or_insert(BootError::from(err));
        }
    }
}

impl std::fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("config", &self.config)
            .field("router", &self.router)
            .field("middleware", &self.middleware)
            .field("error", &self.error)
            .finish()
    }
}
