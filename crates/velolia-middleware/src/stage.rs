//! Chain stages and their resolution through the container.

use std::fmt;
use std::sync::Arc;

use velolia_container::{ClassEntry, Container, ContainerResult, Injectable};
use velolia_core::VeloliaResult;

use crate::middleware::Middleware;

/// One entry in a middleware list.
#[derive(Clone)]
pub enum Stage {
    /// A container identifier, resolved when the chain reaches it.
    Named(String),
    /// A ready middleware.
    Inline(Arc<dyn Middleware>),
}

impl Stage {
    /// A stage resolved by identifier.
    pub fn named(id: impl Into<String>) -> Self {
        Self::Named(id.into())
    }

    /// A stage wrapping a ready middleware.
    pub fn inline(middleware: impl Middleware) -> Self {
        Self::Inline(Arc::new(middleware))
    }

    /// The identifier or middleware name, for logging.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Named(id) => id,
            Self::Inline(middleware) => middleware.name(),
        }
    }

    pub(crate) fn resolve(&self, resolver: &dyn StageResolver) -> VeloliaResult<Arc<dyn Middleware>> {
        match self {
            Self::Named(id) => resolver.resolve_stage(id),
            Self::Inline(middleware) => Ok(middleware.clone()),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(id) => f.debug_tuple("Named").field(id).finish(),
            Self::Inline(middleware) => f.debug_tuple("Inline").field(&middleware.name()).finish(),
        }
    }
}

impl From<&str> for Stage {
    fn from(id: &str) -> Self {
        Self::Named(id.to_string())
    }
}

impl From<String> for Stage {
    fn from(id: String) -> Self {
        Self::Named(id)
    }
}

impl From<&String> for Stage {
    fn from(id: &String) -> Self {
        Self::Named(id.clone())
    }
}

impl From<Arc<dyn Middleware>> for Stage {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Self::Inline(middleware)
    }
}

/// Turns a stage identifier into a middleware.
pub trait StageResolver: Send + Sync + 'static {
    /// Resolves the identifier.
    fn resolve_stage(&self, id: &str) -> VeloliaResult<Arc<dyn Middleware>>;
}

/// How middleware is stored in the container.
///
/// A trait object cannot be downcast from `dyn Any`, so middleware bindings
/// produce this sized wrapper.
#[derive(Clone)]
pub struct MiddlewareHandle(pub Arc<dyn Middleware>);

impl fmt::Debug for MiddlewareHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MiddlewareHandle").field(&self.0.name()).finish()
    }
}

impl StageResolver for Container {
    fn resolve_stage(&self, id: &str) -> VeloliaResult<Arc<dyn Middleware>> {
        let handle = self.make_as::<MiddlewareHandle>(id)?;
        Ok(handle.0.clone())
    }
}

/// Middleware registration on the container.
///
/// # Example
///
/// ```ignore
/// use velolia_middleware::{ContainerMiddlewareExt, RequestIdMiddleware};
///
/// container.middleware::<RequestIdMiddleware>("request_id")?;
/// ```
pub trait ContainerMiddlewareExt {
    /// Binds `alias` to the injectable middleware `M`, resolved on every use.
    fn middleware<M: Middleware + Injectable>(&self, alias: &str) -> ContainerResult<()>;

    /// Binds `alias` to a ready middleware instance.
    fn middleware_instance<M: Middleware>(&self, alias: &str, middleware: M) -> ContainerResult<()>;
}

impl ContainerMiddlewareExt for Container {
    fn middleware<M: Middleware + Injectable>(&self, alias: &str) -> ContainerResult<()> {
        self.define(ClassEntry::of::<M>());
        self.factory(alias, |container, _| {
            let middleware: Arc<dyn Middleware> = container.resolve::<M>()?;
            Ok(MiddlewareHandle(middleware))
        })
    }

    fn middleware_instance<M: Middleware>(&self, alias: &str, middleware: M) -> ContainerResult<()> {
        self.instance(alias, Arc::new(MiddlewareHandle(Arc::new(middleware))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{from_fn, Next};
    use velolia_core::{Request, VeloliaError};

    #[test]
    fn test_stage_labels() {
        let named = Stage::from("auth");
        assert_eq!(named.label(), "auth");

        let inline = Stage::inline(from_fn("inline", |req: Request, next: Next| next.run(req)));
        assert_eq!(inline.label(), "inline");
    }

    #[test]
    fn test_container_resolves_registered_instance() {
        let container = Container::new();
        container
            .middleware_instance("noop", from_fn("noop", |req: Request, next: Next| next.run(req)))
            .unwrap();

        let middleware = container.resolve_stage("noop").unwrap();
        assert_eq!(middleware.name(), "noop");
    }

    #[test]
    fn test_unknown_stage_is_a_container_error() {
        let container = Container::new();
        let err = match container.resolve_stage("missing") {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        };
        assert!(matches!(err, VeloliaError::Container(_)));
    }
}
