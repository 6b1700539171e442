//! Container error types.

use thiserror::Error;

/// Result type alias using [`ContainerError`].
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors raised while registering or resolving services.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The target exists as an identifier but cannot be constructed.
    #[error("Target [{id}] is not instantiable: {reason}")]
    NotInstantiable {
        /// The identifier that was being built.
        id: String,
        /// Why construction is impossible.
        reason: String,
    },

    /// A constructor parameter has no override, no service type and no default.
    #[error("Unresolvable dependency resolving [{parameter}] in class {class}")]
    UnresolvableDependency {
        /// The parameter name.
        parameter: String,
        /// The type (or `Class::method`) declaring the parameter.
        class: String,
    },

    /// `get` was asked for an identifier the container knows nothing about.
    #[error("Target [{id}] is not registered with the container")]
    NotRegistered {
        /// The requested identifier.
        id: String,
    },

    /// Resolution re-entered an identifier that is still being resolved.
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency {
        /// The resolution chain, ending with the repeated identifier.
        chain: Vec<String>,
    },

    /// A resolved instance is not of the requested Rust type.
    #[error("Target [{id}] does not resolve to {expected}")]
    TypeMismatch {
        /// The identifier (or argument name) that was resolved.
        id: String,
        /// The expected Rust type name.
        expected: &'static str,
    },

    /// A resolved argument could not be decoded into the requested value.
    #[error("Invalid argument [{parameter}]: {message}")]
    InvalidArgument {
        /// The parameter name.
        parameter: String,
        /// Human-readable reason.
        message: String,
    },

    /// A constructor or factory reported its own failure.
    #[error("Failed to build [{id}]: {message}")]
    Build {
        /// The identifier being built.
        id: String,
        /// Human-readable reason.
        message: String,
    },

    /// A failure raised while invoking a callable through [`Container::call`].
    ///
    /// [`Container::call`]: crate::Container::call
    #[error("Error calling {target}: {source}")]
    Call {
        /// `Class@method`, the function name, or `Closure`.
        target: String,
        /// The underlying failure.
        #[source]
        source: Box<ContainerError>,
    },

    /// Registration was attempted after the container was sealed.
    #[error("Container is sealed; cannot register [{id}]")]
    Sealed {
        /// The identifier whose registration was rejected.
        id: String,
    },
}

impl ContainerError {
    /// Creates a build failure for the given identifier.
    #[must_use]
    pub fn build(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Build {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Returns the innermost error, looking through [`ContainerError::Call`] wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Call { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
