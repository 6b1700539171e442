//! Error types for Velolia.
//!
//! This module provides [`VeloliaError`], the error type that flows out of
//! routing, argument binding and handlers, up to the kernel's error boundary.
//!
//! Every variant maps to an [`ErrorCategory`] and from there to an HTTP
//! status code:
//!
//! | Variant | Category | Status |
//! |---|---|---|
//! | `RouteNotFound`, `ControllerMethodNotFound` | `NotFound` | 404 |
//! | `InvalidArgument` | `Validation` | 400 |
//! | `MissingRouteParameter`, `InvalidHandlerType`, `UndefinedRoute`, `MissingUrlParameter` | `Routing` | 500 |
//! | `Container` | `Dependency` | 500 |
//! | `Store` | `Storage` | 500 |
//! | `Http` | `Http` | its own status |
//! | `Internal` | `Internal` | 500 |

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use velolia_container::ContainerError;

use crate::model::StoreError;

/// Result type alias using [`VeloliaError`].
pub type VeloliaResult<T> = Result<T, VeloliaError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad client input.
    Validation,
    /// No route, controller action or bound record.
    NotFound,
    /// Route definitions or handler signatures that cannot be satisfied.
    Routing,
    /// Container resolution failures.
    Dependency,
    /// Record store failures.
    Storage,
    /// An explicit HTTP abort carrying its own status.
    Http,
    /// Everything else.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Routing | Self::Dependency | Self::Storage | Self::Http | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Standard error type for Velolia.
///
/// # Example
///
/// ```
/// use http::{Method, StatusCode};
/// use velolia_core::{ErrorCategory, VeloliaError};
///
/// let err = VeloliaError::route_not_found(&Method::GET, "/missing");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// ```
#[derive(Error, Debug)]
pub enum VeloliaError {
    /// No route matched, or a bound record does not exist.
    #[error("Route not found: {method} {path}")]
    RouteNotFound {
        /// The request method.
        method: Method,
        /// The normalized request path.
        path: String,
    },

    /// The resolved controller has no action with this name.
    #[error("Method {method} does not exist on controller {controller}")]
    ControllerMethodNotFound {
        /// The controller identifier.
        controller: String,
        /// The missing action.
        method: String,
    },

    /// A handler parameter has no capture, no default and no special type.
    #[error("Missing parameter [{name}]")]
    MissingRouteParameter {
        /// The parameter name.
        name: String,
    },

    /// The route handler is none of closure, `Class@method` or `(class, method)`.
    #[error("Invalid handler type: {handler}")]
    InvalidHandlerType {
        /// The offending handler description.
        handler: String,
    },

    /// Client input could not be interpreted.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable error message.
        message: String,
    },

    /// URL generation for a route name that was never registered.
    #[error("Route [{name}] not defined")]
    UndefinedRoute {
        /// The requested route name.
        name: String,
    },

    /// URL generation left a required placeholder unfilled.
    #[error("Missing required parameter [{name}] for route [{route}]")]
    MissingUrlParameter {
        /// The route name.
        route: String,
        /// The placeholder name.
        name: String,
    },

    /// Container resolution failed while building handler arguments.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An explicit HTTP abort, typically raised by middleware.
    #[error("{message}")]
    Http {
        /// The status to respond with.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl VeloliaError {
    /// Creates a route-not-found error.
    #[must_use]
    pub fn route_not_found(method: &Method, path: impl Into<String>) -> Self {
        Self::RouteNotFound {
            method: method.clone(),
            path: path.into(),
        }
    }

    /// Creates a missing-parameter error.
    #[must_use]
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingRouteParameter { name: name.into() }
    }

    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an HTTP abort with the given status.
    #[must_use]
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::RouteNotFound { .. } | Self::ControllerMethodNotFound { .. } => {
                ErrorCategory::NotFound
            }
            Self::InvalidArgument { .. } => ErrorCategory::Validation,
            Self::MissingRouteParameter { .. }
            | Self::InvalidHandlerType { .. }
            | Self::UndefinedRoute { .. }
            | Self::MissingUrlParameter { .. } => ErrorCategory::Routing,
            Self::Container(_) => ErrorCategory::Dependency,
            Self::Store(_) => ErrorCategory::Storage,
            Self::Http { .. } => ErrorCategory::Http,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Http { status, .. } => *status,
            other => other.category().default_status_code(),
        }
    }

    /// Returns `true` if the error is the client's fault (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            Self::ControllerMethodNotFound { .. } => "CONTROLLER_METHOD_NOT_FOUND",
            Self::MissingRouteParameter { .. } => "MISSING_ROUTE_PARAMETER",
            Self::InvalidHandlerType { .. } => "INVALID_HANDLER_TYPE",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::UndefinedRoute { .. } => "UNDEFINED_ROUTE",
            Self::MissingUrlParameter { .. } => "MISSING_URL_PARAMETER",
            Self::Container(_) => "CONTAINER_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Converts this error to a serializable error envelope.
    ///
    /// With `expose` unset, server-side messages are replaced by a generic one.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>, expose: bool) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.public_message(expose),
                category: self.category(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// The message shown to clients.
    ///
    /// Client errors always show their own message; server errors only when
    /// `expose` is set.
    #[must_use]
    pub fn public_message(&self, expose: bool) -> String {
        if expose || self.is_client_error() {
            self.to_string()
        } else {
            "Server Error".to_string()
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
}
