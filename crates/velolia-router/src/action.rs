//! Handler descriptors.
//!
//! An [`Action`] pairs a handler with the list of parameters it declares.
//! The list is built once when the route or controller is registered; on
//! each dispatch the router walks it to produce [`HandlerArgs`].

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use velolia_container::{Arguments, ClassEntry, ContainerError, Injectable, Instance};
use velolia_core::{BoxFuture, IntoReply, Model, Reply, Request, Row, StoreError, VeloliaError, VeloliaResult};

use crate::captures::Captures;

/// The parameter name that receives every capture at once.
pub const CAPTURES_PARAMETER: &str = "params";

/// Decodes a stored row into a type-erased record.
pub type RecordDecoder = fn(Row) -> Result<Instance, StoreError>;

fn decode_record<M: Model>(row: Row) -> Result<Instance, StoreError> {
    Ok(Arc::new(M::from_row(row)?))
}

/// How one handler parameter is filled.
#[derive(Clone)]
pub enum ParamSpec {
    /// The current request.
    Request,
    /// Every capture, as a JSON object of strings.
    Captures,
    /// A record looked up from a capture (route-model binding).
    Record {
        /// Parameter name, matched against capture names.
        name: String,
        /// The table searched.
        table: &'static str,
        /// The column compared with the captured value.
        key: &'static str,
        /// Whether a missing capture yields `None` instead of an error.
        optional: bool,
        /// Builds the record from the stored row.
        decode: RecordDecoder,
    },
    /// A service resolved through the container.
    Service {
        /// Parameter name.
        name: String,
        /// Container identifier.
        id: String,
        /// The concrete type, when known, so it can be autowired.
        class: Option<ClassEntry>,
    },
    /// A primitive filled from the capture of the same name.
    Scalar {
        /// Parameter name, matched against capture names.
        name: String,
        /// Used when nothing was captured.
        default: Option<Value>,
    },
}

impl ParamSpec {
    /// The current request.
    #[must_use]
    pub const fn request() -> Self {
        Self::Request
    }

    /// The full capture map.
    #[must_use]
    pub const fn captures() -> Self {
        Self::Captures
    }

    /// A record of model `M` bound from the capture `name`.
    #[must_use]
    pub fn record<M: Model>(name: impl Into<String>) -> Self {
        Self::Record {
            name: name.into(),
            table: M::table(),
            key: M::route_key_name(),
            optional: false,
            decode: decode_record::<M>,
        }
    }

    /// Like [`record`](Self::record), but `None` when there is nothing to
    /// look up.
    #[must_use]
    pub fn optional_record<M: Model>(name: impl Into<String>) -> Self {
        let mut spec = Self::record::<M>(name);
        if let Self::Record { optional, .. } = &mut spec {
            *optional = true;
        }
        spec
    }

    /// A service of the injectable type `T`.
    #[must_use]
    pub fn service<T: Injectable>(name: impl Into<String>) -> Self {
        let entry = ClassEntry::of::<T>();
        Self::Service {
            name: name.into(),
            id: entry.id().to_string(),
            class: Some(entry),
        }
    }

    /// A service bound under an abstract identifier.
    #[must_use]
    pub fn abstract_service(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Service {
            name: name.into(),
            id: id.into(),
            class: None,
        }
    }

    /// A primitive parameter. The name `params` selects the capture map.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == CAPTURES_PARAMETER {
            return Self::Captures;
        }
        Self::Scalar {
            name,
            default: None,
        }
    }

    /// Declares a default for a scalar parameter.
    ///
    /// Other parameter kinds are returned unchanged.
    #[must_use]
    pub fn with_default(self, value: impl Into<Value>) -> Self {
        match self {
            Self::Scalar { name, .. } => Self::Scalar {
                name,
                default: Some(value.into()),
            },
            other => other,
        }
    }

    /// The parameter name, where it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Request => None,
            Self::Captures => Some(CAPTURES_PARAMETER),
            Self::Record { name, .. } | Self::Service { name, .. } | Self::Scalar { name, .. } => {
                Some(name)
            }
        }
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("Request"),
            Self::Captures => f.write_str("Captures"),
            Self::Record {
                name,
                table,
                key,
                optional,
                ..
            } => f
                .debug_struct("Record")
                .field("name", name)
                .field("table", table)
                .field("key", key)
                .field("optional", optional)
                .finish_non_exhaustive(),
            Self::Service { name, id, .. } => f
                .debug_struct("Service")
                .field("name", name)
                .field("id", id)
                .finish_non_exhaustive(),
            Self::Scalar { name, default } => f
                .debug_struct("Scalar")
                .field("name", name)
                .field("default", default)
                .finish(),
        }
    }
}

/// Arguments resolved for one handler invocation.
pub struct HandlerArgs {
    request: Option<Request>,
    captures: Captures,
    arguments: Arguments,
}

impl HandlerArgs {
    pub(crate) fn new(request: Option<Request>, captures: Captures, arguments: Arguments) -> Self {
        Self {
            request,
            captures,
            arguments,
        }
    }

    /// Takes the request.
    ///
    /// # Errors
    ///
    /// Fails when the handler did not declare [`ParamSpec::Request`] or the
    /// request was already taken.
    pub fn request(&mut self) -> VeloliaResult<Request> {
        self.request
            .take()
            .ok_or_else(|| VeloliaError::internal("handler has no request argument"))
    }

    /// Borrows the request, if declared and not yet taken.
    #[must_use]
    pub fn request_ref(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// The raw captures of the matched route.
    #[must_use]
    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    /// A bound record.
    ///
    /// # Errors
    ///
    /// Fails when `name` was not declared as a record of type `M`.
    pub fn record<M: Model>(&self, name: &str) -> VeloliaResult<Arc<M>> {
        Ok(self.arguments.instance::<M>(name)?)
    }

    /// An optionally bound record.
    ///
    /// # Errors
    ///
    /// Fails when a value is present but is not an `M`.
    pub fn optional_record<M: Model>(&self, name: &str) -> VeloliaResult<Option<Arc<M>>> {
        Ok(self.arguments.optional::<M>(name)?)
    }

    /// A resolved service.
    ///
    /// # Errors
    ///
    /// Fails when `name` was not declared or holds another type.
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> VeloliaResult<Arc<T>> {
        Ok(self.arguments.instance::<T>(name)?)
    }

    /// A scalar, decoded from its JSON form.
    ///
    /// Captured values are strings; a numeric default stays numeric.
    ///
    /// # Errors
    ///
    /// Fails when `name` was not declared or does not decode as `T`.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> VeloliaResult<T> {
        self.arguments
            .value::<T>(name)
            .map_err(|err| VeloliaError::invalid_argument(err.to_string()))
    }

    /// A scalar as a string slice, when it is one.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.arguments.get(name)? {
            velolia_container::Argument::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// The underlying argument list.
    #[must_use]
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}

impl fmt::Debug for HandlerArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerArgs")
            .field("has_request", &self.request.is_some())
            .field("captures", &self.captures)
            .field("arguments", &self.arguments.len())
            .finish()
    }
}

type Invoke =
    Arc<dyn Fn(Option<Instance>, HandlerArgs) -> BoxFuture<'static, VeloliaResult<Reply>> + Send + Sync>;

/// A handler with its parameter descriptors.
///
/// # Example
///
/// ```rust
/// use velolia_router::{Action, ParamSpec};
///
/// let greet = Action::new(
///     vec![ParamSpec::scalar("name").with_default("world")],
///     |args| async move {
///         let name: String = args.value("name")?;
///         Ok::<_, velolia_core::VeloliaError>(format!("Hello, {name}"))
///     },
/// );
/// assert_eq!(greet.params().len(), 1);
/// ```
#[derive(Clone)]
pub struct Action {
    params: Arc<[ParamSpec]>,
    invoke: Invoke,
    receiver: Option<&'static str>,
}

impl Action {
    /// A free-standing handler.
    pub fn new<F, Fut, R>(params: Vec<ParamSpec>, handler: F) -> Self
    where
        F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        let invoke: Invoke = Arc::new(
            move |_receiver: Option<Instance>, args: HandlerArgs| -> BoxFuture<'static, VeloliaResult<Reply>> {
                let future = handler(args);
                Box::pin(async move { future.await.into_reply() })
            },
        );
        Self {
            params: params.into(),
            invoke,
            receiver: None,
        }
    }

    /// A handler taking no parameters.
    pub fn from_fn<F, Fut, R>(handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        Self::new(Vec::new(), move |_args| handler())
    }

    /// A method of the controller `C`; the router supplies the instance.
    pub fn method<C, F, Fut, R>(params: Vec<ParamSpec>, handler: F) -> Self
    where
        C: Any + Send + Sync,
        F: Fn(Arc<C>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        let class = std::any::type_name::<C>();
        let invoke: Invoke = Arc::new(
            move |receiver: Option<Instance>, args: HandlerArgs| -> BoxFuture<'static, VeloliaResult<Reply>> {
                let controller = match receiver.map(|instance| instance.downcast::<C>()) {
                    Some(Ok(controller)) => controller,
                    Some(Err(_)) => {
                        let err = VeloliaError::from(ContainerError::TypeMismatch {
                            id: class.to_string(),
                            expected: class,
                        });
                        return Box::pin(async move { Err(err) });
                    }
                    None => {
                        let err = VeloliaError::internal(format!("{class} action called without a controller"));
                        return Box::pin(async move { Err(err) });
                    }
                };
                let future = handler(controller, args);
                Box::pin(async move { future.await.into_reply() })
            },
        );
        Self {
            params: params.into(),
            invoke,
            receiver: Some(class),
        }
    }

    /// The declared parameters.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Whether this action needs a controller instance.
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    pub(crate) fn invoke(
        &self,
        receiver: Option<Instance>,
        args: HandlerArgs,
    ) -> BoxFuture<'static, VeloliaResult<Reply>> {
        (self.invoke)(receiver, args)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("params", &self.params)
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}
