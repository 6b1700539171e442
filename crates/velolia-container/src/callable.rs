//! Callables invoked through [`Container::call`].
//!
//! [`Container::call`]: crate::Container::call

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::argument::Arguments;
use crate::container::Container;
use crate::error::ContainerError;
use crate::parameter::Parameter;

type Invoker<R> = Box<dyn Fn(&Container, Arguments) -> Result<R, ContainerError> + Send + Sync>;

/// The receiver of a method call.
pub enum Receiver<T> {
    /// Resolve the receiver from the container by identifier.
    Class(String),
    /// Use an existing instance.
    Instance(Arc<T>),
}

/// A function or method whose parameters are filled by the container.
///
/// # Example
///
/// ```rust
/// use velolia_container::{Callable, Container, Overrides, Parameter};
///
/// let greet = Callable::closure(vec![Parameter::value("name")], |args| {
///     let name: String = args.value("name")?;
///     Ok(format!("hello {name}"))
/// });
///
/// let container = Container::new();
/// let out = container
///     .call(&greet, &Overrides::new().value("name", "ada"))
///     .unwrap();
/// assert_eq!(out, "hello ada");
/// ```
pub struct Callable<R> {
    target: String,
    declaring: String,
    parameters: Vec<Parameter>,
    invoke: Invoker<R>,
}

impl<R: 'static> Callable<R> {
    /// A named free function.
    pub fn function<F>(name: impl Into<String>, parameters: Vec<Parameter>, f: F) -> Self
    where
        F: Fn(Arguments) -> Result<R, ContainerError> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            declaring: name.clone(),
            target: name,
            parameters,
            invoke: Box::new(move |_, args| f(args)),
        }
    }

    /// An anonymous closure.
    pub fn closure<F>(parameters: Vec<Parameter>, f: F) -> Self
    where
        F: Fn(Arguments) -> Result<R, ContainerError> + Send + Sync + 'static,
    {
        Self::function("Closure", parameters, f)
    }

    /// A method on `T`, with the receiver either resolved or supplied.
    pub fn method<T, F>(
        receiver: Receiver<T>,
        method: impl Into<String>,
        parameters: Vec<Parameter>,
        f: F,
    ) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, Arguments) -> Result<R, ContainerError> + Send + Sync + 'static,
    {
        let method = method.into();
        let class = match &receiver {
            Receiver::Class(id) => id.clone(),
            Receiver::Instance(_) => std::any::type_name::<T>().to_string(),
        };

        let invoke: Invoker<R> = Box::new(move |container, args| match &receiver {
            Receiver::Instance(instance) => f(instance, args),
            Receiver::Class(id) => {
                let instance = container.make_as::<T>(id)?;
                f(&instance, args)
            }
        });

        Self {
            target: format!("{class}@{method}"),
            declaring: format!("{class}::{method}"),
            parameters,
            invoke,
        }
    }

    /// The call target used in error context (`Class@method`, name or `Closure`).
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The declared parameters.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn declaring(&self) -> &str {
        &self.declaring
    }

    pub(crate) fn invoke(&self, container: &Container, args: Arguments) -> Result<R, ContainerError> {
        (self.invoke)(container, args)
    }
}

impl<R> fmt::Debug for Callable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("target", &self.target)
            .field("parameters", &self.parameters.len())
            .finish()
    }
}
