//! Constructible types.
//!
//! Rust has no runtime constructor reflection, so a type opts into
//! autowiring by implementing [`Injectable`]: it names itself, describes its
//! constructor parameters once, and builds itself from the resolved
//! [`Arguments`].

use std::sync::Arc;

use crate::argument::Arguments;
use crate::error::ContainerError;
use crate::parameter::Parameter;
use crate::Instance;

/// A type the container can construct on its own.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use velolia_container::{Arguments, Container, ContainerError, Injectable, Parameter};
///
/// struct Config {
///     dsn: String,
/// }
///
/// impl Injectable for Config {
///     fn parameters() -> Vec<Parameter> {
///         vec![Parameter::value("dsn").with_default("sqlite::memory:")]
///     }
///
///     fn construct(args: Arguments) -> Result<Self, ContainerError> {
///         Ok(Self { dsn: args.value("dsn")? })
///     }
/// }
///
/// struct Repository {
///     config: Arc<Config>,
/// }
///
/// impl Injectable for Repository {
///     fn parameters() -> Vec<Parameter> {
///         vec![Parameter::service::<Config>("config")]
///     }
///
///     fn construct(args: Arguments) -> Result<Self, ContainerError> {
///         Ok(Self { config: args.instance("config")? })
///     }
/// }
///
/// let container = Container::new();
/// let repo = container.resolve::<Repository>().unwrap();
/// assert_eq!(repo.config.dsn, "sqlite::memory:");
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// The identifier this type is registered under.
    ///
    /// Defaults to the Rust type name.
    fn id() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The ordered constructor parameters. Empty means "construct with no arguments".
    fn parameters() -> Vec<Parameter> {
        Vec::new()
    }

    /// Builds the value from resolved arguments.
    fn construct(args: Arguments) -> Result<Self, ContainerError>;
}

/// Type-erased description of an [`Injectable`] type.
///
/// Entries are cheap to copy; parameter lists are only computed when the
/// entry is registered in a container.
#[derive(Clone, Copy)]
pub struct ClassEntry {
    pub(crate) id: &'static str,
    pub(crate) type_name: &'static str,
    pub(crate) parameters: fn() -> Vec<Parameter>,
    pub(crate) construct: fn(Arguments) -> Result<Instance, ContainerError>,
}

impl ClassEntry {
    /// Describes the injectable type `T`.
    #[must_use]
    pub fn of<T: Injectable>() -> Self {
        Self {
            id: T::id(),
            type_name: std::any::type_name::<T>(),
            parameters: T::parameters,
            construct: construct_erased::<T>,
        }
    }

    /// The identifier the type registers under.
    #[must_use]
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// The Rust type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassEntry")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn construct_erased<T: Injectable>(args: Arguments) -> Result<Instance, ContainerError> {
    T::construct(args).map(|value| Arc::new(value) as Instance)
}

/// A registered class: the parameter list is computed once, at registration.
pub(crate) struct ClassRecord {
    pub(crate) type_name: &'static str,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) construct: fn(Arguments) -> Result<Instance, ContainerError>,
}

impl From<ClassEntry> for ClassRecord {
    fn from(entry: ClassEntry) -> Self {
        Self {
            type_name: entry.type_name,
            parameters: (entry.parameters)(),
            construct: entry.construct,
        }
    }
}
