//! # Velolia Container
//!
//! Dependency injection container for the Velolia framework.
//!
//! The container maps string identifiers to binding rules and builds object
//! graphs on demand:
//!
//! - [`Container::bind`] / [`Container::singleton`] - transient or shared bindings
//! - [`Container::instance`] - ready objects that always win
//! - [`Container::alias`] - recursive indirection
//! - [`Container::make`] / [`Container::make_with`] - resolution with overrides
//! - [`Container::call`] - invoke a function or method with injected arguments
//!
//! Types opt into autowiring by implementing [`Injectable`], which describes
//! constructor parameters once instead of relying on runtime reflection.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use velolia_container::{Arguments, Concrete, Container, ContainerError, Injectable};
//!
//! struct Engine;
//!
//! impl Injectable for Engine {
//!     fn construct(_: Arguments) -> Result<Self, ContainerError> {
//!         Ok(Self)
//!     }
//! }
//!
//! let container = Container::new();
//!
//! // Unbound injectable types are built fresh on every call...
//! let a = container.resolve::<Engine>().unwrap();
//! let b = container.resolve::<Engine>().unwrap();
//! assert!(!Arc::ptr_eq(&a, &b));
//!
//! // ...until they are registered as shared.
//! container.register_singleton::<Engine>().unwrap();
//! let c = container.resolve::<Engine>().unwrap();
//! let d = container.resolve::<Engine>().unwrap();
//! assert!(Arc::ptr_eq(&c, &d));
//! ```

#![doc(html_root_url = "https://docs.rs/velolia-container/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod argument;
mod callable;
mod container;
mod error;
mod injectable;
mod parameter;

use std::any::Any;
use std::sync::Arc;

pub use argument::{Argument, Arguments, Overrides};
pub use callable::{Callable, Receiver};
pub use container::{Concrete, Container, Factory};
pub use error::{ContainerError, ContainerResult};
pub use injectable::{ClassEntry, Injectable};
pub use parameter::{Parameter, ParameterKind};

/// A resolved, type-erased service instance.
pub type Instance = Arc<dyn Any + Send + Sync>;
