//! Resolved arguments and caller-supplied overrides.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ContainerError;
use crate::Instance;

/// A single argument: either a service instance or a plain value.
#[derive(Clone)]
pub enum Argument {
    /// A resolved (or supplied) service instance.
    Instance(Instance),
    /// A primitive value, default or override.
    Value(Value),
}

impl Argument {
    /// Wraps a typed instance.
    pub fn instance<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self::Instance(value)
    }

    /// Wraps a plain value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Returns `true` for a `null` value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance(..)"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Overrides passed to `make_with` / `call`.
///
/// Named overrides win over positional ones; positional overrides are only
/// consulted by `call`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    named: Vec<(String, Argument)>,
    positional: Vec<Argument>,
}

impl Overrides {
    /// Creates an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named value override.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, Argument::value(value));
        self
    }

    /// Adds a named instance override.
    #[must_use]
    pub fn instance<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: Arc<T>) -> Self {
        self.set(name, Argument::instance(value));
        self
    }

    /// Appends a positional override.
    #[must_use]
    pub fn push(mut self, argument: impl Into<Argument>) -> Self {
        self.positional.push(argument.into());
        self
    }

    /// Inserts or replaces a named override.
    pub fn set(&mut self, name: impl Into<String>, argument: Argument) {
        let name = name.into();
        if let Some(slot) = self.named.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = argument;
        } else {
            self.named.push((name, argument));
        }
    }

    /// Returns the named override.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Argument> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Returns the positional override at `index`.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&Argument> {
        self.positional.get(index)
    }

    /// Returns `true` if no overrides are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

/// The ordered arguments handed to a constructor or callable.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    entries: Vec<(String, Argument)>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument.
    pub fn push(&mut self, name: impl Into<String>, argument: Argument) {
        self.entries.push((name.into(), argument));
    }

    /// Returns the raw argument by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Returns the raw argument at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Argument> {
        self.entries.get(index).map(|(_, a)| a)
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, argument)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    /// Returns the named argument as a typed instance.
    pub fn instance<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        match self.require(name)? {
            Argument::Instance(instance) => {
                instance
                    .clone()
                    .downcast::<T>()
                    .map_err(|_| ContainerError::TypeMismatch {
                        id: name.to_string(),
                        expected: std::any::type_name::<T>(),
                    })
            }
            Argument::Value(_) => Err(ContainerError::TypeMismatch {
                id: name.to_string(),
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    /// Returns the named argument as an optional instance; a `null` value is `None`.
    pub fn optional<T: Any + Send + Sync>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>, ContainerError> {
        match self.get(name) {
            None => Ok(None),
            Some(argument) if argument.is_null() => Ok(None),
            Some(_) => self.instance(name).map(Some),
        }
    }

    /// Decodes the named value argument.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> Result<T, ContainerError> {
        match self.require(name)? {
            Argument::Value(value) => serde_json::from_value(value.clone())
                .map_err(|e| ContainerError::invalid_argument(name, e.to_string())),
            Argument::Instance(_) => Err(ContainerError::invalid_argument(
                name,
                "expected a value, found a service instance",
            )),
        }
    }

    fn require(&self, name: &str) -> Result<&Argument, ContainerError> {
        self.get(name)
            .ok_or_else(|| ContainerError::invalid_argument(name, "argument was not supplied"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_named() {
        let overrides = Overrides::new().value("limit", 10).value("limit", 20);
        assert!(matches!(
            overrides.named("limit"),
            Some(Argument::Value(v)) if v == &Value::from(20)
        ));
        assert!(overrides.positional(0).is_none());
    }

    #[test]
    fn test_arguments_value_decoding() {
        let mut args = Arguments::new();
        args.push("name", Argument::value("alice"));
        args.push("age", Argument::value(30));

        let name: String = args.value("name").unwrap();
        let age: u32 = args.value("age").unwrap();
        assert_eq!(name, "alice");
        assert_eq!(age, 30);

        let err = args.value::<u32>("name").unwrap_err();
        assert!(matches!(err, ContainerError::InvalidArgument { .. }));
    }

    #[test]
    fn test_arguments_instance_downcast() {
        let mut args = Arguments::new();
        args.push("counter", Argument::instance(Arc::new(7_u64)));

        let counter: Arc<u64> = args.instance("counter").unwrap();
        assert_eq!(*counter, 7);

        let err = args.instance::<String>("counter").unwrap_err();
        assert!(matches!(err, ContainerError::TypeMismatch { .. }));
    }

    #[test]
    fn test_arguments_optional_null() {
        let mut args = Arguments::new();
        args.push("cache", Argument::value(Value::Null));

        let cache: Option<Arc<String>> = args.optional("cache").unwrap();
        assert!(cache.is_none());
        assert!(args.optional::<String>("missing").unwrap().is_none());
    }

    #[test]
    fn test_missing_argument() {
        let args = Arguments::new();
        assert!(args.value::<String>("nope").is_err());
        assert!(args.is_empty());
    }
}
