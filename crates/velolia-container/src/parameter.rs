//! Parameter descriptors.

use serde_json::Value;

use crate::injectable::{ClassEntry, Injectable};

/// How a parameter is satisfied when no override is supplied.
#[derive(Debug, Clone)]
pub enum ParameterKind {
    /// A class or interface: resolved with `make(id)`.
    Service {
        /// The identifier to resolve.
        id: String,
        /// The concrete type, when known, so it can be autowired.
        class: Option<ClassEntry>,
    },
    /// A primitive value: only overrides and defaults apply.
    Value,
}

/// One declared parameter of a constructor, function or method.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    kind: ParameterKind,
    default: Option<Value>,
}

impl Parameter {
    /// A parameter typed as the injectable `T`.
    #[must_use]
    pub fn service<T: Injectable>(name: impl Into<String>) -> Self {
        let entry = ClassEntry::of::<T>();
        Self {
            name: name.into(),
            kind: ParameterKind::Service {
                id: entry.id().to_string(),
                class: Some(entry),
            },
            default: None,
        }
    }

    /// A parameter typed by an abstract identifier (an interface name or a
    /// string key). It resolves only through bindings, instances or aliases.
    #[must_use]
    pub fn abstract_type(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Service {
                id: id.into(),
                class: None,
            },
            default: None,
        }
    }

    /// An untyped or primitive parameter.
    #[must_use]
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Value,
            default: None,
        }
    }

    /// Declares a default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Declares `null` as the default (an optional service).
    #[must_use]
    pub fn optional(self) -> Self {
        self.with_default(Value::Null)
    }

    /// The parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter kind.
    #[must_use]
    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    /// The declared default, if any.
    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The service identifier for service parameters.
    #[must_use]
    pub fn service_id(&self) -> Option<&str> {
        match &self.kind {
            ParameterKind::Service { id, .. } => Some(id),
            ParameterKind::Value => None,
        }
    }
}
