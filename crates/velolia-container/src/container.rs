//! The service container.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::argument::{Argument, Arguments, Overrides};
use crate::callable::Callable;
use crate::error::{ContainerError, ContainerResult};
use crate::injectable::{ClassEntry, ClassRecord, Injectable};
use crate::parameter::{Parameter, ParameterKind};
use crate::Instance;

/// A factory closure: receives the container and the caller's overrides.
pub type Factory = Arc<dyn Fn(&Container, &Overrides) -> ContainerResult<Instance> + Send + Sync>;

/// What an identifier is bound to.
#[derive(Clone)]
pub enum Concrete {
    /// Build the identifier itself as a registered class (autowiring).
    Itself,
    /// Resolve another identifier (interface to implementation chains).
    Target(String),
    /// Invoke a factory.
    Factory(Factory),
}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Itself => f.write_str("Itself"),
            Self::Target(id) => f.debug_tuple("Target").field(id).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl From<&str> for Concrete {
    fn from(id: &str) -> Self {
        Self::Target(id.to_string())
    }
}

impl From<String> for Concrete {
    fn from(id: String) -> Self {
        Self::Target(id)
    }
}

#[derive(Clone)]
struct Binding {
    concrete: Concrete,
    shared: bool,
}

#[derive(Default)]
struct State {
    bindings: HashMap<String, Binding>,
    instances: HashMap<String, Instance>,
    aliases: HashMap<String, String>,
    classes: HashMap<String, Arc<ClassRecord>>,
}

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // Identifiers currently being resolved on this thread, tagged by container.
    static BUILD_STACK: RefCell<Vec<(u64, String)>> = const { RefCell::new(Vec::new()) };
}

/// A frame on the per-thread build stack; popped on drop.
struct Frame;

impl Frame {
    fn enter(container: u64, id: &str) -> ContainerResult<Self> {
        BUILD_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().position(|(c, i)| *c == container && i == id) {
                let mut chain: Vec<String> = stack[pos..]
                    .iter()
                    .filter(|(c, _)| *c == container)
                    .map(|(_, i)| i.clone())
                    .collect();
                chain.push(id.to_string());
                return Err(ContainerError::CircularDependency { chain });
            }
            stack.push((container, id.to_string()));
            Ok(Self)
        })
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        BUILD_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// A dependency injection container.
///
/// Identifiers map to binding rules (transient or shared), ready instances
/// and aliases. Types implementing [`Injectable`] are autowired: their
/// constructor parameters are resolved recursively.
///
/// All methods take `&self`; the container is meant to be created once at
/// the composition root and shared as `Arc<Container>`. After
/// [`seal`](Self::seal) every registration call fails with
/// [`ContainerError::Sealed`], while shared instances keep being cached.
///
/// Resolution cycles (through bindings, aliases or constructor parameters)
/// are reported as [`ContainerError::CircularDependency`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use velolia_container::{Concrete, Container};
///
/// struct Clock(u64);
///
/// let container = Container::new();
/// container
///     .singleton_factory("clock", |_, _| Ok(Clock(42)))
///     .unwrap();
/// container.alias("clock", "time").unwrap();
///
/// let a = container.make_as::<Clock>("clock").unwrap();
/// let b = container.make_as::<Clock>("time").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.0, 42);
/// ```
pub struct Container {
    id: u64,
    state: RwLock<State>,
    sealed: AtomicBool,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            state: RwLock::new(State::default()),
            sealed: AtomicBool::new(false),
        }
    }

    /// Rejects any further registration.
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            debug!("container sealed");
        }
    }

    /// Returns `true` once [`seal`](Self::seal) has been called.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    fn ensure_open(&self, id: &str) -> ContainerResult<()> {
        if self.is_sealed() {
            return Err(ContainerError::Sealed { id: id.to_string() });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Registers a binding, replacing any previous one and dropping a stale
    /// cached instance or alias under the same identifier.
    pub fn bind(
        &self,
        id: impl Into<String>,
        concrete: Concrete,
        shared: bool,
    ) -> ContainerResult<()> {
        let id = id.into();
        self.ensure_open(&id)?;
        debug!(id = %id, ?concrete, shared, "binding registered");

        let mut state = self.state.write();
        state.instances.remove(&id);
        state.aliases.remove(&id);
        state.bindings.insert(id, Binding { concrete, shared });
        Ok(())
    }

    /// Registers a shared binding.
    pub fn singleton(&self, id: impl Into<String>, concrete: Concrete) -> ContainerResult<()> {
        self.bind(id, concrete, true)
    }

    /// Registers a transient factory producing `T`.
    pub fn factory<T, F>(&self, id: impl Into<String>, f: F) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn(&Container, &Overrides) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.bind(id, Concrete::Factory(erase(f)), false)
    }

    /// Registers a shared factory producing `T`.
    pub fn singleton_factory<T, F>(&self, id: impl Into<String>, f: F) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn(&Container, &Overrides) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.bind(id, Concrete::Factory(erase(f)), true)
    }

    /// Registers a ready instance. Instances always win over bindings.
    pub fn instance<T: Any + Send + Sync>(
        &self,
        id: impl Into<String>,
        value: Arc<T>,
    ) -> ContainerResult<()> {
        let id = id.into();
        self.ensure_open(&id)?;
        debug!(id = %id, "instance registered");
        self.state.write().instances.insert(id, value);
        Ok(())
    }

    /// Makes `alias` resolve to `id`.
    pub fn alias(&self, id: impl Into<String>, alias: impl Into<String>) -> ContainerResult<()> {
        let alias = alias.into();
        self.ensure_open(&alias)?;
        self.state.write().aliases.insert(alias, id.into());
        Ok(())
    }

    /// Registers the injectable `T` in the class table and self-binds it
    /// under [`Injectable::id`] (transient).
    pub fn register<T: Injectable>(&self) -> ContainerResult<()> {
        self.define(ClassEntry::of::<T>());
        self.bind(T::id(), Concrete::Itself, false)
    }

    /// Registers the injectable `T` as a shared self-binding.
    pub fn register_singleton<T: Injectable>(&self) -> ContainerResult<()> {
        self.define(ClassEntry::of::<T>());
        self.bind(T::id(), Concrete::Itself, true)
    }

    /// Adds a class description to the class table if it is not there yet.
    ///
    /// Class descriptions are static metadata, so this is allowed after sealing.
    pub fn define(&self, entry: ClassEntry) {
        if self.state.read().classes.contains_key(entry.id()) {
            return;
        }
        let record = Arc::new(ClassRecord::from(entry));
        self.state
            .write()
            .classes
            .entry(entry.id().to_string())
            .or_insert(record);
    }

    /// Removes the binding, cached instance and alias for `id`.
    pub fn forget(&self, id: &str) -> ContainerResult<()> {
        self.ensure_open(id)?;
        let mut state = self.state.write();
        state.bindings.remove(id);
        state.instances.remove(id);
        state.aliases.remove(id);
        Ok(())
    }

    /// Drops a cached shared instance, keeping its binding.
    pub fn forget_instance(&self, id: &str) {
        self.state.write().instances.remove(id);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Follows alias chains to the canonical identifier.
    pub fn get_alias(&self, id: &str) -> ContainerResult<String> {
        let state = self.state.read();
        let mut current = id.to_string();
        let mut seen = HashSet::new();
        while let Some(next) = state.aliases.get(&current) {
            if !seen.insert(current.clone()) {
                let mut chain: Vec<String> = seen.into_iter().collect();
                chain.sort();
                chain.push(current);
                return Err(ContainerError::CircularDependency { chain });
            }
            current = next.clone();
        }
        Ok(current)
    }

    /// Returns `true` if `id` has a binding, an instance or an alias.
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        let state = self.state.read();
        state.bindings.contains_key(id)
            || state.instances.contains_key(id)
            || state.aliases.contains_key(id)
    }

    /// Returns `true` if `id`, after aliases, names a class in the class table.
    #[must_use]
    pub fn is_constructible(&self, id: &str) -> bool {
        self.get_alias(id)
            .is_ok_and(|canonical| self.state.read().classes.contains_key(&canonical))
    }

    /// Same as [`has`](Self::has).
    #[must_use]
    pub fn bound(&self, id: &str) -> bool {
        self.has(id)
    }

    /// Returns `true` if `id` is a shared binding.
    #[must_use]
    pub fn is_shared(&self, id: &str) -> bool {
        self.state
            .read()
            .bindings
            .get(id)
            .is_some_and(|binding| binding.shared)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolves `id` with no overrides.
    pub fn make(&self, id: &str) -> ContainerResult<Instance> {
        self.make_with(id, &Overrides::default())
    }

    /// Resolves `id` with overrides.
    ///
    /// Aliases are followed first; a cached instance is returned as is.
    /// Otherwise the binding's concrete target is built (self-bound class or
    /// factory) or resolved recursively, and cached when the binding is shared.
    pub fn make_with(&self, id: &str, overrides: &Overrides) -> ContainerResult<Instance> {
        let id = self.get_alias(id)?;

        let binding = {
            let state = self.state.read();
            if let Some(instance) = state.instances.get(&id) {
                return Ok(instance.clone());
            }
            state.bindings.get(&id).cloned()
        };

        let _frame = Frame::enter(self.id, &id)?;

        let (concrete, shared) = match binding {
            Some(Binding { concrete, shared }) => (concrete, shared),
            None => (Concrete::Itself, false),
        };

        let object = match concrete {
            Concrete::Itself => self.build(&id, overrides)?,
            Concrete::Factory(factory) => factory(self, overrides)?,
            Concrete::Target(target) if target == id => self.build(&id, overrides)?,
            Concrete::Target(target) => self.make_with(&target, overrides)?,
        };

        if shared {
            trace!(id = %id, "caching shared instance");
            let mut state = self.state.write();
            return Ok(state.instances.entry(id).or_insert(object).clone());
        }

        Ok(object)
    }

    /// Resolves `id` and downcasts to `T`.
    pub fn make_as<T: Any + Send + Sync>(&self, id: &str) -> ContainerResult<Arc<T>> {
        downcast(id, self.make(id)?)
    }

    /// Resolves the injectable `T`, autowiring it when it has no binding.
    pub fn resolve<T: Injectable>(&self) -> ContainerResult<Arc<T>> {
        self.define(ClassEntry::of::<T>());
        downcast(T::id(), self.make(T::id())?)
    }

    /// Like [`make`](Self::make), but an identifier that fails to resolve,
    /// is not registered and names no known class surfaces as
    /// [`ContainerError::NotRegistered`].
    pub fn get(&self, id: &str) -> ContainerResult<Instance> {
        self.make(id).map_err(|e| {
            if self.has(id) || self.is_constructible(id) {
                e
            } else {
                ContainerError::NotRegistered { id: id.to_string() }
            }
        })
    }

    /// Typed [`get`](Self::get).
    pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> ContainerResult<Arc<T>> {
        downcast(id, self.get(id)?)
    }

    /// Builds a registered class, ignoring bindings for `id` itself.
    ///
    /// Each constructor parameter is filled, in order, from a named override,
    /// else by resolving its service type, else from its default.
    pub fn build(&self, id: &str, overrides: &Overrides) -> ContainerResult<Instance> {
        let record = self.state.read().classes.get(id).cloned();
        let Some(record) = record else {
            return Err(ContainerError::NotInstantiable {
                id: id.to_string(),
                reason: "no constructible type is registered under this identifier".to_string(),
            });
        };

        let mut args = Arguments::new();
        for parameter in &record.parameters {
            let argument = if let Some(argument) = overrides.named(parameter.name()) {
                argument.clone()
            } else if let ParameterKind::Service { id: service, class } = parameter.kind() {
                if let Some(entry) = class {
                    self.define(*entry);
                }
                Argument::Instance(self.make(service)?)
            } else if let Some(default) = parameter.default() {
                Argument::Value(default.clone())
            } else {
                return Err(ContainerError::UnresolvableDependency {
                    parameter: parameter.name().to_string(),
                    class: record.type_name.to_string(),
                });
            };
            args.push(parameter.name(), argument);
        }

        (record.construct)(args)
    }

    /// Invokes a callable, resolving each parameter from a named override,
    /// a positional override, the container (falling back to the default on
    /// failure), or its default. Failures are wrapped with the call target.
    pub fn call<R: 'static>(&self, callable: &Callable<R>, overrides: &Overrides) -> ContainerResult<R> {
        self.call_inner(callable, overrides)
            .map_err(|source| ContainerError::Call {
                target: callable.target().to_string(),
                source: Box::new(source),
            })
    }

    fn call_inner<R: 'static>(&self, callable: &Callable<R>, overrides: &Overrides) -> ContainerResult<R> {
        let mut args = Arguments::new();
        for (position, parameter) in callable.parameters().iter().enumerate() {
            let argument = self.call_argument(callable, position, parameter, overrides)?;
            args.push(parameter.name(), argument);
        }
        callable.invoke(self, args)
    }

    fn call_argument<R: 'static>(
        &self,
        callable: &Callable<R>,
        position: usize,
        parameter: &Parameter,
        overrides: &Overrides,
    ) -> ContainerResult<Argument> {
        if let Some(argument) = overrides.named(parameter.name()) {
            return Ok(argument.clone());
        }
        if let Some(argument) = overrides.positional(position) {
            return Ok(argument.clone());
        }
        if let ParameterKind::Service { id, class } = parameter.kind() {
            if let Some(entry) = class {
                self.define(*entry);
            }
            return match self.make(id) {
                Ok(instance) => Ok(Argument::Instance(instance)),
                Err(e) => parameter
                    .default()
                    .map(|default| Argument::Value(default.clone()))
                    .ok_or(e),
            };
        }
        parameter
            .default()
            .map(|default| Argument::Value(default.clone()))
            .ok_or_else(|| ContainerError::UnresolvableDependency {
                parameter: parameter.name().to_string(),
                class: callable.declaring().to_string(),
            })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Container")
            .field("bindings", &state.bindings.len())
            .field("instances", &state.instances.len())
            .field("aliases", &state.aliases.len())
            .field("classes", &state.classes.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

fn erase<T, F>(f: F) -> Factory
where
    T: Any + Send + Sync,
    F: Fn(&Container, &Overrides) -> ContainerResult<T> + Send + Sync + 'static,
{
    Arc::new(move |container, overrides| f(container, overrides).map(|v| Arc::new(v) as Instance))
}

fn downcast<T: Any + Send + Sync>(id: &str, instance: Instance) -> ContainerResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            id: id.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter;

    impl Injectable for Counter {
        fn construct(_: Arguments) -> ContainerResult<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn test_container_debug() {
        let container = Container::new();
        container.register::<Counter>().unwrap();
        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("bindings: 1"));
    }

    #[test]
    fn test_frame_pops_on_error() {
        let container = Container::new();
        assert!(container.make("missing").is_err());
        BUILD_STACK.with(|stack| assert!(stack.borrow().is_empty()));
    }

    #[test]
    fn test_bind_drops_stale_instance_and_alias() {
        let container = Container::new();
        container.instance("clock", Arc::new(1_u32)).unwrap();
        container.alias("other", "clock").unwrap();
        container.factory("clock", |_, _| Ok(2_u32)).unwrap();

        assert_eq!(*container.make_as::<u32>("clock").unwrap(), 2);
    }

    #[test]
    fn test_sealed_rejects_registration() {
        let container = Container::new();
        container.seal();
        let err = container.register::<Counter>().unwrap_err();
        assert!(matches!(err, ContainerError::Sealed { .. }));
        // autowiring still works
        assert!(container.resolve::<Counter>().is_ok());
    }
}
