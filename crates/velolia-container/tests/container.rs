//! Container resolution behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use velolia_container::{
    Argument, Arguments, Callable, Concrete, Container, ContainerError, Injectable, Overrides,
    Parameter, Receiver,
};

struct Logger;

impl Injectable for Logger {
    fn construct(_: Arguments) -> Result<Self, ContainerError> {
        Ok(Self)
    }
}

struct Database {
    dsn: String,
    logger: Arc<Logger>,
}

impl Injectable for Database {
    fn id() -> &'static str {
        "db"
    }

    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::value("dsn").with_default("sqlite::memory:"),
            Parameter::service::<Logger>("logger"),
        ]
    }

    fn construct(args: Arguments) -> Result<Self, ContainerError> {
        Ok(Self {
            dsn: args.value("dsn")?,
            logger: args.instance("logger")?,
        })
    }
}

#[derive(Debug)]
struct NeedsPort {
    port: u16,
}

impl Injectable for NeedsPort {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::value("port")]
    }

    fn construct(args: Arguments) -> Result<Self, ContainerError> {
        Ok(Self {
            port: args.value("port")?,
        })
    }
}

trait Cache: Send + Sync {
    fn name(&self) -> &'static str;
}

struct RedisCache;

impl Cache for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }
}

#[derive(Debug)]
struct ChickenA;
struct ChickenB;

impl Injectable for ChickenA {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::service::<ChickenB>("b")]
    }

    fn construct(_: Arguments) -> Result<Self, ContainerError> {
        Ok(Self)
    }
}

impl Injectable for ChickenB {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::service::<ChickenA>("a")]
    }

    fn construct(_: Arguments) -> Result<Self, ContainerError> {
        Ok(Self)
    }
}

#[test]
fn test_unbound_injectable_is_transient() {
    let container = Container::new();
    let a = container.resolve::<Logger>().unwrap();
    let b = container.resolve::<Logger>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_singleton_returns_identical_instance() {
    let container = Container::new();
    container.register_singleton::<Logger>().unwrap();

    let a = container.resolve::<Logger>().unwrap();
    let b = container.resolve::<Logger>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(container.is_shared(Logger::id()));
}

#[test]
fn test_autowires_constructor_parameters() {
    let container = Container::new();
    container.register_singleton::<Logger>().unwrap();

    let db = container.resolve::<Database>().unwrap();
    let logger = container.resolve::<Logger>().unwrap();
    assert_eq!(db.dsn, "sqlite::memory:");
    assert!(Arc::ptr_eq(&db.logger, &logger));
}

#[test]
fn test_named_override_beats_default() {
    let container = Container::new();
    container.register::<Database>().unwrap();

    let db = container
        .make_with("db", &Overrides::new().value("dsn", "postgres://localhost"))
        .unwrap()
        .downcast::<Database>()
        .ok()
        .unwrap();
    assert_eq!(db.dsn, "postgres://localhost");
}

#[test]
fn test_unresolvable_primitive_parameter() {
    let container = Container::new();
    let err = container.resolve::<NeedsPort>().unwrap_err();
    match err {
        ContainerError::UnresolvableDependency { parameter, class } => {
            assert_eq!(parameter, "port");
            assert!(class.ends_with("NeedsPort"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let ok = container
        .make_with(NeedsPort::id(), &Overrides::new().value("port", 8080))
        .unwrap()
        .downcast::<NeedsPort>()
        .ok()
        .unwrap();
    assert_eq!(ok.port, 8080);
}

#[test]
fn test_bind_interface_to_implementation() {
    let container = Container::new();
    container
        .singleton_factory("redis", |_, _| Ok(Arc::new(RedisCache) as Arc<dyn Cache>))
        .unwrap();
    container.bind("cache", Concrete::from("redis"), false).unwrap();

    let via_interface = container.make_as::<Arc<dyn Cache>>("cache").unwrap();
    let direct = container.make_as::<Arc<dyn Cache>>("redis").unwrap();
    assert!(Arc::ptr_eq(&via_interface, &direct));
    assert_eq!(via_interface.name(), "redis");
}

#[test]
fn test_alias_resolves_like_original() {
    let container = Container::new();
    container.register_singleton::<Logger>().unwrap();
    container.alias(Logger::id(), "log").unwrap();
    container.alias("log", "logger").unwrap();

    assert_eq!(container.get_alias("logger").unwrap(), Logger::id());
    let a = container.make_as::<Logger>("logger").unwrap();
    let b = container.resolve::<Logger>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_instance_always_wins() {
    let container = Container::new();
    container.factory("answer", |_, _| Ok(1_u32)).unwrap();
    container.instance("answer", Arc::new(42_u32)).unwrap();

    assert_eq!(*container.make_as::<u32>("answer").unwrap(), 42);
}

#[test]
fn test_transient_factory_runs_each_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let container = Container::new();
    container
        .factory("tick", move |_, _| Ok(seen.fetch_add(1, Ordering::SeqCst)))
        .unwrap();

    container.make("tick").unwrap();
    container.make("tick").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_get_unknown_is_not_registered() {
    let container = Container::new();
    let err = container.get("nothing.here").unwrap_err();
    assert!(matches!(err, ContainerError::NotRegistered { id } if id == "nothing.here"));

    // make reports the build failure instead
    let err = container.make("nothing.here").unwrap_err();
    assert!(matches!(err, ContainerError::NotInstantiable { .. }));
}

#[test]
fn test_get_known_class_reports_build_failure() {
    let container = Container::new();
    assert!(!container.is_constructible(NeedsPort::id()));
    container.resolve::<NeedsPort>().unwrap_err();
    assert!(container.is_constructible(NeedsPort::id()));

    let err = container.get(NeedsPort::id()).unwrap_err();
    assert!(matches!(err, ContainerError::UnresolvableDependency { parameter, .. } if parameter == "port"));

    container.alias(NeedsPort::id(), "needs-port").unwrap();
    let err = container.get("needs-port").unwrap_err();
    assert!(matches!(err, ContainerError::UnresolvableDependency { .. }));
}

#[test]
fn test_get_registered_failure_is_not_masked() {
    let container = Container::new();
    container
        .factory("broken", |_, _| -> Result<u8, _> {
            Err(ContainerError::build("broken", "disk on fire"))
        })
        .unwrap();

    let err = container.get("broken").unwrap_err();
    assert!(matches!(err, ContainerError::Build { .. }));
}

#[test]
fn test_circular_constructor_dependency() {
    let container = Container::new();
    let err = container.resolve::<ChickenA>().unwrap_err();
    match err {
        ContainerError::CircularDependency { chain } => {
            assert_eq!(chain.first(), chain.last());
            assert_eq!(chain.len(), 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_circular_binding_chain() {
    let container = Container::new();
    container.bind("a", Concrete::from("b"), false).unwrap();
    container.bind("b", Concrete::from("a"), false).unwrap();

    let err = container.make("a").unwrap_err();
    assert!(matches!(err, ContainerError::CircularDependency { .. }));
}

#[test]
fn test_circular_alias_chain() {
    let container = Container::new();
    container.alias("x", "y").unwrap();
    container.alias("y", "x").unwrap();

    assert!(matches!(
        container.make("x").unwrap_err(),
        ContainerError::CircularDependency { .. }
    ));
}

#[test]
fn test_forget_removes_everything() {
    let container = Container::new();
    container.instance("answer", Arc::new(42_u32)).unwrap();
    assert!(container.has("answer"));

    container.forget("answer").unwrap();
    assert!(!container.bound("answer"));
}

#[test]
fn test_call_closure_with_named_and_positional_overrides() {
    let container = Container::new();
    let add = Callable::closure(
        vec![Parameter::value("a"), Parameter::value("b")],
        |args| Ok(args.value::<i64>("a")? + args.value::<i64>("b")?),
    );

    let sum = container
        .call(&add, &Overrides::new().value("b", 2).push(Argument::value(40)))
        .unwrap();
    assert_eq!(sum, 42);
}

#[test]
fn test_call_falls_back_to_default_when_service_fails() {
    let container = Container::new();
    let describe = Callable::function(
        "describe",
        vec![Parameter::abstract_type("cache", "cache.store").optional()],
        |args| {
            let cache = args.optional::<RedisCache>("cache")?;
            Ok(cache.map_or("none", |c| c.name()))
        },
    );

    assert_eq!(container.call(&describe, &Overrides::new()).unwrap(), "none");
}

#[test]
fn test_call_method_on_resolved_class() {
    let container = Container::new();
    container.register_singleton::<Logger>().unwrap();
    container.register::<Database>().unwrap();

    let method = Callable::method(
        Receiver::<Database>::Class("db".to_string()),
        "dsn",
        vec![Parameter::value("suffix").with_default("")],
        |db, args| Ok(format!("{}{}", db.dsn, args.value::<String>("suffix")?)),
    );

    let out = container
        .call(&method, &Overrides::new().value("suffix", "?mode=ro"))
        .unwrap();
    assert_eq!(out, "sqlite::memory:?mode=ro");
}

#[test]
fn test_call_wraps_errors_with_target() {
    let container = Container::new();
    let method = Callable::method(
        Receiver::Instance(Arc::new(RedisCache)),
        "flush",
        vec![Parameter::value("pattern")],
        |_cache: &RedisCache, _| Ok(()),
    );

    let err = container.call(&method, &Overrides::new()).unwrap_err();
    match &err {
        ContainerError::Call { target, .. } => assert!(target.ends_with("RedisCache@flush")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        err.root_cause(),
        ContainerError::UnresolvableDependency { parameter, .. } if parameter == "pattern"
    ));
}

#[test]
fn test_concurrent_singleton_resolution_is_consistent() {
    let container = Arc::new(Container::new());
    container.register_singleton::<Logger>().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            std::thread::spawn(move || container.resolve::<Logger>().unwrap())
        })
        .collect();

    let first = container.resolve::<Logger>().unwrap();
    for handle in handles {
        assert!(Arc::ptr_eq(&first, &handle.join().unwrap()));
    }
}
