//! End-to-end pipeline integration tests.
//!
//! These tests run chains through `compose` and `Pipeline` and check:
//!
//! 1. Onion ordering of inbound and outbound work
//! 2. Short-circuiting
//! 3. Named stage resolution through the container
//! 4. The built-in stages working together

use std::sync::{Arc, Mutex};

use http::{Method, StatusCode};
use velolia_container::{Arguments, Container, ContainerError, Injectable, Parameter};
use velolia_core::{BoxFuture, Request, RequestId, Response, ResponseExt, VeloliaError, VeloliaResult};
use velolia_middleware::{
    compose, ContainerMiddlewareExt, LogRequestsMiddleware, Middleware, Next, Pipeline,
    RequestIdMiddleware, Stage, REQUEST_ID_HEADER,
};

type Trail = Arc<Mutex<Vec<String>>>;

/// Records `name:in` before the rest of the chain and `name:out` after.
struct Recorder {
    name: &'static str,
    trail: Trail,
}

impl Middleware for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, VeloliaResult<Response>> {
        Box::pin(async move {
            self.trail.lock().unwrap().push(format!("{}:in", self.name));
            let response = next.run(request).await;
            self.trail.lock().unwrap().push(format!("{}:out", self.name));
            response
        })
    }
}

/// Rejects requests without an `authorization` header.
struct Authenticate;

impl Injectable for Authenticate {
    fn construct(_args: Arguments) -> Result<Self, ContainerError> {
        Ok(Self)
    }
}

impl Middleware for Authenticate {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, VeloliaResult<Response>> {
        Box::pin(async move {
            if !request.has_header("authorization") {
                return Err(VeloliaError::http(StatusCode::UNAUTHORIZED, "Unauthenticated"));
            }
            next.run(request).await
        })
    }
}

/// Adds a configurable header to the response.
struct Stamp {
    value: String,
}

impl Injectable for Stamp {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::value("value").with_default("stamped")]
    }

    fn construct(args: Arguments) -> Result<Self, ContainerError> {
        Ok(Self {
            value: args.value("value")?,
        })
    }
}

impl Middleware for Stamp {
    fn name(&self) -> &'static str {
        "stamp"
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, VeloliaResult<Response>> {
        Box::pin(async move {
            let mut response = next.run(request).await?;
            if let Ok(value) = self.value.parse() {
                response.headers_mut().insert("x-stamp", value);
            }
            Ok(response)
        })
    }
}

fn request(path: &str) -> Request {
    Request::new(Method::GET, path.parse().unwrap())
}

fn recorder(name: &'static str, trail: &Trail) -> Stage {
    Stage::inline(Recorder {
        name,
        trail: trail.clone(),
    })
}

#[tokio::test]
async fn test_onion_ordering() {
    let trail: Trail = Arc::default();
    let handler_trail = trail.clone();

    let next = compose(
        vec![recorder("a", &trail), recorder("b", &trail)],
        move |_req| async move {
            handler_trail.lock().unwrap().push("handler".to_string());
            Ok(Response::text(StatusCode::OK, "OK"))
        },
        Arc::new(Container::new()),
    );
    assert_eq!(next.remaining(), 2);

    let response = next.run(request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        *trail.lock().unwrap(),
        ["a:in", "b:in", "handler", "b:out", "a:out"]
    );
}

#[tokio::test]
async fn test_short_circuit_skips_downstream() {
    let trail: Trail = Arc::default();
    let container = Arc::new(Container::new());
    container.middleware::<Authenticate>("auth").unwrap();

    let result = Pipeline::new(container)
        .send(request("/admin"))
        .through([recorder("outer", &trail), Stage::named("auth"), recorder("inner", &trail)])
        .then(|_req| async { Err(VeloliaError::internal("handler must not run")) })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(*trail.lock().unwrap(), ["outer:in", "outer:out"]);
}

#[tokio::test]
async fn test_named_stage_resolved_with_dependencies() {
    let container = Arc::new(Container::new());
    container.middleware::<Stamp>("stamp").unwrap();

    let response = Pipeline::new(container)
        .send(request("/"))
        .through(["stamp"])
        .then(|_req| async { Ok(Response::text(StatusCode::OK, "OK")) })
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-stamp").unwrap(), "stamped");
}

#[tokio::test]
async fn test_unknown_named_stage_fails_when_reached() {
    let container = Arc::new(Container::new());

    let err = Pipeline::new(container)
        .send(request("/"))
        .through(["missing"])
        .then(|_req| async { Ok(Response::text(StatusCode::OK, "OK")) })
        .await
        .unwrap_err();

    assert!(matches!(err, VeloliaError::Container(_)));
}

#[tokio::test]
async fn test_builtin_stages_together() {
    let container = Arc::new(Container::new());
    container.middleware::<RequestIdMiddleware>("request_id").unwrap();
    container.middleware::<LogRequestsMiddleware>("log_requests").unwrap();

    let response = Pipeline::new(container)
        .send(request("/users"))
        .through(["request_id", "log_requests"])
        .then(|req: Request| async move {
            let id = req
                .extensions()
                .get::<RequestId>()
                .map(ToString::to_string)
                .unwrap_or_default();
            Ok(Response::text(StatusCode::OK, id))
        })
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let header = response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
    assert!(RequestId::parse(header).is_some());
}

#[tokio::test]
async fn test_middleware_instance_is_shared() {
    let trail: Trail = Arc::default();
    let container = Arc::new(Container::new());
    container
        .middleware_instance(
            "recorder",
            Recorder {
                name: "recorder",
                trail: trail.clone(),
            },
        )
        .unwrap();

    for _ in 0..2 {
        Pipeline::new(container.clone())
            .send(request("/"))
            .through(["recorder"])
            .then(|_req| async { Ok(Response::text(StatusCode::OK, "OK")) })
            .await
            .unwrap();
    }

    assert_eq!(trail.lock().unwrap().len(), 4);
}
