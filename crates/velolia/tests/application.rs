//! End-to-end tests through the kernel.
//!
//! Covers:
//!
//! 1. Global middleware from configuration (request ids)
//! 2. The error boundary: text and JSON rendering, debug exposure
//! 3. Resource controllers with route-model binding and method override
//! 4. Route middleware resolved by alias
//! 5. Container sealing after the first request

use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use velolia::prelude::*;
use velolia::{BootError, CONFIG_ID};
use velolia_test::TestClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Post {
    id: u64,
    slug: String,
    title: String,
}

impl Model for Post {
    fn table() -> &'static str {
        "posts"
    }

    fn route_key_name() -> &'static str {
        "slug"
    }
}

struct PostController {
    store: Arc<MemoryStore>,
}

impl Injectable for PostController {
    fn id() -> &'static str {
        "PostController"
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::abstract_type("store", "store")]
    }

    fn construct(args: Arguments) -> Result<Self, ContainerError> {
        Ok(Self {
            store: args.instance("store")?,
        })
    }
}

impl Controller for PostController {
    fn actions() -> Vec<(&'static str, Action)> {
        vec![
            (
                "index",
                Action::method(Vec::new(), |this: Arc<Self>, _args| async move {
                    Json(this.store.all("posts"))
                }),
            ),
            (
                "show",
                Action::method(
                    vec![ParamSpec::record::<Post>("id")],
                    |_this: Arc<Self>, args| async move {
                        let post = args.record::<Post>("id")?;
                        Ok::<_, VeloliaError>(Json(Post::clone(&post)))
                    },
                ),
            ),
            (
                "update",
                Action::method(
                    vec![ParamSpec::Request, ParamSpec::record::<Post>("id")],
                    |this: Arc<Self>, mut args| async move {
                        let request = args.request()?;
                        let post = args.record::<Post>("id")?;
                        let title = request.input_str("title").unwrap_or(&post.title).to_string();

                        let mut changes = velolia::core::Row::new();
                        changes.insert("title".into(), json!(title));
                        this.store.update("posts", "slug", &post.slug, &changes);
                        Ok::<_, VeloliaError>(Json(json!({"slug": post.slug, "title": title})))
                    },
                ),
            ),
        ]
    }
}

fn store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert("posts", json!({"slug": "hello-world", "title": "Hello World"}));
    Arc::new(store)
}

fn app(config: VeloliaConfig) -> Kernel {
    let store = store();
    let shared = Arc::clone(&store);
    Application::builder(config)
        .bind(move |container| container.instance("store", shared))
        .store(store)
        .controller::<PostController>()
        .middleware_instance(
            "auth",
            from_fn("auth", |request: Request, next: Next| async move {
                if request.header("authorization").is_none() {
                    return Err(VeloliaError::http(StatusCode::UNAUTHORIZED, "Unauthenticated"));
                }
                next.run(request).await
            }),
        )
        .routes(|router| {
            router.get("/", Action::from_fn(|| async { "Welcome" })).name("home");
            router
                .resource("posts", "PostController")
                .only(&["index", "show", "update"])
                .register();
            router.group(GroupAttributes::new().prefix("admin").middleware(["auth"]), |router| {
                router.get("/stats", Action::from_fn(|| async { Json(json!({"posts": 1})) }));
            });
            router.get(
                "/explode",
                Action::from_fn(|| async { Err::<String, _>(VeloliaError::internal("disk on fire")) }),
            );
        })
        .build()
        .unwrap()
}

fn client(kernel: Kernel) -> TestClient {
    TestClient::new(move |request| {
        let kernel = kernel.clone();
        async move { kernel.handle(request).await }
    })
}

#[tokio::test]
async fn test_home_gets_request_id_from_global_middleware() {
    let client = client(app(VeloliaConfig::default()));
    let response = client.get("/").send().await;

    response.assert_status(StatusCode::OK).assert_body_eq("Welcome");
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_not_found_renders_text_page() {
    let client = client(app(VeloliaConfig::default()));
    client
        .get("/missing")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_body_contains("404 | ")
        .assert_body_contains("/missing");
}

#[tokio::test]
async fn test_not_found_renders_json_envelope() {
    let client = client(app(VeloliaConfig::default()));
    client
        .get("/missing")
        .accept_json()
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_code("ROUTE_NOT_FOUND");
}

#[tokio::test]
async fn test_server_error_hidden_in_production() {
    let client = client(app(VeloliaConfig::production()));
    client
        .get("/explode")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_body_eq("500 | Server Error");
}

#[tokio::test]
async fn test_server_error_shown_in_debug() {
    let mut config = VeloliaConfig::development();
    config.logging.enabled = false;
    let client = client(app(config));
    client
        .get("/explode")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_body_contains("disk on fire");
}

#[tokio::test]
async fn test_resource_show_binds_model() {
    let client = client(app(VeloliaConfig::default()));
    client
        .get("/posts/hello-world")
        .accept_json()
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("title", &json!("Hello World"));

    client.get("/posts/nope").send().await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_form_method_override_reaches_update() {
    let client = client(app(VeloliaConfig::default()));
    client
        .post("/posts/hello-world")
        .form(&[("_method", "PUT"), ("title", "Renamed")])
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("title", &json!("Renamed"));

    client
        .get("/posts")
        .send()
        .await
        .assert_json_field("0.title", &json!("Renamed"));
}

#[tokio::test]
async fn test_excluded_resource_action_is_not_routed() {
    let client = client(app(VeloliaConfig::default()));
    client
        .delete("/posts/hello-world")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_group_middleware_by_alias() {
    let client = client(app(VeloliaConfig::default()));
    client
        .get("/admin/stats")
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_body_eq("401 | Unauthenticated");

    client
        .get("/admin/stats")
        .bearer_token("secret")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("posts", &json!(1));
}

#[tokio::test]
async fn test_container_sealed_after_first_request() {
    let kernel = app(VeloliaConfig::default());
    let client = client(kernel.clone());
    client.get("/").send().await;

    let err = kernel.container().alias("PostController", "posts").unwrap_err();
    assert!(matches!(err, ContainerError::Sealed { .. }));

    // resolution keeps working
    let config = kernel.container().make_as::<VeloliaConfig>(CONFIG_ID).unwrap();
    assert_eq!(config.app.name, "Velolia");
}

#[tokio::test]
async fn test_named_route_urls() {
    let mut config = VeloliaConfig::default();
    config.app.url = Some("https://blog.test".into());
    let kernel = app(config);

    assert_eq!(kernel.router().route("home", ()).unwrap(), "https://blog.test/");
    assert_eq!(
        kernel.router().route_path("posts.show", "hello-world").unwrap(),
        "/posts/hello-world"
    );
}

#[test]
fn test_registration_after_seal_fails_build() {
    let result = Application::builder(VeloliaConfig::default())
        .bind(|container| {
            container.seal();
            Ok(())
        })
        .service::<PostController>()
        .build();
    assert!(matches!(result, Err(BootError::Container(_))));
}
