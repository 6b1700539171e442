//! Test client for in-memory requests.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use velolia_core::{BoxFuture, Request, Response, ResponseExt};

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// The function requests are sent to.
pub type TestHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Sends requests to a handler without a network.
///
/// Wrap whatever turns a [`Request`] into a [`Response`], usually a kernel:
///
/// ```
/// use http::StatusCode;
/// use velolia_core::{Response, ResponseExt};
/// use velolia_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let client = TestClient::new(|request| async move {
///     Response::text(StatusCode::OK, request.path().to_string())
/// });
///
/// let response = client.get("/users").send().await;
/// response.assert_status(StatusCode::OK).assert_body_eq("/users");
/// # });
/// ```
#[must_use]
pub struct TestClient {
    handler: TestHandler,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `handler`.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: TestHandler =
            Arc::new(move |request: Request| -> BoxFuture<'static, Response> { Box::pin(handler(request)) });
        Self {
            handler,
            default_headers: Vec::new(),
        }
    }

    /// A client whose handler answers with the method, path and input it
    /// received, as JSON.
    pub fn echo() -> Self {
        Self::new(|request| async move {
            let body = serde_json::json!({
                "method": request.method().as_str(),
                "path": request.path(),
                "input": request.all(),
            });
            Response::json(StatusCode::OK, &body)
        })
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Starts a `GET` request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Starts a `POST` request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Starts a `PUT` request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::put(uri))
    }

    /// Starts a `PATCH` request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::patch(uri))
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(uri))
    }

    /// Starts an `OPTIONS` request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::options(uri))
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    async fn dispatch(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let request = request.into_request()?;
        let response = (self.handler)(request).await;
        TestResponse::from_response(response).await
    }
}

/// A request being built against a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, builder: TestRequestBuilder) -> Self {
        let builder = client
            .default_headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));
        Self { client, builder }
    }

    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Asks for a JSON response.
    pub fn accept_json(mut self) -> Self {
        self.builder = self.builder.accept_json();
        self
    }

    /// Sets a bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Treats this `POST` as another method.
    pub fn method_override(mut self, method: &Method) -> Self {
        self.builder = self.builder.method_override(method);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a form body.
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.builder = self.builder.form(fields);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics when the request cannot be built or the body cannot be read;
    /// use [`try_send`](Self::try_send) to handle those.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build and read failures.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.dispatch(request).await
    }
}
