//! Test request building.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;
use velolia_core::request::METHOD_OVERRIDE_HEADER;
use velolia_core::Request;

use crate::error::TestError;

/// A built test request, ready to be turned into a [`Request`].
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl TestRequest {
    /// Starts a `GET` request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Starts an `OPTIONS` request.
    pub fn options(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::OPTIONS, uri)
    }

    /// Converts into the framework request, parsing query and body input.
    pub fn into_request(self) -> Result<Request, TestError> {
        let mut builder = http::Request::builder().method(self.method).uri(self.uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }
        let request = builder
            .body(self.body)
            .map_err(|e| TestError::RequestBuild(e.to_string()))?;
        Ok(Request::from_http(request))
    }
}

/// Builder for test requests.
///
/// Header errors are held until [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Sets a header, replacing any previous value.
    ///
    /// ```
    /// use velolia_test::TestRequest;
    ///
    /// let request = TestRequest::get("/users")
    ///     .header("Authorization", "Bearer token")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.headers["authorization"], "Bearer token");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let (name, value) = (name.as_ref(), value.as_ref());
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                self.error
                    .get_or_insert_with(|| TestError::InvalidHeader(format!("{name}: {value}")));
            }
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the `Accept` header.
    pub fn accept(self, accept: impl AsRef<str>) -> Self {
        self.header(header::ACCEPT.as_str(), accept)
    }

    /// Asks for a JSON response.
    pub fn accept_json(self) -> Self {
        self.accept("application/json")
    }

    /// Sets the `Authorization` header to a bearer token.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        self.header(header::AUTHORIZATION.as_str(), format!("Bearer {}", token.as_ref()))
    }

    /// Sends a `POST` that the framework treats as `method`.
    pub fn method_override(self, method: &Method) -> Self {
        self.header(METHOD_OVERRIDE_HEADER, method.as_str())
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and content type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => {
                self.error.get_or_insert(TestError::Json(e));
            }
        }
        self.content_type("application/json")
    }

    /// Sets a form-encoded body and content type.
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.body = Some(Bytes::from(encoded));
        self.content_type("application/x-www-form-urlencoded")
    }

    /// Builds the request.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_methods() {
        assert_eq!(TestRequest::get("/users").build().unwrap().method, Method::GET);
        assert_eq!(TestRequest::put("/users/1").build().unwrap().method, Method::PUT);
        assert_eq!(TestRequest::delete("/users/1").build().unwrap().method, Method::DELETE);
    }

    #[test]
    fn test_invalid_header_reported_on_build() {
        let err = TestRequest::get("/").header("bad header", "x").build().unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }

    #[test]
    fn test_invalid_uri() {
        let err = TestRequest::get("http://[::1").build().unwrap_err();
        assert!(matches!(err, TestError::RequestBuild(_)));
    }

    #[test]
    fn test_json_body_reaches_input() {
        let request = TestRequest::post("/users")
            .json(&json!({"name": "Alice"}))
            .build()
            .unwrap()
            .into_request()
            .unwrap();

        assert!(request.is_json());
        assert_eq!(request.input_str("name"), Some("Alice"));
    }

    #[test]
    fn test_form_body_and_override() {
        let request = TestRequest::post("/posts/1")
            .form(&[("title", "a b"), ("_method", "DELETE")])
            .build()
            .unwrap()
            .into_request()
            .unwrap();

        assert_eq!(request.input_str("title"), Some("a b"));
        assert_eq!(request.method(), Method::DELETE);
    }

    #[test]
    fn test_header_override() {
        let request = TestRequest::post("/posts/1")
            .method_override(&Method::PATCH)
            .build()
            .unwrap()
            .into_request()
            .unwrap();
        assert_eq!(request.method(), Method::PATCH);
    }
}
