//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use velolia_core::Response;

use crate::error::TestError;

/// A fully buffered response with assertion helpers.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers a framework response.
    pub async fn from_response(response: Response) -> Result<Self, TestError> {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Creates a response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self { status, headers, body }
    }

    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status code as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the status is 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Whether the status is 5xx.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// The headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// A header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// The raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The JSON body as a [`Value`].
    pub fn json_value(&self) -> Result<Value, TestError> {
        self.json()
    }

    // Assertions

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics on mismatch.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(self.status, expected, "Expected status {expected}, got {}", self.status);
        self
    }

    /// Asserts a 2xx status.
    ///
    /// # Panics
    ///
    /// Panics otherwise.
    pub fn assert_success(&self) -> &Self {
        assert!(self.is_success(), "Expected success status, got {}", self.status);
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics when the header is missing or differs.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let (name, expected) = (name.as_ref(), expected.as_ref());
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(actual, expected, "Header '{name}'");
        self
    }

    /// Asserts that the content type starts with `expected`.
    ///
    /// # Panics
    ///
    /// Panics when the header is missing or differs.
    pub fn assert_content_type(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let actual = self.content_type().unwrap_or_else(|| panic!("Content-Type header not found"));
        assert!(
            actual.starts_with(expected),
            "Content-Type: expected '{expected}', got '{actual}'"
        );
        self
    }

    /// Asserts the exact body text.
    ///
    /// # Panics
    ///
    /// Panics on mismatch or a non-UTF-8 body.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        match self.text() {
            Ok(body) => assert_eq!(body, expected.as_ref(), "Body mismatch"),
            Err(e) => panic!("{e}"),
        }
        self
    }

    /// Asserts that the body contains `expected`.
    ///
    /// # Panics
    ///
    /// Panics when it does not.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = String::from_utf8_lossy(&self.body);
        assert!(body.contains(expected), "Body should contain '{expected}', got: {body}");
        self
    }

    /// Asserts the value at a dotted JSON path.
    ///
    /// # Panics
    ///
    /// Panics when the body is not JSON, the path is missing or the value
    /// differs.
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &Value) -> &Self {
        let path = path.as_ref();
        let json = self.json_value().unwrap_or_else(|e| panic!("{e}"));
        let actual = json_path(&json, path).unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(actual, expected, "JSON field '{path}'");
        self
    }

    /// Asserts an error envelope: `{"error": {"code": ..}}`.
    ///
    /// # Panics
    ///
    /// Panics when the body is not an envelope with this code.
    pub fn assert_error_code(&self, code: &str) -> &Self {
        self.assert_json_field("error.code", &Value::from(code))
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

/// Follows a dotted path (`error.code`, `items.0`) through a JSON value.
fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}
