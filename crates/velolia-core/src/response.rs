//! The response type and convenience constructors.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use http::StatusCode;
use http_body_util::Full;

use crate::error::VeloliaError;

/// The HTTP response type used throughout the framework.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

const TEXT_HTML: &str = "text/html; charset=UTF-8";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Extension trait for building responses.
pub trait ResponseExt {
    /// A response with the given status, content type and body.
    fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response;

    /// An HTML (default content type) response.
    fn html(status: StatusCode, body: impl Into<String>) -> Response;

    /// A plain-text response.
    fn text(status: StatusCode, body: impl Into<String>) -> Response;

    /// A JSON response.
    fn json(status: StatusCode, body: &serde_json::Value) -> Response;

    /// A redirect to `location`.
    fn redirect(location: &str, status: StatusCode) -> Result<Response, VeloliaError>;

    /// Creates an error response with the given status code and message.
    fn error(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON error response.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response {
        let mut response = http::Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }

    fn html(status: StatusCode, body: impl Into<String>) -> Response {
        Self::with_body(status, TEXT_HTML, body.into())
    }

    fn text(status: StatusCode, body: impl Into<String>) -> Response {
        Self::with_body(status, TEXT_PLAIN, body.into())
    }

    fn json(status: StatusCode, body: &serde_json::Value) -> Response {
        Self::with_body(status, APPLICATION_JSON, body.to_string())
    }

    fn redirect(location: &str, status: StatusCode) -> Result<Response, VeloliaError> {
        let value = HeaderValue::from_str(location)
            .map_err(|e| VeloliaError::invalid_argument(format!("invalid redirect target: {e}")))?;
        let mut response = Self::html(status, String::new());
        response.headers_mut().insert(LOCATION, value);
        Ok(response)
    }

    fn error(status: StatusCode, message: &str) -> Response {
        Self::text(status, message)
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        Self::json(status, &body)
    }
}
