//! The request abstraction handed to middleware and handlers.
//!
//! A [`Request`] is built from an `http::Request<Bytes>` by the HTTP adapter
//! (or directly in tests). On construction it:
//!
//! - decodes the query string and a JSON or form-encoded body into input maps
//! - applies method override for `POST` (`_method` field or
//!   `X-HTTP-Method-Override` header, limited to `PUT`, `PATCH`, `DELETE`)
//! - normalizes the path: segments percent-decoded (structural characters
//!   stay escaped), traversal sequences, backslashes and NUL bytes removed,
//!   repeated slashes collapsed, leading slash enforced

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::VeloliaError;

/// Header carrying the method override.
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

/// Body field carrying the method override.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// An incoming request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    original_method: Method,
    uri: Uri,
    path: String,
    headers: HeaderMap,
    query: Map<String, Value>,
    body: Map<String, Value>,
    raw_body: Bytes,
    extensions: Extensions,
}

impl Request {
    /// Creates a request with no headers and no body.
    ///
    /// # Example
    ///
    /// ```
    /// use http::Method;
    /// use velolia_core::Request;
    ///
    /// let request = Request::new(Method::GET, "/posts//42/?page=2".parse().unwrap());
    /// assert_eq!(request.path(), "/posts/42/");
    /// assert_eq!(request.query("page").and_then(|v| v.as_str()), Some("2"));
    /// ```
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        let mut request = http::Request::new(Bytes::new());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        Self::from_http(request)
    }

    /// Adapts an `http::Request`.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, raw_body) = request.into_parts();

        let query = parts
            .uri
            .query()
            .map(parse_urlencoded)
            .unwrap_or_default();
        let body = parse_body(&parts.headers, &raw_body);
        let method = resolve_method(&parts.method, &parts.headers, &body);
        let path = sanitize_path(parts.uri.path());

        Self {
            method,
            original_method: parts.method,
            uri: parts.uri,
            path,
            headers: parts.headers,
            query,
            body,
            raw_body,
            extensions: parts.extensions,
        }
    }

    /// The effective method, after override.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The method as received on the wire.
    #[must_use]
    pub fn original_method(&self) -> &Method {
        &self.original_method
    }

    /// Returns `true` if the effective method matches (case-insensitive).
    #[must_use]
    pub fn is_method(&self, method: &str) -> bool {
        self.method.as_str().eq_ignore_ascii_case(method)
    }

    /// The request URI as received.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The normalized path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// A query-string value.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&Value> {
        self.query.get(key)
    }

    /// All query-string values.
    #[must_use]
    pub fn query_map(&self) -> &Map<String, Value> {
        &self.query
    }

    /// All decoded body values.
    #[must_use]
    pub fn body_map(&self) -> &Map<String, Value> {
        &self.body
    }

    /// The undecoded body.
    #[must_use]
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// An input value; the body wins over the query string.
    #[must_use]
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.body.get(key).or_else(|| self.query.get(key))
    }

    /// An input value as a string slice.
    #[must_use]
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input(key).and_then(Value::as_str)
    }

    /// Query and body input merged, body winning.
    #[must_use]
    pub fn all(&self) -> Map<String, Value> {
        let mut all = self.query.clone();
        all.extend(self.body.iter().map(|(k, v)| (k.clone(), v.clone())));
        all
    }

    /// The subset of [`all`](Self::all) with the given keys.
    #[must_use]
    pub fn only(&self, keys: &[&str]) -> Map<String, Value> {
        let all = self.all();
        keys.iter()
            .filter_map(|key| all.get(*key).map(|v| ((*key).to_string(), v.clone())))
            .collect()
    }

    /// [`all`](Self::all) without the given keys.
    #[must_use]
    pub fn except(&self, keys: &[&str]) -> Map<String, Value> {
        let mut all = self.all();
        for key in keys {
            all.remove(*key);
        }
        all
    }

    /// Returns `true` if every key is present in the input.
    #[must_use]
    pub fn has(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.input(key).is_some())
    }

    /// Returns `true` if the key is absent from the input.
    #[must_use]
    pub fn missing(&self, key: &str) -> bool {
        self.input(key).is_none()
    }

    /// Returns `true` if every key is present and not empty.
    #[must_use]
    pub fn filled(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| match self.input(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        })
    }

    /// Decodes the merged input into `T`.
    pub fn parse_input<T: DeserializeOwned>(&self) -> Result<T, VeloliaError> {
        serde_json::from_value(Value::Object(self.all()))
            .map_err(|e| VeloliaError::invalid_argument(e.to_string()))
    }

    /// Returns `true` if the body is JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .is_some_and(|v| v.contains("application/json"))
    }

    /// Returns `true` if the client accepts JSON.
    #[must_use]
    pub fn expects_json(&self) -> bool {
        self.header(ACCEPT.as_str())
            .is_some_and(|v| v.contains("application/json"))
    }

    /// Returns `true` for `X-Requested-With: XMLHttpRequest`.
    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.header("x-requested-with") == Some("XMLHttpRequest")
    }

    /// Returns `true` if the response should be JSON.
    #[must_use]
    pub fn wants_json(&self) -> bool {
        self.is_ajax() || self.expects_json()
    }

    /// Typed per-request extensions.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable typed per-request extensions.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

fn parse_body(headers: &HeaderMap, raw: &Bytes) -> Map<String, Value> {
    if raw.is_empty() {
        return Map::new();
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.contains("application/json") {
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    } else if content_type.contains("application/x-www-form-urlencoded") {
        std::str::from_utf8(raw)
            .map(parse_urlencoded)
            .unwrap_or_default()
    } else {
        Map::new()
    }
}

/// Parses `a=1&b=two+words` into a map of strings, stripping NUL bytes.
pub(crate) fn parse_urlencoded(input: &str) -> Map<String, Value> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), Value::String(decode_component(value)))
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced)
        .map_or_else(|_| spaced.clone(), std::borrow::Cow::into_owned);
    decoded.replace('\0', "")
}

fn resolve_method(method: &Method, headers: &HeaderMap, body: &Map<String, Value>) -> Method {
    if method != Method::POST {
        return method.clone();
    }
    let requested = body
        .get(METHOD_OVERRIDE_FIELD)
        .and_then(Value::as_str)
        .or_else(|| {
            headers
                .get(METHOD_OVERRIDE_HEADER)
                .and_then(|v| v.to_str().ok())
        });

    match requested.map(str::to_ascii_uppercase).as_deref() {
        Some("PUT") => Method::PUT,
        Some("PATCH") => Method::PATCH,
        Some("DELETE") => Method::DELETE,
        _ => Method::POST,
    }
}

/// Normalizes a raw request path.
///
/// Each segment is percent-decoded on its own. A decoded `/`, `?`, `#` or
/// `%` is escaped again so the segment boundaries of the raw path survive,
/// and route captures are decoded after matching.
///
/// # Example
///
/// ```
/// use velolia_core::request::sanitize_path;
///
/// assert_eq!(sanitize_path("/a/../b"), "/a/b");
/// assert_eq!(sanitize_path("//users%2F%2E%2E%2Fadmin"), "/users%2Fadmin");
/// assert_eq!(sanitize_path("/blog/2024%2Frecap%20day"), "/blog/2024%2Frecap day");
/// assert_eq!(sanitize_path(""), "/");
/// ```
#[must_use]
pub fn sanitize_path(raw: &str) -> String {
    let joined = raw.split('/').map(sanitize_segment).collect::<Vec<_>>().join("/");
    let path = strip_traversal(joined);

    let mut normalized = String::with_capacity(path.len() + 1);
    let mut previous_slash = false;
    for ch in std::iter::once('/').chain(path.chars()) {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(ch);
    }
    normalized
}

fn sanitize_segment(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), std::borrow::Cow::into_owned);
    let cleaned = strip_traversal(decoded.replace('\0', ""));

    let mut escaped = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            '?' => escaped.push_str("%3F"),
            '#' => escaped.push_str("%23"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn strip_traversal(mut path: String) -> String {
    loop {
        let next = path.replace("../", "").replace("..\\", "").replace('\\', "");
        if next == path {
            return path;
        }
        path = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn post(body: &'static str, content_type: &str) -> Request {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/posts/1?draft=1")
            .header(CONTENT_TYPE, content_type)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        Request::from_http(request)
    }

    #[test]
    fn test_json_body_is_decoded() {
        let request = post(r#"{"title":"Hello","tags":[]}"#, "application/json");
        assert!(request.is_json());
        assert_eq!(request.input_str("title"), Some("Hello"));
        assert_eq!(request.input_str("draft"), Some("1"));
        assert!(request.has(&["title", "draft"]));
        assert!(!request.filled(&["tags"]));
    }

    #[test]
    fn test_form_body_is_decoded() {
        let request = post("title=Hello+World&body=a%26b", "application/x-www-form-urlencoded");
        assert_eq!(request.input_str("title"), Some("Hello World"));
        assert_eq!(request.input_str("body"), Some("a&b"));
    }

    #[test]
    fn test_method_override_from_field() {
        let request = post("_method=delete", "application/x-www-form-urlencoded");
        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.original_method(), Method::POST);
    }

    #[test]
    fn test_method_override_from_header() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/posts/1")
            .header(METHOD_OVERRIDE_HEADER, "PATCH")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(Request::from_http(request).method(), Method::PATCH);
    }

    #[test]
    fn test_method_override_ignores_unknown_and_non_post() {
        let request = post("_method=TRACE", "application/x-www-form-urlencoded");
        assert_eq!(request.method(), Method::POST);

        let request = http::Request::builder()
            .method(Method::GET)
            .uri("/?_method=DELETE")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(Request::from_http(request).method(), Method::GET);
    }

    #[test]
    fn test_only_and_except() {
        let request = post(r#"{"a":1,"b":2,"c":3}"#, "application/json");
        let only = request.only(&["a", "c", "zzz"]);
        assert_eq!(only.len(), 2);
        let except = request.except(&["a", "draft"]);
        assert_eq!(except.len(), 2);
        assert!(except.contains_key("b"));
    }

    #[test]
    fn test_parse_input() {
        #[derive(serde::Deserialize)]
        struct Draft {
            title: String,
            draft: String,
        }

        let request = post(r#"{"title":"Hi"}"#, "application/json");
        let draft: Draft = request.parse_input().unwrap();
        assert_eq!(draft.title, "Hi");
        assert_eq!(draft.draft, "1");
    }

    #[test]
    fn test_expects_json() {
        let request = http::Request::builder()
            .uri("/")
            .header(ACCEPT, "application/json, text/plain")
            .body(Bytes::new())
            .unwrap();
        let request = Request::from_http(request);
        assert!(request.expects_json());
        assert!(request.wants_json());
    }

    #[test]
    fn test_sanitize_path_cases() {
        assert_eq!(sanitize_path("/"), "/");
        assert_eq!(sanitize_path("posts"), "/posts");
        assert_eq!(sanitize_path("///posts///1"), "/posts/1");
        assert_eq!(sanitize_path("/a/....//b"), "/a/b");
        assert_eq!(sanitize_path("/a%00b"), "/ab");
        assert_eq!(sanitize_path("/caf%C3%A9"), "/café");
        assert_eq!(sanitize_path("/a\\b"), "/ab");
    }

    #[test]
    fn test_sanitize_path_keeps_encoded_separators() {
        assert_eq!(sanitize_path("/blog/2024%2Frecap"), "/blog/2024%2Frecap");
        assert_eq!(sanitize_path("/q/what%3F%23top"), "/q/what%3F%23top");
        assert_eq!(sanitize_path("/sale/100%25"), "/sale/100%25");
        assert_eq!(sanitize_path("/a/%2E%2E%2Fetc"), "/a/etc");
        assert_eq!(sanitize_path("/a/%2E%2E/b"), "/a/b");
    }

    proptest! {
        #[test]
        fn prop_sanitized_path_is_normalized(raw in "[a-z./\\\\%0-9]{0,40}") {
            let path = sanitize_path(&raw);
            prop_assert!(path.starts_with('/'));
            prop_assert!(!path.contains("//"));
            prop_assert!(!path.contains("../"));
            prop_assert!(!path.contains('\\'));
            prop_assert!(!path.contains('\0'));
        }
    }
}
