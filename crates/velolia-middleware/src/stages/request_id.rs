//! Request ID middleware.
//!
//! Every request gets a [`RequestId`] (UUID v7) stored in its extensions,
//! where handlers and the error boundary can read it. The same id is echoed
//! in the `x-request-id` response header so clients can correlate their
//! requests with server logs.

use http::HeaderValue;
use velolia_container::{Arguments, ContainerError, Injectable, Parameter};
use velolia_core::{BoxFuture, Request, RequestId, Response, VeloliaResult};

use crate::middleware::{Middleware, Next};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that assigns request IDs.
///
/// # Behavior
///
/// 1. If trusted, reuse a valid incoming `x-request-id`
/// 2. Otherwise generate a new UUID v7
/// 3. Store the id in the request extensions
/// 4. Add it to the response headers, errors excepted
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// A middleware that always generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A middleware that keeps valid incoming ids, for traffic from trusted
    /// upstream services.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn incoming(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        request.header(REQUEST_ID_HEADER).and_then(RequestId::parse)
    }
}

impl Injectable for RequestIdMiddleware {
    fn id() -> &'static str {
        "velolia.middleware.request_id"
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::value("trust_incoming").with_default(false)]
    }

    fn construct(args: Arguments) -> Result<Self, ContainerError> {
        Ok(Self {
            trust_incoming: args.value("trust_incoming")?,
        })
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(&'a self, mut request: Request, next: Next) -> BoxFuture<'a, VeloliaResult<Response>> {
        Box::pin(async move {
            let request_id = self.incoming(&request).unwrap_or_default();
            request.extensions_mut().insert(request_id);

            let mut response = next.run(request).await?;
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose;
    use crate::stage::Stage;
    use http::{Method, StatusCode};
    use std::sync::Arc;
    use uuid::Uuid;
    use velolia_container::Container;
    use velolia_core::ResponseExt;

    fn request_with_id(id: Option<&str>) -> Request {
        let mut request = Request::new(Method::GET, "/test".parse().unwrap());
        if let Some(id) = id {
            request
                .headers_mut()
                .insert(REQUEST_ID_HEADER, HeaderValue::from_str(id).unwrap());
        }
        request
    }

    async fn run(middleware: RequestIdMiddleware, request: Request) -> (Response, Option<RequestId>) {
        let (tx, rx) = std::sync::mpsc::channel();
        let next = compose(
            vec![Stage::inline(middleware)],
            move |req: Request| async move {
                let _ = tx.send(req.extensions().get::<RequestId>().copied());
                Ok(Response::text(StatusCode::OK, "OK"))
            },
            Arc::new(Container::new()),
        );
        let response = next.run(request).await.unwrap();
        (response, rx.recv().ok().flatten())
    }

    fn header(response: &Response) -> &str {
        response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_generates_request_id_when_missing() {
        let (response, seen) = run(RequestIdMiddleware::new(), request_with_id(None)).await;
        let seen = seen.unwrap();
        assert_eq!(header(&response), seen.to_string());
    }

    #[tokio::test]
    async fn test_ignores_incoming_id_when_not_trusted() {
        let incoming = "01234567-89ab-7def-8123-456789abcdef";
        let (response, _) = run(RequestIdMiddleware::new(), request_with_id(Some(incoming))).await;
        assert_ne!(header(&response), incoming);
    }

    #[tokio::test]
    async fn test_uses_incoming_id_when_trusted() {
        let incoming = "01234567-89ab-7def-8123-456789abcdef";
        let (response, seen) =
            run(RequestIdMiddleware::trust_incoming(), request_with_id(Some(incoming))).await;
        assert_eq!(header(&response), incoming);
        assert_eq!(seen.unwrap().to_string(), incoming);
    }

    #[tokio::test]
    async fn test_ignores_invalid_incoming_id() {
        let (response, _) = run(
            RequestIdMiddleware::trust_incoming(),
            request_with_id(Some("not-a-valid-uuid")),
        )
        .await;
        assert!(Uuid::parse_str(header(&response)).is_ok());
    }

    #[test]
    fn test_resolves_through_container() {
        let container = Container::new();
        let middleware = container.resolve::<RequestIdMiddleware>().unwrap();
        assert!(!middleware.trust_incoming);
        assert_eq!(middleware.name(), "request_id");
    }
}
