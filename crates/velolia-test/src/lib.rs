//! # Velolia Test
//!
//! In-memory request testing for Velolia applications: build a request,
//! send it through a kernel (or any `Request -> Response` function) and
//! assert on the buffered response. No sockets, no ports.
//!
//! ## Example
//!
//! ```ignore
//! use velolia_test::TestClient;
//!
//! #[tokio::test]
//! async fn test_show_post() {
//!     let kernel = app().build()?;
//!     let client = TestClient::new(move |request| {
//!         let kernel = kernel.clone();
//!         async move { kernel.handle(request).await }
//!     });
//!
//!     client
//!         .get("/posts/hello-world")
//!         .accept_json()
//!         .send()
//!         .await
//!         .assert_status(StatusCode::OK)
//!         .assert_json_field("title", &json!("Hello World"));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/velolia-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest, TestHandler};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
