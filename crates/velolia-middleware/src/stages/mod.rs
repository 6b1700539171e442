//! Built-in middleware stages.
//!
//! Both are bound in the container by the application builder, under the
//! aliases `request_id` and `log_requests`, so they can be listed by name in
//! global or route middleware.

pub mod logging;
pub mod request_id;

pub use logging::LogRequestsMiddleware;
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
