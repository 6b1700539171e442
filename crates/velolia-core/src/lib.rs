//! # Velolia Core
//!
//! Core types shared by every layer of the Velolia dispatch engine:
//!
//! - [`Request`] - the normalized incoming request
//! - [`Response`] / [`ResponseExt`] - the outgoing response and constructors
//! - [`Reply`] / [`IntoReply`] - normalization of handler return values
//! - [`VeloliaError`] - the error taxonomy, mapped to HTTP statuses
//! - [`Model`] / [`RecordStore`] - domain records and the lookup seam used
//!   for route-model binding
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/velolia-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod model;
mod reply;
pub mod request;
mod request_id;
mod response;

pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, VeloliaError, VeloliaResult};
pub use model::{BoxFuture, MemoryStore, Model, RecordStore, Row, StoreError};
pub use reply::{IntoReply, Json, Reply};
pub use request::Request;
pub use request_id::RequestId;
pub use response::{Response, ResponseExt};

/// Re-exported so downstream crates agree on the container version.
pub use velolia_container as container;
