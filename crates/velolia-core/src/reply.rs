//! Handler return values.
//!
//! Handlers may return anything implementing [`IntoReply`]. The result is
//! normalized into a [`Response`]:
//!
//! - a [`Response`] passes through untouched
//! - arrays and objects (via [`Json`], `serde_json::Value` or `Vec<T>`)
//!   become an `application/json` body
//! - scalars become the raw body of a `200` response

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::VeloliaError;
use crate::response::{Response, ResponseExt};

/// A normalized handler result.
#[derive(Debug)]
pub enum Reply {
    /// Already a response.
    Response(Response),
    /// An encoded array or object.
    Json(Value),
    /// A raw scalar body.
    Text(String),
}

impl Reply {
    /// Converts the reply into a response.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Response(response) => response,
            Self::Json(value) => Response::json(StatusCode::OK, &value),
            Self::Text(body) => Response::html(StatusCode::OK, body),
        }
    }

    /// Classifies a JSON value: arrays and objects stay JSON, scalars become text.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(_) | Value::Object(_) => Self::Json(value),
            Value::Null => Self::Text(String::new()),
            Value::Bool(true) => Self::Text("1".to_string()),
            Value::Bool(false) => Self::Text(String::new()),
            Value::String(s) => Self::Text(s),
            Value::Number(n) => Self::Text(n.to_string()),
        }
    }
}

/// Conversion of handler results into a [`Reply`].
pub trait IntoReply {
    /// Performs the conversion.
    fn into_reply(self) -> Result<Reply, VeloliaError>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        Ok(self)
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        Ok(Reply::Response(self))
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        Ok(Reply::from_value(self))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        Ok(Reply::Text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        Ok(Reply::Text(self.to_string()))
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        Ok(Reply::Text(String::new()))
    }
}

macro_rules! scalar_reply {
    ($($ty:ty),*) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> Result<Reply, VeloliaError> {
                    Ok(Reply::from_value(Value::from(self)))
                }
            }
        )*
    };
}

scalar_reply!(bool, i32, i64, u32, u64, f64);

impl<T: Serialize> IntoReply for Vec<T> {
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        Json(self).into_reply()
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<VeloliaError>,
{
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        self.map_err(Into::into)?.into_reply()
    }
}

/// Serializes `T` as a JSON reply.
///
/// # Example
///
/// ```
/// use velolia_core::{IntoReply, Json, Reply};
///
/// #[derive(serde::Serialize)]
/// struct Post {
///     id: u64,
/// }
///
/// let reply = Json(Post { id: 7 }).into_reply().unwrap();
/// assert!(matches!(reply, Reply::Json(_)));
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Reply, VeloliaError> {
        let value = serde_json::to_value(self.0)
            .map_err(|e| VeloliaError::internal_with_source("failed to encode response", e))?;
        Ok(Reply::from_value(value))
    }
}
