//! Domain records and the storage collaborator used for route-model binding.
//!
//! The router only needs one query from storage: "find the first row in
//! `table` whose `column` equals `value`". [`RecordStore`] is that seam.
//! [`MemoryStore`] is an in-process implementation used by tests and demos.

use std::future::Future;
use std::pin::Pin;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A raw record: column name to value.
pub type Row = Map<String, Value>;

/// Errors raised by a [`RecordStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend failed to run the query.
    #[error("Storage error: {message}")]
    Backend {
        /// Human-readable error message.
        message: String,
    },

    /// A row could not be decoded into the model type.
    #[error("Failed to decode {table} record: {message}")]
    Decode {
        /// The table the row came from.
        table: String,
        /// Human-readable error message.
        message: String,
    },
}

/// A domain record that can be bound from a route placeholder.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use velolia_core::Model;
///
/// #[derive(Serialize, Deserialize)]
/// struct Post {
///     id: u64,
///     slug: String,
/// }
///
/// impl Model for Post {
///     fn table() -> &'static str {
///         "posts"
///     }
///
///     fn route_key_name() -> &'static str {
///         "slug"
///     }
/// }
///
/// let post = Post { id: 1, slug: "hello".into() };
/// assert_eq!(post.route_key().as_deref(), Some("hello"));
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The backing table.
    fn table() -> &'static str;

    /// The column looked up during route-model binding.
    fn route_key_name() -> &'static str {
        "id"
    }

    /// This record's value for [`route_key_name`](Self::route_key_name), as
    /// used in URLs.
    fn route_key(&self) -> Option<String> {
        let Ok(Value::Object(fields)) = serde_json::to_value(self) else {
            return None;
        };
        fields.get(Self::route_key_name()).and_then(key_string)
    }

    /// Decodes a row into the model.
    fn from_row(row: Row) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode {
            table: Self::table().to_string(),
            message: e.to_string(),
        })
    }
}

/// Renders a column value the way it appears in a URL segment.
#[must_use]
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(u8::from(*b).to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// The storage seam used for route-model binding.
pub trait RecordStore: Send + Sync + 'static {
    /// Returns the first row in `table` whose `column` equals `value`.
    fn find_first<'a>(
        &'a self,
        table: &'a str,
        column: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>>;
}

/// An in-memory [`RecordStore`].
///
/// Rows keep insertion order; lookups compare the URL form of each column.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use velolia_core::MemoryStore;
///
/// let store = MemoryStore::new();
/// let row = store.insert("posts", json!({"title": "Hello"}));
/// assert_eq!(row["id"], 1);
/// assert_eq!(store.count("posts"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<IndexMap<String, Vec<Row>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row, assigning an incrementing `id` when absent.
    ///
    /// Non-object values are stored as empty rows.
    pub fn insert(&self, table: &str, row: Value) -> Row {
        let mut row = match row {
            Value::Object(map) => map,
            _ => Row::new(),
        };

        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if !row.contains_key("id") {
            let next = rows
                .iter()
                .filter_map(|r| r.get("id").and_then(Value::as_u64))
                .max()
                .unwrap_or(0)
                + 1;
            row.insert("id".to_string(), Value::from(next));
        }
        rows.push(row.clone());
        row
    }

    /// Serializes and inserts a model.
    pub fn insert_model<M: Model>(&self, model: &M) -> Result<Row, StoreError> {
        let value = serde_json::to_value(model).map_err(|e| StoreError::Backend {
            message: e.to_string(),
        })?;
        Ok(self.insert(M::table(), value))
    }

    /// Merges `changes` into every row where `column` equals `value`.
    /// Returns the number of rows touched.
    pub fn update(&self, table: &str, column: &str, value: &str, changes: &Row) -> usize {
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return 0;
        };
        let mut touched = 0;
        for row in rows.iter_mut().filter(|row| matches(row, column, value)) {
            row.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
            touched += 1;
        }
        touched
    }

    /// Deletes rows where `column` equals `value`. Returns the number removed.
    pub fn delete(&self, table: &str, column: &str, value: &str) -> usize {
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return 0;
        };
        let before = rows.len();
        rows.retain(|row| !matches(row, column, value));
        before - rows.len()
    }

    /// All rows of a table, in insertion order.
    #[must_use]
    pub fn all(&self, table: &str) -> Vec<Row> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    /// Number of rows in a table.
    #[must_use]
    pub fn count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }

    /// Synchronous lookup.
    #[must_use]
    pub fn first_where(&self, table: &str, column: &str, value: &str) -> Option<Row> {
        self.tables
            .read()
            .get(table)
            .and_then(|rows| rows.iter().find(|row| matches(row, column, value)).cloned())
    }
}

fn matches(row: &Row, column: &str, value: &str) -> bool {
    row.get(column)
        .and_then(key_string)
        .is_some_and(|candidate| candidate == value)
}

impl RecordStore for MemoryStore {
    fn find_first<'a>(
        &'a self,
        table: &'a str,
        column: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        Box::pin(async move { Ok(self.first_where(table, column, value)) })
    }
}
