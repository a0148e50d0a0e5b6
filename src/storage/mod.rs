//! Key-value storage behind the data commands

pub mod db;

use thiserror::Error;

pub use db::{create_pool, get_connection, DbConnection, DbPool, SqliteStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Stored JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stored value, remembering whether it was saved as text or JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Text(String),
    Json(serde_json::Value),
}

impl StoredValue {
    /// The value as JSON; text becomes a JSON string
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Text(text) => serde_json::Value::String(text),
            Self::Json(json) => json,
        }
    }
}

/// Path-addressed storage used by the `/data_*` commands
pub trait KeyValueStore: Send + Sync {
    fn set(&self, path: &str, value: StoredValue) -> Result<(), StoreError>;

    fn get(&self, path: &str) -> Result<Option<StoredValue>, StoreError>;

    /// Every value stored below `path`, keyed by its path relative to `path`
    fn descendants(&self, path: &str) -> Result<Vec<(String, StoredValue)>, StoreError>;

    /// The value at `path`, or the object formed by the values below it
    ///
    /// A value stored exactly at `path` wins over anything stored below it.
    fn get_tree(&self, path: &str) -> Result<Option<StoredValue>, StoreError> {
        if let Some(value) = self.get(path)? {
            return Ok(Some(value));
        }

        let children = self.descendants(path)?;
        if children.is_empty() {
            return Ok(None);
        }

        let mut tree = serde_json::Value::Object(serde_json::Map::new());
        for (relative, value) in children {
            insert_at(&mut tree, &relative, value.into_json());
        }
        Ok(Some(StoredValue::Json(tree)))
    }
}

/// Places `value` at the `/`-separated `relative` path inside `tree`
///
/// Intermediate values that are not objects are replaced by objects, so a
/// deeper entry overrides a shallower scalar.
fn insert_at(tree: &mut serde_json::Value, relative: &str, value: serde_json::Value) {
    let mut node = tree;
    let mut segments = relative.split('/').filter(|segment| !segment.is_empty()).peekable();

    while let Some(segment) = segments.next() {
        if !node.is_object() {
            *node = serde_json::Value::Object(serde_json::Map::new());
        }
        let serde_json::Value::Object(map) = node else {
            return;
        };
        if segments.peek().is_none() {
            match map.get_mut(segment) {
                // Keep children that were placed before their parent
                Some(existing) if existing.is_object() && !value.is_object() => {}
                Some(existing) => *existing = value,
                None => {
                    map.insert(segment.to_string(), value);
                }
            }
            return;
        }
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    }
}
