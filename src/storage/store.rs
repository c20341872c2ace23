//! Document store interface.
//!
//! The compiler talks to the store only through these traits. A
//! [`DocumentStore`] is the connection provider and hands out
//! [`CollectionHandle`]s bound to one named collection.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::cursor::Cursor;
use super::document::Document;
use crate::error::StoreResult;

/// The store's native query expression: column to literal (equality) or
/// column to operator mapping such as `{"$gt": 5}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterDocument(Map<String, Value>);

impl FilterDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the condition for a column, returning the one it replaced
    pub fn insert(&mut self, column: impl Into<String>, condition: Value) -> Option<Value> {
        self.0.insert(column.into(), condition)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl fmt::Display for FilterDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<Map<String, Value>> for FilterDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Sort direction; serialized as `1` / `-1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_i8(self) -> i8 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

/// Cursor options for a find
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FindOptions {
    /// Number of matching documents to skip
    pub skip: u64,
    /// Maximum number of documents to return; `None` is unlimited and
    /// `Some(0)` returns nothing
    pub limit: Option<u64>,
    /// Sort keys applied before skip/limit, in priority order
    #[serde(serialize_with = "serialize_sort")]
    pub sort: Vec<(String, SortDirection)>,
    /// Columns to return; `None` returns whole documents
    pub projection: Option<Vec<String>>,
}

fn serialize_sort<S: Serializer>(
    sort: &[(String, SortDirection)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(sort.len()))?;
    for (column, direction) in sort {
        map.serialize_entry(column, direction)?;
    }
    map.end()
}

/// Connection provider
pub trait DocumentStore: Send + Sync {
    /// Get a handle bound to the named collection.
    ///
    /// Stores that create collections lazily return a handle even when
    /// nothing has been written yet.
    fn collection(&self, name: &str) -> StoreResult<Box<dyn CollectionHandle + '_>>;
}

/// Operations on one collection
pub trait CollectionHandle {
    /// Open a cursor over the documents matching `filter`
    fn find(&self, filter: &FilterDocument, options: &FindOptions) -> StoreResult<Cursor>;

    /// Count the documents matching `filter`
    fn count(&self, filter: &FilterDocument) -> StoreResult<u64>;

    /// Insert or fully replace the document whose `key_field` equals the
    /// new document's value for it
    fn save(&self, key_field: &str, document: Document) -> StoreResult<()>;

    /// Set the given fields on every matching document, returning how many
    /// matched
    fn update_many(&self, filter: &FilterDocument, changes: &Document) -> StoreResult<u64>;

    /// Remove every matching document, returning how many were removed
    fn remove(&self, filter: &FilterDocument) -> StoreResult<u64>;
}
