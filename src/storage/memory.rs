//! In-memory document store.
//!
//! Collections are created lazily on first write and keep documents in
//! insertion order, which is the "store-defined order" for unsorted finds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::cursor::Cursor;
use super::document::Document;
use super::matcher::{compare_values, get_field_value, matches, values_equal};
use super::store::{CollectionHandle, DocumentStore, FilterDocument, FindOptions, SortDirection};
use crate::error::{StoreError, StoreResult};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
    open_cursors: Arc<AtomicUsize>,
    offline: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON object mapping collection names to arrays
    /// of documents
    pub fn from_fixtures(fixtures: &Value) -> StoreResult<Self> {
        let store = Self::new();
        let collections = fixtures.as_object().ok_or_else(|| {
            StoreError::InvalidDocument("fixtures must be an object of collections".to_string())
        })?;
        for (name, docs) in collections {
            let docs = docs.as_array().ok_or_else(|| {
                StoreError::InvalidDocument(format!("collection '{}' must be an array", name))
            })?;
            let docs = docs
                .iter()
                .map(|doc| {
                    doc.as_object().cloned().ok_or_else(|| {
                        StoreError::InvalidDocument(format!(
                            "documents in '{}' must be objects",
                            name
                        ))
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            store.insert_many(name, docs);
        }
        Ok(store)
    }

    /// Append documents to a collection as-is
    pub fn insert_many(&self, collection: &str, docs: Vec<Document>) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    /// Snapshot of a collection's documents in store order
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// List all collection names
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of cursors that have not been exhausted or dropped yet
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Simulate a lost connection: every operation fails while offline
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

impl DocumentStore for InMemoryStore {
    fn collection(&self, name: &str) -> StoreResult<Box<dyn CollectionHandle + '_>> {
        self.check_online()?;
        Ok(Box::new(MemoryCollection {
            store: self,
            name: name.to_string(),
        }))
    }
}

struct MemoryCollection<'a> {
    store: &'a InMemoryStore,
    name: String,
}

impl CollectionHandle for MemoryCollection<'_> {
    fn find(&self, filter: &FilterDocument, options: &FindOptions) -> StoreResult<Cursor> {
        self.store.check_online()?;

        let mut docs: Vec<Document> = {
            let collections = self.store.collections.read();
            collections
                .get(&self.name)
                .map(|docs| docs.iter().filter(|d| matches(d, filter)).cloned().collect())
                .unwrap_or_default()
        };

        if !options.sort.is_empty() {
            docs.sort_by(|a, b| {
                for (column, direction) in &options.sort {
                    let left = get_field_value(a, column).unwrap_or(&Value::Null);
                    let right = get_field_value(b, column).unwrap_or(&Value::Null);
                    let ordering = match direction {
                        SortDirection::Ascending => compare_values(left, right),
                        SortDirection::Descending => compare_values(right, left),
                    };
                    if ordering != std::cmp::Ordering::Equal {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        let projection = options.projection.clone();

        let stream = docs
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(move |doc| Ok(project(doc, projection.as_deref())));

        let open_cursors = self.store.open_cursors.clone();
        open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Cursor::new(stream, move || {
            open_cursors.fetch_sub(1, Ordering::SeqCst);
        }))
    }

    fn count(&self, filter: &FilterDocument) -> StoreResult<u64> {
        self.store.check_online()?;
        let collections = self.store.collections.read();
        let count = collections
            .get(&self.name)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    fn save(&self, key_field: &str, document: Document) -> StoreResult<()> {
        self.store.check_online()?;
        let key = document.get(key_field).cloned().ok_or_else(|| {
            StoreError::InvalidDocument(format!("document has no '{}' key", key_field))
        })?;

        let mut collections = self.store.collections.write();
        let docs = collections.entry(self.name.clone()).or_default();
        let existing = docs
            .iter()
            .position(|d| d.get(key_field).is_some_and(|k| values_equal(k, &key)));
        match existing {
            Some(pos) => docs[pos] = document,
            None => docs.push(document),
        }
        Ok(())
    }

    fn update_many(&self, filter: &FilterDocument, changes: &Document) -> StoreResult<u64> {
        self.store.check_online()?;
        let mut collections = self.store.collections.write();
        let Some(docs) = collections.get_mut(&self.name) else {
            return Ok(0);
        };

        let mut matched = 0;
        for doc in docs.iter_mut().filter(|d| matches(d, filter)) {
            for (field, value) in changes {
                doc.insert(field.clone(), value.clone());
            }
            matched += 1;
        }
        Ok(matched)
    }

    fn remove(&self, filter: &FilterDocument) -> StoreResult<u64> {
        self.store.check_online()?;
        let mut collections = self.store.collections.write();
        let Some(docs) = collections.get_mut(&self.name) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|d| !matches(d, filter));
        Ok((before - docs.len()) as u64)
    }
}

/// A dotted column keeps its whole top-level parent
fn projects_key(column: &str, key: &str) -> bool {
    column == key
        || column
            .strip_prefix(key)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn project(doc: Document, projection: Option<&[String]>) -> Document {
    match projection {
        None => doc,
        Some(columns) => doc
            .into_iter()
            .filter(|(key, _)| columns.iter().any(|c| projects_key(c, key)))
            .collect(),
    }
}
