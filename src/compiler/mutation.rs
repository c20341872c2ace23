//! Insert, update and delete compilation.

use serde_json::Value;

use super::coercion::to_storage;
use super::executor::QueryCompiler;
use crate::error::{DbError, DbResult};
use crate::query::{DeleteDescriptor, FieldDef, InsertDescriptor, UpdateDescriptor};
use crate::storage::{Document, ObjectId};

impl QueryCompiler<'_> {
    /// Insert one row as a new document.
    ///
    /// The configured id column always receives a freshly generated
    /// identifier, replacing any value the caller supplied. The identifier
    /// is written in the storage type the insert declares for the id column,
    /// falling back to the configured id storage type. Returns the new
    /// identifier in hex form.
    pub fn insert(&self, insert: &InsertDescriptor) -> DbResult<String> {
        let id_type = insert
            .values
            .iter()
            .find(|(field, _)| field.column == self.config.id_column)
            .map(|(field, _)| &field.storage_type)
            .unwrap_or(&self.config.id_storage_type);

        let mut document = coerce_values(&insert.values)?;
        let id = ObjectId::new();
        let native_id = to_storage(id_type, &Value::String(id.to_hex()))?;
        document.insert(self.config.id_column.clone(), native_id);

        tracing::debug!("save into '{}': id={}", insert.collection, id);
        let collection = self.store.collection(&insert.collection)?;
        collection.save(&self.config.id_column, document)?;
        Ok(id.to_hex())
    }

    /// Set fields on every document matching the filter.
    ///
    /// Fields not named in the descriptor are left as they are. Returns the
    /// number of matched documents.
    pub fn update(&self, update: &UpdateDescriptor) -> DbResult<u64> {
        if update
            .values
            .iter()
            .any(|(field, _)| field.column == self.config.id_column)
        {
            return Err(DbError::UnsupportedQueryShape(format!(
                "the identifier column '{}' cannot be updated",
                self.config.id_column
            )));
        }

        let filter = self.compile_filter(&update.where_clause)?;
        let changes = coerce_values(&update.values)?;
        if changes.is_empty() {
            return Ok(0);
        }

        tracing::debug!(
            "update on '{}': filter={} fields={:?}",
            update.collection,
            filter,
            changes.keys().collect::<Vec<_>>()
        );
        let collection = self.store.collection(&update.collection)?;
        Ok(collection.update_many(&filter, &changes)?)
    }

    /// Remove every document matching the filter. Removing nothing is not
    /// an error.
    pub fn delete(&self, delete: &DeleteDescriptor) -> DbResult<u64> {
        let filter = self.compile_filter(&delete.where_clause)?;
        tracing::debug!("remove on '{}': filter={}", delete.collection, filter);
        let collection = self.store.collection(&delete.collection)?;
        Ok(collection.remove(&filter)?)
    }
}

fn coerce_values(values: &[(FieldDef, Value)]) -> DbResult<Document> {
    let mut document = Document::new();
    for (field, value) in values {
        document.insert(field.column.clone(), to_storage(&field.storage_type, value)?);
    }
    Ok(document)
}
