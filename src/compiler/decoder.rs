//! Result decoder: documents to row tuples.

use serde_json::Value;

use super::coercion::from_storage;
use super::executor::QueryCompiler;
use crate::error::{DbError, DbResult};
use crate::query::{FieldDef, QueryDescriptor};
use crate::storage::matcher::get_field_value;
use crate::storage::{Cursor, Document};

/// One decoded row, aligned to the descriptor's fields
pub type Row = Vec<Value>;

/// Lazy row sequence over an open cursor.
///
/// Each document is decoded only when the caller asks for the next row.
/// Dropping the iterator releases the cursor.
#[derive(Debug)]
pub struct RowIter<'q> {
    cursor: Cursor,
    fields: &'q [FieldDef],
}

impl<'q> RowIter<'q> {
    pub fn new(cursor: Cursor, fields: &'q [FieldDef]) -> Self {
        Self { cursor, fields }
    }
}

impl Iterator for RowIter<'_> {
    type Item = DbResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let document = self.cursor.next()?;
        Some(
            document
                .map_err(DbError::from)
                .and_then(|doc| decode_document(&doc, self.fields)),
        )
    }
}

/// Decode one document into a row, substituting field defaults for
/// missing keys. Dotted columns address nested values.
pub fn decode_document(document: &Document, fields: &[FieldDef]) -> DbResult<Row> {
    fields
        .iter()
        .map(|field| {
            let raw = get_field_value(document, &field.column).unwrap_or(&field.default);
            from_storage(&field.storage_type, raw)
        })
        .collect()
}

impl QueryCompiler<'_> {
    /// Run a read and decode its documents lazily into rows
    pub fn results_iter<'q>(&self, query: &'q QueryDescriptor) -> DbResult<RowIter<'q>> {
        let cursor = self.get_results(query)?;
        Ok(RowIter::new(cursor, &query.fields))
    }
}
