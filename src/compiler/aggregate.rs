//! Aggregate path. Only a lone COUNT can be expressed.

use serde_json::Value;

use super::decoder::{Row, RowIter};
use super::executor::QueryCompiler;
use crate::error::{DbError, DbResult};
use crate::query::{Aggregate, AggregateKind, QueryDescriptor, ResultType};

/// Result of executing a read
#[derive(Debug)]
pub enum QueryOutput<'q> {
    /// Plain read: decoded rows, produced lazily
    Rows(RowIter<'q>),
    /// Aggregate read for a single-row caller
    Single(Row),
    /// Aggregate read for a multi-row caller
    Multi(Vec<Row>),
}

impl QueryCompiler<'_> {
    /// Execute a read. Aggregate requests are answered in the shape named by
    /// `result_type`; plain reads return their rows lazily.
    pub fn execute<'q>(
        &self,
        query: &'q QueryDescriptor,
        result_type: ResultType,
    ) -> DbResult<QueryOutput<'q>> {
        if query.aggregates.is_empty() {
            return Ok(QueryOutput::Rows(self.results_iter(query)?));
        }
        let row = self.execute_aggregates(query)?;
        Ok(match result_type {
            ResultType::Single => QueryOutput::Single(row),
            ResultType::Multi => QueryOutput::Multi(vec![row]),
        })
    }

    fn execute_aggregates(&self, query: &QueryDescriptor) -> DbResult<Row> {
        match query.aggregates.as_slice() {
            [Aggregate {
                kind: AggregateKind::Count,
                ..
            }] => {
                let count = self.get_count(query)?;
                Ok(vec![Value::from(count)])
            }
            [other] => Err(DbError::UnsupportedQueryShape(format!(
                "aggregate {:?} on '{}' is not supported",
                other.kind, other.alias
            ))),
            many => Err(DbError::UnsupportedQueryShape(format!(
                "{} simultaneous aggregates are not supported",
                many.len()
            ))),
        }
    }
}
