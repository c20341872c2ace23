//! Query executor: descriptors to find/count commands on the store.

use serde::Serialize;

use super::predicate::compile_where;
use crate::config::CompilerConfig;
use crate::error::DbResult;
use crate::query::{QueryDescriptor, WhereNode};
use crate::storage::{Cursor, DocumentStore, FilterDocument, FindOptions, SortDirection};

/// A read compiled into the store's native form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub collection: String,
    pub filter: FilterDocument,
    pub options: FindOptions,
}

/// Compiles descriptors and runs them against a store.
///
/// The store is borrowed for the compiler's lifetime; the compiler itself
/// holds no state between calls.
pub struct QueryCompiler<'a> {
    pub(crate) store: &'a dyn DocumentStore,
    pub(crate) config: CompilerConfig,
}

impl<'a> QueryCompiler<'a> {
    /// Create a compiler with the default configuration
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self::with_config(store, CompilerConfig::default())
    }

    pub fn with_config(store: &'a dyn DocumentStore, config: CompilerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a filter tree with the configured conflict policy
    pub fn compile_filter(&self, where_clause: &WhereNode) -> DbResult<FilterDocument> {
        compile_where(where_clause, self.config.conflict_policy)
    }

    /// Compile a read without touching the store
    pub fn compile(&self, query: &QueryDescriptor) -> DbResult<CompiledQuery> {
        let filter = self.compile_filter(&query.where_clause)?;
        let (skip, limit) = pagination(query.low_mark, query.high_mark);

        let sort = query
            .order_by
            .iter()
            .map(|order| {
                let direction = if order.descending {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                };
                (order.column.clone(), direction)
            })
            .collect();

        let projection = if query.fields.is_empty() {
            None
        } else {
            Some(query.fields.iter().map(|f| f.column.clone()).collect())
        };

        Ok(CompiledQuery {
            collection: query.collection.clone(),
            filter,
            options: FindOptions {
                skip,
                limit,
                sort,
                projection,
            },
        })
    }

    /// Run a read and return the raw document cursor
    pub fn get_results(&self, query: &QueryDescriptor) -> DbResult<Cursor> {
        let compiled = self.compile(query)?;
        tracing::debug!(
            "find on '{}': filter={} skip={} limit={:?}",
            compiled.collection,
            compiled.filter,
            compiled.options.skip,
            compiled.options.limit
        );
        let collection = self.store.collection(&compiled.collection)?;
        Ok(collection.find(&compiled.filter, &compiled.options)?)
    }

    /// Number of documents the read would return
    pub fn get_count(&self, query: &QueryDescriptor) -> DbResult<u64> {
        let filter = self.compile_filter(&query.where_clause)?;
        let (skip, limit) = pagination(query.low_mark, query.high_mark);
        tracing::debug!("count on '{}': filter={}", query.collection, filter);

        let collection = self.store.collection(&query.collection)?;
        let matched = collection.count(&filter)?;
        let windowed = matched.saturating_sub(skip);
        Ok(limit.map_or(windowed, |limit| windowed.min(limit)))
    }

    pub fn has_results(&self, query: &QueryDescriptor) -> DbResult<bool> {
        Ok(self.get_count(query)? > 0)
    }
}

/// Translate slice marks into skip and limit.
///
/// Without a high mark there is no limit at all; a high mark at or below
/// the low mark yields a limit of zero.
pub fn pagination(low_mark: Option<u64>, high_mark: Option<u64>) -> (u64, Option<u64>) {
    let skip = low_mark.unwrap_or(0);
    (skip, high_mark.map(|high| high.saturating_sub(skip)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Constraint, FieldDef, Lookup, OrderBy};
    use crate::storage::InMemoryStore;
    use serde_json::json;

    fn numbers_store(n: i64) -> InMemoryStore {
        let store = InMemoryStore::new();
        let docs = (0..n)
            .map(|i| json!({"n": i}).as_object().unwrap().clone())
            .collect();
        store.insert_many("numbers", docs);
        store
    }

    fn numbers_query() -> QueryDescriptor {
        QueryDescriptor::new("numbers", vec![FieldDef::new("n", "integer")])
    }

    #[test]
    fn test_pagination() {
        assert_eq!(pagination(None, None), (0, None));
        assert_eq!(pagination(Some(5), None), (5, None));
        assert_eq!(pagination(Some(5), Some(15)), (5, Some(10)));
        assert_eq!(pagination(None, Some(3)), (0, Some(3)));
        assert_eq!(pagination(Some(10), Some(4)), (10, Some(0)));
    }

    #[test]
    fn test_compile_query() {
        let store = InMemoryStore::new();
        let compiler = QueryCompiler::new(&store);
        let query = numbers_query()
            .filter(WhereNode::all([Constraint::new("n", Lookup::Gte, "integer", json!(["3"]))]))
            .order_by(OrderBy::desc("n"))
            .slice(Some(2), Some(7));

        let compiled = compiler.compile(&query).unwrap();
        assert_eq!(
            serde_json::to_value(&compiled).unwrap(),
            json!({
                "collection": "numbers",
                "filter": {"n": {"$gte": 3}},
                "options": {
                    "skip": 2,
                    "limit": 5,
                    "sort": {"n": -1},
                    "projection": ["n"]
                }
            })
        );
    }

    #[test]
    fn test_no_high_mark_is_unlimited() {
        let store = numbers_store(20);
        let compiler = QueryCompiler::new(&store);
        let query = numbers_query().slice(Some(5), None);
        assert_eq!(compiler.get_results(&query).unwrap().count(), 15);
    }

    #[test]
    fn test_get_count_honours_window() {
        let store = numbers_store(20);
        let compiler = QueryCompiler::new(&store);
        assert_eq!(compiler.get_count(&numbers_query()).unwrap(), 20);
        assert_eq!(
            compiler
                .get_count(&numbers_query().slice(Some(5), Some(15)))
                .unwrap(),
            10
        );
        assert_eq!(
            compiler
                .get_count(&numbers_query().slice(Some(18), Some(30)))
                .unwrap(),
            2
        );
        assert_eq!(
            compiler
                .get_count(&numbers_query().slice(Some(25), None))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let store = numbers_store(20);
        let compiler = QueryCompiler::new(&store);
        let query = numbers_query().slice(Some(10), Some(4));

        let compiled = compiler.compile(&query).unwrap();
        assert_eq!(compiled.options.skip, 10);
        assert_eq!(compiled.options.limit, Some(0));
        assert_eq!(compiler.get_count(&query).unwrap(), 0);
        assert!(!compiler.has_results(&query).unwrap());
        assert_eq!(compiler.get_results(&query).unwrap().count(), 0);
    }

    #[test]
    fn test_has_results() {
        let store = numbers_store(3);
        let compiler = QueryCompiler::new(&store);
        assert!(compiler.has_results(&numbers_query()).unwrap());

        let query = numbers_query()
            .filter(WhereNode::all([Constraint::new("n", Lookup::Gt, "integer", json!(10))]));
        assert!(!compiler.has_results(&query).unwrap());
    }

    #[test]
    fn test_compile_failure_does_not_touch_store() {
        let store = numbers_store(3);
        store.set_offline(true);
        let compiler = QueryCompiler::new(&store);
        let query = numbers_query().filter(WhereNode::Or(vec![]));
        let err = compiler.get_results(&query).unwrap_err();
        assert!(matches!(err, crate::error::DbError::UnsupportedQueryShape(_)));
    }
}
