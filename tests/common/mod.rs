//! Common test utilities for compiler tests
//!
//! Provides shared helper functions for:
//! - Creating seeded in-memory stores
//! - Declaring the `users` model fields
//! - Collecting rows from a query

#![allow(dead_code)]

use docbridge::{
    DbResult, FieldDef, InMemoryStore, InsertDescriptor, QueryCompiler, QueryDescriptor, Row,
};
use serde_json::{json, Value};

pub fn id_field() -> FieldDef {
    FieldDef::new("id", "objectid")
}

pub fn name_field() -> FieldDef {
    FieldDef::new("name", "text")
}

pub fn age_field() -> FieldDef {
    FieldDef::new("age", "integer").with_default(json!(0))
}

pub fn dept_field() -> FieldDef {
    FieldDef::new("dept", "varchar").with_column("department")
}

pub fn user_fields() -> Vec<FieldDef> {
    vec![id_field(), name_field(), age_field(), dept_field()]
}

pub fn users_query() -> QueryDescriptor {
    QueryDescriptor::new("users", user_fields())
}

/// Insert one user through the compiler and return its id
pub fn insert_user(compiler: &QueryCompiler<'_>, name: &str, age: i64, dept: &str) -> String {
    compiler
        .insert(&InsertDescriptor {
            collection: "users".to_string(),
            values: vec![
                (name_field(), json!(name)),
                (age_field(), json!(age)),
                (dept_field(), json!(dept)),
            ],
        })
        .expect("insert should succeed")
}

/// Store with four users inserted through the compiler
pub fn create_seeded_store() -> (InMemoryStore, Vec<String>) {
    let store = InMemoryStore::new();
    let ids = {
        let compiler = QueryCompiler::new(&store);
        vec![
            insert_user(&compiler, "Alice", 30, "eng"),
            insert_user(&compiler, "Bob", 25, "eng"),
            insert_user(&compiler, "Charlie", 35, "sales"),
            insert_user(&compiler, "Diana", 28, "marketing"),
        ]
    };
    (store, ids)
}

/// Store with a `numbers` collection holding `{"n": 0}` .. `{"n": count - 1}`
pub fn create_numbers_store(count: i64) -> InMemoryStore {
    let store = InMemoryStore::new();
    let docs = (0..count)
        .map(|i| json!({"n": i}).as_object().unwrap().clone())
        .collect();
    store.insert_many("numbers", docs);
    store
}

pub fn numbers_query() -> QueryDescriptor {
    QueryDescriptor::new("numbers", vec![FieldDef::new("n", "integer")])
}

pub fn collect_rows(compiler: &QueryCompiler<'_>, query: &QueryDescriptor) -> Vec<Row> {
    compiler
        .results_iter(query)
        .expect("query should compile")
        .collect::<DbResult<Vec<_>>>()
        .expect("rows should decode")
}

/// First column of every row
pub fn first_column(rows: &[Row]) -> Vec<Value> {
    rows.iter().map(|row| row[0].clone()).collect()
}
