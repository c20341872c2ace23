//! Read path tests
//!
//! Tests for:
//! - Predicate compilation against stored documents
//! - Pagination and ordering
//! - Lazy decoding and cursor release
//! - Store error passthrough

mod common;

use common::*;
use docbridge::{
    Constraint, DbError, DbResult, Lookup, OrderBy, QueryCompiler, Row, StoreError, WhereNode,
};
use serde_json::json;

#[test]
fn test_insert_then_read_back_by_id() {
    let (store, ids) = create_seeded_store();
    let compiler = QueryCompiler::new(&store);

    let query = users_query().filter(WhereNode::all([Constraint::on(
        &id_field(),
        Lookup::Exact,
        json!([ids[2].clone()]),
    )]));
    let rows = collect_rows(&compiler, &query);

    assert_eq!(
        rows,
        vec![vec![
            json!(ids[2]),
            json!("Charlie"),
            json!(35),
            json!("sales")
        ]]
    );
}

#[test]
fn test_generated_ids_are_unique() {
    let (store, mut ids) = create_seeded_store();
    let compiler = QueryCompiler::new(&store);
    for i in 0..20 {
        ids.push(insert_user(&compiler, &format!("user{}", i), i, "ops"));
    }

    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);

    let rows = collect_rows(&compiler, &users_query());
    assert_eq!(rows.len(), total);
}

#[test]
fn test_range_filters() {
    let (store, _) = create_seeded_store();
    let compiler = QueryCompiler::new(&store);

    let query = users_query().filter(WhereNode::all([
        Constraint::on(&age_field(), Lookup::Gte, json!(["28"])),
        Constraint::on(&dept_field(), Lookup::Exact, json!(["eng"])),
    ]));
    let names: Vec<_> = collect_rows(&compiler, &query)
        .into_iter()
        .map(|row| row[1].clone())
        .collect();
    assert_eq!(names, vec![json!("Alice")]);

    let query = users_query().filter(WhereNode::all([Constraint::on(
        &age_field(),
        Lookup::Lt,
        json!([30]),
    )]));
    assert_eq!(collect_rows(&compiler, &query).len(), 2);
}

#[test]
fn test_membership_filter() {
    let (store, _) = create_seeded_store();
    let compiler = QueryCompiler::new(&store);

    let query = users_query()
        .filter(WhereNode::all([Constraint::on(
            &dept_field(),
            Lookup::In,
            json!(["sales", "marketing"]),
        )]))
        .order_by(OrderBy::asc("name"));
    let names: Vec<_> = collect_rows(&compiler, &query)
        .into_iter()
        .map(|row| row[1].clone())
        .collect();
    assert_eq!(names, vec![json!("Charlie"), json!("Diana")]);
}

#[test]
fn test_ordering() {
    let (store, _) = create_seeded_store();
    let compiler = QueryCompiler::new(&store);

    let query = users_query().order_by(OrderBy::desc("age"));
    let ages: Vec<_> = collect_rows(&compiler, &query)
        .into_iter()
        .map(|row| row[2].clone())
        .collect();
    assert_eq!(ages, vec![json!(35), json!(30), json!(28), json!(25)]);
}

#[test]
fn test_missing_field_uses_default() {
    let (store, _) = create_seeded_store();
    store.insert_many(
        "users",
        vec![json!({"name": "Eve"}).as_object().unwrap().clone()],
    );
    let compiler = QueryCompiler::new(&store);

    let query = users_query().filter(WhereNode::all([Constraint::on(
        &name_field(),
        Lookup::Exact,
        json!("Eve"),
    )]));
    let rows = collect_rows(&compiler, &query);
    assert_eq!(
        rows,
        vec![vec![json!(null), json!("Eve"), json!(0), json!(null)]]
    );
}

#[test]
fn test_isnull_filter() {
    let (store, _) = create_seeded_store();
    store.insert_many(
        "users",
        vec![json!({"name": "Eve"}).as_object().unwrap().clone()],
    );
    let compiler = QueryCompiler::new(&store);

    let missing_dept = users_query().filter(WhereNode::all([Constraint::on(
        &dept_field(),
        Lookup::IsNull,
        json!(true),
    )]));
    assert_eq!(collect_rows(&compiler, &missing_dept).len(), 1);

    let has_dept = users_query().filter(WhereNode::all([Constraint::on(
        &dept_field(),
        Lookup::IsNull,
        json!(false),
    )]));
    assert_eq!(collect_rows(&compiler, &has_dept).len(), 4);
}

#[test]
fn test_pagination_window() {
    let store = create_numbers_store(20);
    let compiler = QueryCompiler::new(&store);

    let query = numbers_query().slice(Some(5), Some(15));
    let rows = collect_rows(&compiler, &query);
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0], vec![json!(5)]);
    assert_eq!(rows[9], vec![json!(14)]);
}

#[test]
fn test_pagination_edges() {
    let store = create_numbers_store(20);
    let compiler = QueryCompiler::new(&store);

    assert_eq!(collect_rows(&compiler, &numbers_query()).len(), 20);
    assert_eq!(
        collect_rows(&compiler, &numbers_query().slice(None, Some(3))),
        vec![vec![json!(0)], vec![json!(1)], vec![json!(2)]]
    );
    assert_eq!(
        first_column(&collect_rows(
            &compiler,
            &numbers_query().slice(Some(17), None)
        )),
        vec![json!(17), json!(18), json!(19)]
    );
    assert!(collect_rows(&compiler, &numbers_query().slice(Some(5), Some(5))).is_empty());
    assert!(collect_rows(&compiler, &numbers_query().slice(Some(30), None)).is_empty());
}

#[test]
fn test_or_query_fails_without_results() {
    let (store, _) = create_seeded_store();
    let compiler = QueryCompiler::new(&store);

    let query = users_query().filter(WhereNode::Or(vec![
        WhereNode::Leaf(Constraint::on(&name_field(), Lookup::Exact, json!("Alice"))),
        WhereNode::Leaf(Constraint::on(&name_field(), Lookup::Exact, json!("Bob"))),
    ]));
    let err = compiler.results_iter(&query).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedQueryShape(_)));
    assert_eq!(store.open_cursors(), 0);
}

#[test]
fn test_multi_valued_constraint_fails() {
    let (store, _) = create_seeded_store();
    let compiler = QueryCompiler::new(&store);

    let query = users_query().filter(WhereNode::all([Constraint::on(
        &age_field(),
        Lookup::Gt,
        json!([20, 30]),
    )]));
    let err = compiler.results_iter(&query).unwrap_err();
    assert!(matches!(err, DbError::MalformedConstraint { .. }));
}

#[test]
fn test_early_stop_releases_cursor() {
    let store = create_numbers_store(100);
    let compiler = QueryCompiler::new(&store);
    let query = numbers_query();

    {
        let mut rows = compiler.results_iter(&query).unwrap();
        assert_eq!(store.open_cursors(), 1);
        let first: Row = rows.next().unwrap().unwrap();
        assert_eq!(first, vec![json!(0)]);
    }
    assert_eq!(store.open_cursors(), 0);

    let rows: Vec<Row> = compiler
        .results_iter(&query)
        .unwrap()
        .collect::<DbResult<_>>()
        .unwrap();
    assert_eq!(rows.len(), 100);
    assert_eq!(store.open_cursors(), 0);
}

#[test]
fn test_store_errors_pass_through() {
    let (store, _) = create_seeded_store();
    let compiler = QueryCompiler::new(&store);
    store.set_offline(true);

    let err = compiler.results_iter(&users_query()).unwrap_err();
    match err {
        DbError::Store(StoreError::Unavailable(msg)) => assert_eq!(msg, "connection refused"),
        other => panic!("unexpected error: {}", other),
    }

    let err = compiler.get_count(&users_query()).unwrap_err();
    assert!(matches!(err, DbError::Store(StoreError::Unavailable(_))));
}
