//! Predicate compiler: flat conjunctive filter trees to native filter
//! documents.

use serde_json::{json, Map, Value};

use super::coercion::to_storage;
use crate::config::ConflictPolicy;
use crate::error::{DbError, DbResult};
use crate::query::{Constraint, Lookup, LookupValue, WhereNode};
use crate::storage::matcher::is_operator_mapping;
use crate::storage::FilterDocument;

/// Constraint value after arity normalization
#[derive(Debug, Clone, PartialEq)]
enum Normalized {
    Scalar(Value),
    List(Vec<Value>),
    Flag(bool),
}

/// Compile a filter tree into a native filter document.
///
/// Only a single level of conjunction is accepted. Nothing is returned
/// unless every constraint compiles.
pub fn compile_where(where_clause: &WhereNode, policy: ConflictPolicy) -> DbResult<FilterDocument> {
    let mut filter = FilterDocument::new();
    for constraint in flatten(where_clause)? {
        let fragment = compile_constraint(constraint)?;
        add_fragment(&mut filter, &constraint.column, fragment, policy)?;
    }
    Ok(filter)
}

fn flatten(where_clause: &WhereNode) -> DbResult<Vec<&Constraint>> {
    match where_clause {
        WhereNode::Leaf(constraint) => Ok(vec![constraint]),
        WhereNode::Or(_) => Err(disjunction()),
        WhereNode::And(children) => children
            .iter()
            .map(|child| match child {
                WhereNode::Leaf(constraint) => Ok(constraint),
                WhereNode::Or(_) => Err(disjunction()),
                WhereNode::And(_) => Err(DbError::UnsupportedQueryShape(
                    "nested filter groups are not supported".to_string(),
                )),
            })
            .collect(),
    }
}

fn disjunction() -> DbError {
    DbError::UnsupportedQueryShape("OR filters are not supported".to_string())
}

/// Compile one constraint into the fragment stored under its column
pub fn compile_constraint(constraint: &Constraint) -> DbResult<Value> {
    let ty = &constraint.storage_type;
    match (constraint.lookup, normalize(constraint)?) {
        (Lookup::IsNull, Normalized::Flag(true)) => Ok(Value::Null),
        (Lookup::IsNull, Normalized::Flag(false)) => Ok(json!({ "$ne": null })),
        (Lookup::Range, Normalized::List(bounds)) => {
            let bounds = match to_storage(ty, &Value::Array(bounds))? {
                Value::Array(bounds) => bounds,
                other => vec![other],
            };
            match bounds.as_slice() {
                [low, high] => Ok(json!({ "$gte": low, "$lte": high })),
                _ => Err(DbError::malformed(
                    &constraint.column,
                    "range needs exactly two bounds",
                )),
            }
        }
        (Lookup::In, Normalized::List(choices)) => {
            Ok(json!({ "$in": to_storage(ty, &Value::Array(choices))? }))
        }
        (lookup, Normalized::Scalar(value)) => {
            let value = to_storage(ty, &value)?;
            Ok(match lookup {
                Lookup::Gt => json!({ "$gt": value }),
                Lookup::Gte => json!({ "$gte": value }),
                Lookup::Lt => json!({ "$lt": value }),
                Lookup::Lte => json!({ "$lte": value }),
                _ => value,
            })
        }
        (lookup, normalized) => Err(DbError::malformed(
            &constraint.column,
            format!("'{}' cannot take {:?}", lookup.name(), normalized),
        )),
    }
}

fn normalize(constraint: &Constraint) -> DbResult<Normalized> {
    let column = &constraint.column;
    if constraint.lookup.is_multi_valued() {
        let values = as_list(&constraint.value);
        if constraint.lookup == Lookup::Range && values.len() != 2 {
            return Err(DbError::malformed(
                column,
                format!("range needs exactly two bounds, got {}", values.len()),
            ));
        }
        return Ok(Normalized::List(values));
    }
    match constraint.lookup {
        Lookup::IsNull => match single_value(column, &constraint.value)? {
            Value::Bool(flag) => Ok(Normalized::Flag(flag)),
            other => Err(DbError::malformed(
                column,
                format!("isnull expects a boolean, got {}", other),
            )),
        },
        _ => single_value(column, &constraint.value).map(Normalized::Scalar),
    }
}

fn as_list(value: &LookupValue) -> Vec<Value> {
    match value {
        LookupValue::Many(items) => items.clone(),
        LookupValue::Single(Value::Array(items)) => items.clone(),
        LookupValue::Single(other) => vec![other.clone()],
    }
}

/// Unwrap the builder's one-element list. More than one value means the
/// builder broke its contract.
fn single_value(column: &str, value: &LookupValue) -> DbResult<Value> {
    match value {
        LookupValue::Single(value) => Ok(value.clone()),
        LookupValue::Many(items) if items.len() == 1 => Ok(items[0].clone()),
        LookupValue::Many(items) => Err(DbError::malformed(
            column,
            format!("expected a single value, got {}", items.len()),
        )),
    }
}

fn add_fragment(
    filter: &mut FilterDocument,
    column: &str,
    fragment: Value,
    policy: ConflictPolicy,
) -> DbResult<()> {
    let merged = match (filter.get(column), policy) {
        (None, _) => fragment,
        (Some(previous), ConflictPolicy::Overwrite) => {
            tracing::warn!(
                "Constraint {} on '{}' replaces earlier constraint {}",
                fragment,
                column,
                previous
            );
            fragment
        }
        (Some(previous), ConflictPolicy::Merge) => merge_fragments(column, previous, &fragment)?,
    };
    filter.insert(column, merged);
    Ok(())
}

/// Intersect two fragments on one column as a single operator mapping.
fn merge_fragments(column: &str, previous: &Value, next: &Value) -> DbResult<Value> {
    let mut merged = operator_form(previous);
    for (op, operand) in operator_form(next) {
        match merged.get(&op) {
            Some(existing) if *existing != operand => {
                return Err(DbError::UnsupportedQueryShape(format!(
                    "conflicting '{}' constraints on '{}'",
                    op, column
                )));
            }
            Some(_) => {}
            None => {
                merged.insert(op, operand);
            }
        }
    }
    Ok(Value::Object(merged))
}

fn operator_form(fragment: &Value) -> Map<String, Value> {
    match fragment {
        Value::Object(ops) if is_operator_mapping(fragment) => ops.clone(),
        literal => {
            let mut ops = Map::new();
            ops.insert("$eq".to_string(), literal.clone());
            ops
        }
    }
}
