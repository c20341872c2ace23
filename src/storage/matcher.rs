//! Native filter evaluation.
//!
//! Evaluates a [`FilterDocument`] against a document the way a document
//! store does: every column condition must hold (implicit AND), a literal
//! condition is equality, and an object whose keys are all known operators
//! is an operator mapping.
//!
//! - get_field_value: dotted-path lookup
//! - values_equal: equality, exact for integers
//! - compare_values: total order used for sorting
//! - matches: filter evaluation

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use super::document::Document;
use super::store::FilterDocument;

const OPERATORS: &[&str] = &["$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin"];

/// Extract a nested field value from a document.
///
/// Returns `None` when any path segment is missing.
pub fn get_field_value<'a>(document: &'a Document, field_path: &str) -> Option<&'a Value> {
    let mut parts = field_path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

/// Compare two values for equality.
///
/// Integers compare exactly; a float on either side widens both to f64 so
/// `1` equals `1.0`.
#[inline]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Some(Ordering::Equal),
        _ => left == right,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (integer_value(a), integer_value(b)) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn integer_value(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Compare two values for ordering.
///
/// Null < Bool < Number < String < Array < Object
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    compare_same_kind(a, b).unwrap_or(Ordering::Equal)
}

/// Compare two values of the same kind; `None` when the kinds differ or
/// have no natural order
fn compare_same_kind(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Object(a), Value::Object(b)) => compare_wrapped(a, b),
        _ => None,
    }
}

/// Extended-JSON wrappers (`{"$date": ..}`, `{"$oid": ..}`) order by their
/// payload when both sides use the same wrapper
fn compare_wrapped(a: &Map<String, Value>, b: &Map<String, Value>) -> Option<Ordering> {
    if a.len() != 1 || b.len() != 1 {
        return None;
    }
    let (ka, va) = a.iter().next()?;
    let (kb, vb) = b.iter().next()?;
    if ka != kb || !ka.starts_with('$') {
        return None;
    }
    compare_same_kind(va, vb)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Whether a condition is an operator mapping rather than a literal
pub fn is_operator_mapping(condition: &Value) -> bool {
    match condition {
        Value::Object(obj) => !obj.is_empty() && obj.keys().all(|k| OPERATORS.contains(&k.as_str())),
        _ => false,
    }
}

/// Check whether a document satisfies every condition of a filter
pub fn matches(document: &Document, filter: &FilterDocument) -> bool {
    filter
        .iter()
        .all(|(column, condition)| matches_condition(get_field_value(document, column), condition))
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if is_operator_mapping(condition) => ops
            .iter()
            .all(|(op, operand)| matches_operator(actual, op, operand)),
        literal => matches_literal(actual, literal),
    }
}

/// Equality: a missing field equals null; an array field matches when any
/// element equals the literal
fn matches_literal(actual: Option<&Value>, literal: &Value) -> bool {
    match actual {
        None => literal.is_null(),
        Some(Value::Array(items)) if !literal.is_array() => {
            items.iter().any(|item| values_equal(item, literal))
        }
        Some(value) => values_equal(value, literal),
    }
}

fn matches_operator(actual: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$eq" => matches_literal(actual, operand),
        "$ne" => !matches_literal(actual, operand),
        "$in" => match operand {
            Value::Array(choices) => choices.iter().any(|c| matches_literal(actual, c)),
            _ => false,
        },
        "$nin" => match operand {
            Value::Array(choices) => !choices.iter().any(|c| matches_literal(actual, c)),
            _ => true,
        },
        _ => {
            // Range operators never match a missing field or a value of a
            // different kind.
            let Some(value) = actual else {
                return false;
            };
            let Some(ordering) = compare_same_kind(value, operand) else {
                return false;
            };
            match op {
                "$gt" => ordering == Ordering::Greater,
                "$gte" => ordering != Ordering::Less,
                "$lt" => ordering == Ordering::Less,
                "$lte" => ordering != Ordering::Greater,
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    fn filter(value: Value) -> FilterDocument {
        FilterDocument::from(value.as_object().unwrap().clone())
    }

    #[test]
    fn test_get_field_value() {
        let d = doc(json!({"name": "Alice", "address": {"city": "NYC"}}));
        assert_eq!(get_field_value(&d, "name"), Some(&json!("Alice")));
        assert_eq!(get_field_value(&d, "address.city"), Some(&json!("NYC")));
        assert_eq!(get_field_value(&d, "missing"), None);
        assert_eq!(get_field_value(&d, "address.zip"), None);
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!("a"), &json!("a")));
        assert!(!values_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let low = json!(9_007_199_254_740_992_i64);
        let high = json!(9_007_199_254_740_993_i64);
        assert!(!values_equal(&low, &high));
        assert_eq!(compare_values(&low, &high), Ordering::Less);
        assert_eq!(compare_values(&json!(-1), &json!(u64::MAX)), Ordering::Less);
        assert!(values_equal(&json!(u64::MAX), &json!(u64::MAX)));

        let d = doc(json!({"k": 9_007_199_254_740_992_i64}));
        assert!(!matches(&d, &filter(json!({"k": 9_007_199_254_740_993_i64}))));
        assert!(matches(&d, &filter(json!({"k": {"$lt": 9_007_199_254_740_993_i64}}))));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(5), &json!("5")), Ordering::Less);
        assert_eq!(
            compare_values(&json!({"$date": 10}), &json!({"$date": 20})),
            Ordering::Less
        );
    }

    #[test]
    fn test_equality_filter() {
        let d = doc(json!({"name": "Alice", "age": 30}));
        assert!(matches(&d, &filter(json!({"name": "Alice"}))));
        assert!(matches(&d, &filter(json!({"name": "Alice", "age": 30.0}))));
        assert!(!matches(&d, &filter(json!({"name": "Bob"}))));
        assert!(matches(&d, &filter(json!({}))));
    }

    #[test]
    fn test_missing_field_equals_null() {
        let d = doc(json!({"name": "Alice"}));
        assert!(matches(&d, &filter(json!({"email": null}))));
        assert!(!matches(&d, &filter(json!({"email": {"$ne": null}}))));
        assert!(matches(&d, &filter(json!({"name": {"$ne": null}}))));
    }

    #[test]
    fn test_range_operators() {
        let d = doc(json!({"age": 30}));
        assert!(matches(&d, &filter(json!({"age": {"$gt": 29}}))));
        assert!(!matches(&d, &filter(json!({"age": {"$gt": 30}}))));
        assert!(matches(&d, &filter(json!({"age": {"$gte": 30}}))));
        assert!(matches(&d, &filter(json!({"age": {"$lt": 31}}))));
        assert!(matches(&d, &filter(json!({"age": {"$lte": 30}}))));
        assert!(matches(&d, &filter(json!({"age": {"$gte": 18, "$lte": 65}}))));
        assert!(!matches(&d, &filter(json!({"age": {"$gt": "20"}}))));
        assert!(!matches(&d, &filter(json!({"height": {"$gt": 1}}))));
    }

    #[test]
    fn test_in_operator() {
        let d = doc(json!({"dept": "eng"}));
        assert!(matches(&d, &filter(json!({"dept": {"$in": ["eng", "ops"]}}))));
        assert!(!matches(&d, &filter(json!({"dept": {"$in": ["sales"]}}))));
        assert!(!matches(&d, &filter(json!({"dept": {"$in": []}}))));
        assert!(matches(&d, &filter(json!({"dept": {"$nin": ["sales"]}}))));
    }

    #[test]
    fn test_wrapped_literal_is_not_an_operator() {
        let d = doc(json!({"id": {"$oid": "abc"}}));
        assert!(!is_operator_mapping(&json!({"$oid": "abc"})));
        assert!(matches(&d, &filter(json!({"id": {"$oid": "abc"}}))));
        assert!(!matches(&d, &filter(json!({"id": {"$oid": "def"}}))));
    }

    #[test]
    fn test_array_field_contains() {
        let d = doc(json!({"tags": ["rust", "db"]}));
        assert!(matches(&d, &filter(json!({"tags": "rust"}))));
        assert!(matches(&d, &filter(json!({"tags": ["rust", "db"]}))));
        assert!(!matches(&d, &filter(json!({"tags": "go"}))));
    }
}
