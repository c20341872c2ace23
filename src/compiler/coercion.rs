//! Type coercion between declared storage types and native store values.
//!
//! Converter lookup is two-tiered: the store-specific table (`objectid`,
//! `datetime`) is consulted first, then the primitive cast table (`text`,
//! `integer`, `float`, `boolean`). Any other storage type passes values
//! through unchanged in both directions. Arrays are converted element by
//! element and `null` is never converted.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{DbError, DbResult};
use crate::storage::document::{date_from_value, date_to_value};
use crate::storage::ObjectId;

/// Declared storage type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageType {
    ObjectId,
    DateTime,
    Text,
    Integer,
    Float,
    Boolean,
    /// Any type this layer does not model; values pass through unchanged
    Other(String),
}

impl StorageType {
    pub fn tag(&self) -> &str {
        match self {
            StorageType::ObjectId => "objectid",
            StorageType::DateTime => "datetime",
            StorageType::Text => "text",
            StorageType::Integer => "integer",
            StorageType::Float => "float",
            StorageType::Boolean => "boolean",
            StorageType::Other(tag) => tag,
        }
    }
}

impl From<&str> for StorageType {
    fn from(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "objectid" => StorageType::ObjectId,
            "datetime" | "timestamp" => StorageType::DateTime,
            "text" | "varchar" | "string" | "unicode" => StorageType::Text,
            "integer" | "int" | "bigint" | "smallint" => StorageType::Integer,
            "float" | "double" | "real" => StorageType::Float,
            "boolean" | "bool" => StorageType::Boolean,
            _ => StorageType::Other(tag.to_string()),
        }
    }
}

impl From<String> for StorageType {
    fn from(tag: String) -> Self {
        StorageType::from(tag.as_str())
    }
}

impl From<StorageType> for String {
    fn from(storage_type: StorageType) -> Self {
        storage_type.tag().to_string()
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToStorage,
    FromStorage,
}

type Converter = fn(&Value) -> DbResult<Value>;

/// Convert a caller value into the store's native representation
pub fn to_storage(storage_type: &StorageType, value: &Value) -> DbResult<Value> {
    convert(storage_type, value, Direction::ToStorage)
}

/// Convert a native value back into the caller's representation
pub fn from_storage(storage_type: &StorageType, value: &Value) -> DbResult<Value> {
    convert(storage_type, value, Direction::FromStorage)
}

fn convert(storage_type: &StorageType, value: &Value, direction: Direction) -> DbResult<Value> {
    let converter = store_converter(storage_type, direction)
        .or_else(|| primitive_converter(storage_type))
        .unwrap_or(identity);

    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| apply(converter, item))
            .collect::<DbResult<Vec<_>>>()
            .map(Value::Array),
        other => apply(converter, other),
    }
}

fn apply(converter: Converter, value: &Value) -> DbResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    converter(value)
}

fn store_converter(storage_type: &StorageType, direction: Direction) -> Option<Converter> {
    match (storage_type, direction) {
        (StorageType::ObjectId, Direction::ToStorage) => Some(object_id_to_storage),
        (StorageType::ObjectId, Direction::FromStorage) => Some(object_id_from_storage),
        (StorageType::DateTime, Direction::ToStorage) => Some(datetime_to_storage),
        (StorageType::DateTime, Direction::FromStorage) => Some(datetime_from_storage),
        _ => None,
    }
}

fn primitive_converter(storage_type: &StorageType) -> Option<Converter> {
    match storage_type {
        StorageType::Text => Some(cast_text),
        StorageType::Integer => Some(cast_integer),
        StorageType::Float => Some(cast_float),
        StorageType::Boolean => Some(cast_boolean),
        _ => None,
    }
}

fn identity(value: &Value) -> DbResult<Value> {
    Ok(value.clone())
}

fn object_id_to_storage(value: &Value) -> DbResult<Value> {
    if ObjectId::from_value(value).is_some() {
        return Ok(value.clone());
    }
    let text = value
        .as_str()
        .ok_or_else(|| DbError::coercion(StorageType::ObjectId, format!("{} is not an id string", value)))?;
    let id: ObjectId = text
        .parse()
        .map_err(|e| DbError::coercion(StorageType::ObjectId, format!("'{}': {}", text, e)))?;
    Ok(id.to_value())
}

fn object_id_from_storage(value: &Value) -> DbResult<Value> {
    Ok(match ObjectId::from_value(value) {
        Some(id) => Value::String(id.to_hex()),
        None => value.clone(),
    })
}

fn datetime_to_storage(value: &Value) -> DbResult<Value> {
    if date_from_value(value).is_some() {
        return Ok(value.clone());
    }
    match value {
        Value::String(text) => {
            let dt = DateTime::parse_from_rfc3339(text)
                .map_err(|e| DbError::coercion(StorageType::DateTime, format!("'{}': {}", text, e)))?;
            Ok(date_to_value(&dt.with_timezone(&Utc)))
        }
        Value::Number(n) => match n.as_i64() {
            Some(millis) => Ok(serde_json::json!({ "$date": millis })),
            None => Err(DbError::coercion(
                StorageType::DateTime,
                format!("{} is not an epoch millisecond value", n),
            )),
        },
        other => Err(DbError::coercion(
            StorageType::DateTime,
            format!("{} is not a timestamp", other),
        )),
    }
}

fn datetime_from_storage(value: &Value) -> DbResult<Value> {
    Ok(match date_from_value(value) {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => value.clone(),
    })
}

fn cast_text(value: &Value) -> DbResult<Value> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Object(_) if ObjectId::from_value(value).is_some() => object_id_from_storage(value),
        other => Err(DbError::coercion(
            StorageType::Text,
            format!("{} has no text form", other),
        )),
    }
}

fn cast_integer(value: &Value) -> DbResult<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.trunc() >= i64::MIN as f64 && f.trunc() <= i64::MAX as f64 => {
                Ok(Value::from(f.trunc() as i64))
            }
            _ => Err(DbError::coercion(
                StorageType::Integer,
                format!("{} is out of range", n),
            )),
        },
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| DbError::coercion(StorageType::Integer, format!("'{}' is not an integer", text))),
        Value::Bool(b) => Ok(Value::from(*b as i64)),
        other => Err(DbError::coercion(
            StorageType::Integer,
            format!("{} is not a number", other),
        )),
    }
}

fn cast_float(value: &Value) -> DbResult<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    f.and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| DbError::coercion(StorageType::Float, format!("{} is not a finite number", value)))
}

/// Truthiness cast: zero, empty strings and empty containers are false
fn cast_boolean(value: &Value) -> DbResult<Value> {
    let b = match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    };
    Ok(Value::Bool(b))
}
