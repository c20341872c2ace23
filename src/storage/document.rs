use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A native document as held by the store
pub type Document = Map<String, Value>;

/// Key of the extended-JSON wrapper used for native identifiers
pub const OID_KEY: &str = "$oid";

/// Key of the extended-JSON wrapper used for native datetimes
pub const DATE_KEY: &str = "$date";

/// Opaque document identifier.
///
/// Backed by a UUIDv7 so identifiers generated in one process sort by
/// creation time. Rendered as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
    }

    /// Hex form, as stored inside `{"$oid": ...}`
    pub fn to_hex(&self) -> String {
        self.0.simple().to_string()
    }

    /// Native representation
    pub fn to_value(&self) -> Value {
        let mut wrapper = Map::new();
        wrapper.insert(OID_KEY.to_string(), Value::String(self.to_hex()));
        Value::Object(wrapper)
    }

    /// Read an identifier back out of its native representation
    pub fn from_value(value: &Value) -> Option<Self> {
        single_key(value, OID_KEY)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Native representation of a UTC timestamp
pub fn date_to_value(dt: &DateTime<Utc>) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(DATE_KEY.to_string(), Value::from(dt.timestamp_millis()));
    Value::Object(wrapper)
}

/// Read a UTC timestamp back out of its native representation
pub fn date_from_value(value: &Value) -> Option<DateTime<Utc>> {
    single_key(value, DATE_KEY)
        .and_then(|v| v.as_i64())
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}

fn single_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(obj) if obj.len() == 1 => obj.get(key),
        _ => None,
    }
}
