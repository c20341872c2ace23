use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compiler::coercion::StorageType;

/// Schema contract for one model field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Attribute name on the model
    pub name: String,
    /// Key the value is stored under in the document
    pub column: String,
    pub storage_type: StorageType,
    /// Substituted when a document has no value for `column`
    #[serde(default)]
    pub default: Value,
}

impl FieldDef {
    pub fn new(name: &str, storage_type: impl Into<StorageType>) -> Self {
        Self {
            name: name.to_string(),
            column: name.to_string(),
            storage_type: storage_type.into(),
            default: Value::Null,
        }
    }

    pub fn with_column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    Exact,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Range,
    IsNull,
}

impl Lookup {
    /// Lookups whose value is a collection by contract
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Lookup::In | Lookup::Range)
    }

    pub fn name(self) -> &'static str {
        match self {
            Lookup::Exact => "exact",
            Lookup::Gt => "gt",
            Lookup::Gte => "gte",
            Lookup::Lt => "lt",
            Lookup::Lte => "lte",
            Lookup::In => "in",
            Lookup::Range => "range",
            Lookup::IsNull => "isnull",
        }
    }
}

/// Raw constraint value as prepared by the query builder.
///
/// Builders usually wrap scalars in a one-element list; a JSON array
/// deserializes as `Many`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupValue {
    Many(Vec<Value>),
    Single(Value),
}

impl From<Value> for LookupValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => LookupValue::Many(items),
            other => LookupValue::Single(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Table alias; without joins this is always the collection itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub column: String,
    pub lookup: Lookup,
    pub storage_type: StorageType,
    pub value: LookupValue,
}

impl Constraint {
    pub fn new(
        column: &str,
        lookup: Lookup,
        storage_type: impl Into<StorageType>,
        value: impl Into<LookupValue>,
    ) -> Self {
        Self {
            alias: None,
            column: column.to_string(),
            lookup,
            storage_type: storage_type.into(),
            value: value.into(),
        }
    }

    /// Constraint against a declared field
    pub fn on(field: &FieldDef, lookup: Lookup, value: impl Into<LookupValue>) -> Self {
        Self::new(&field.column, lookup, field.storage_type.clone(), value)
    }
}

/// Boolean filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhereNode {
    Leaf(Constraint),
    And(Vec<WhereNode>),
    Or(Vec<WhereNode>),
}

impl Default for WhereNode {
    fn default() -> Self {
        WhereNode::And(Vec::new())
    }
}

impl WhereNode {
    /// Flat conjunction of constraints
    pub fn all(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        WhereNode::And(constraints.into_iter().map(WhereNode::Leaf).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub alias: String,
    pub kind: AggregateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl Aggregate {
    pub fn count(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            kind: AggregateKind::Count,
            column: None,
        }
    }
}

/// Shape the caller expects from an aggregate query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// One row
    Single,
    /// A list of rows
    Multi,
}

/// Description of a read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub collection: String,
    #[serde(default)]
    pub where_clause: WhereNode,
    /// Output fields, in row order
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    /// Offset of the first row
    #[serde(default)]
    pub low_mark: Option<u64>,
    /// Exclusive upper bound; `None` means no limit
    #[serde(default)]
    pub high_mark: Option<u64>,
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
}

impl QueryDescriptor {
    pub fn new(collection: &str, fields: Vec<FieldDef>) -> Self {
        Self {
            collection: collection.to_string(),
            where_clause: WhereNode::default(),
            fields,
            order_by: Vec::new(),
            low_mark: None,
            high_mark: None,
            aggregates: Vec::new(),
        }
    }

    pub fn filter(mut self, where_clause: WhereNode) -> Self {
        self.where_clause = where_clause;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Restrict to rows `low..high`, mirroring slice notation
    pub fn slice(mut self, low: Option<u64>, high: Option<u64>) -> Self {
        self.low_mark = low;
        self.high_mark = high;
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }
}

/// Description of a single-row insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertDescriptor {
    pub collection: String,
    /// Values paired with the field whose column they are written to
    pub values: Vec<(FieldDef, Value)>,
}

/// Description of a field-level update of every matching document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDescriptor {
    pub collection: String,
    #[serde(default)]
    pub where_clause: WhereNode,
    pub values: Vec<(FieldDef, Value)>,
}

/// Description of a bulk delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteDescriptor {
    pub collection: String,
    #[serde(default)]
    pub where_clause: WhereNode,
}
