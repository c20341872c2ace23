//! Query and mutation descriptors.
//!
//! These are produced by the query-building layer and consumed once by the
//! compiler. The compiler never mutates them.

pub mod descriptor;

pub use descriptor::{
    Aggregate, AggregateKind, Constraint, DeleteDescriptor, FieldDef, InsertDescriptor, Lookup,
    LookupValue, OrderBy, QueryDescriptor, ResultType, UpdateDescriptor, WhereNode,
};
