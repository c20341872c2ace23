//! Query compiler.
//!
//! Turns relational-style descriptors into native document-store commands,
//! runs them through a [`DocumentStore`](crate::storage::DocumentStore) and
//! maps documents back into rows.
//!
//! - [`coercion`]: storage type conversions
//! - [`predicate`]: filter trees to native filter documents
//! - [`executor`]: find/count with pagination, sort and projection
//! - [`decoder`]: lazy row decoding
//! - [`aggregate`]: the lone COUNT aggregate
//! - [`mutation`]: insert, update and delete

pub mod aggregate;
pub mod coercion;
pub mod decoder;
pub mod executor;
pub mod mutation;
pub mod predicate;

pub use aggregate::QueryOutput;
pub use coercion::{from_storage, to_storage, StorageType};
pub use decoder::{Row, RowIter};
pub use executor::{CompiledQuery, QueryCompiler};
pub use predicate::compile_where;
