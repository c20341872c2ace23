pub mod compiler;
pub mod config;
pub mod error;
pub mod query;
pub mod storage;

pub use compiler::{CompiledQuery, QueryCompiler, QueryOutput, Row, RowIter, StorageType};
pub use config::{CompilerConfig, ConflictPolicy};
pub use error::{DbError, DbResult, StoreError, StoreResult};
pub use query::{
    Aggregate, AggregateKind, Constraint, DeleteDescriptor, FieldDef, InsertDescriptor, Lookup,
    LookupValue, OrderBy, QueryDescriptor, ResultType, UpdateDescriptor, WhereNode,
};
pub use storage::{
    CollectionHandle, Cursor, Document, DocumentStore, FilterDocument, FindOptions,
    InMemoryStore, ObjectId, SortDirection,
};
