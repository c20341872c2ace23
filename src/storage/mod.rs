pub mod cursor;
pub mod document;
pub mod matcher;
pub mod memory;
pub mod store;

pub use cursor::Cursor;
pub use document::{Document, ObjectId};
pub use memory::InMemoryStore;
pub use store::{CollectionHandle, DocumentStore, FilterDocument, FindOptions, SortDirection};
