//! Forward-only store cursor.
//!
//! A `Cursor` owns one server-side slot. The slot is released exactly once,
//! either when the cursor is exhausted or when it is dropped early.

use std::fmt;

use super::document::Document;
use crate::error::StoreResult;

type DocumentStream = Box<dyn Iterator<Item = StoreResult<Document>> + Send>;
type ReleaseHook = Box<dyn FnOnce() + Send>;

pub struct Cursor {
    documents: DocumentStream,
    release: Option<ReleaseHook>,
}

impl Cursor {
    /// Wrap a document stream. `release` runs once the stream is exhausted
    /// or the cursor is dropped, whichever comes first.
    pub fn new<I, F>(documents: I, release: F) -> Self
    where
        I: Iterator<Item = StoreResult<Document>> + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        Self {
            documents: Box::new(documents),
            release: Some(Box::new(release)),
        }
    }

    /// A cursor with nothing to release
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Box::new(documents.into_iter().map(Ok)),
            release: None,
        }
    }

    /// Whether the server-side slot is still held
    pub fn is_open(&self) -> bool {
        self.release.is_some()
    }

    fn release(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl Iterator for Cursor {
    type Item = StoreResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.documents.next() {
            Some(item) => Some(item),
            None => {
                self.release();
                None
            }
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("open", &self.is_open())
            .finish()
    }
}
