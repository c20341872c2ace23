use thiserror::Error;

/// Errors raised by a document store client.
///
/// The compiler never inspects these; they travel to the caller unchanged
/// inside [`DbError::Store`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Internal store error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Unsupported query shape: {0}")]
    UnsupportedQueryShape(String),

    #[error("Malformed constraint on '{column}': {reason}")]
    MalformedConstraint { column: String, reason: String },

    #[error("Cannot convert value to {storage_type}: {reason}")]
    Coercion { storage_type: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub(crate) fn malformed(column: &str, reason: impl Into<String>) -> Self {
        DbError::MalformedConstraint {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn coercion(storage_type: impl ToString, reason: impl Into<String>) -> Self {
        DbError::Coercion {
            storage_type: storage_type.to_string(),
            reason: reason.into(),
        }
    }
}

impl serde::Serialize for DbError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
