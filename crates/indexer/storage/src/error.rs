use thiserror::Error;

/// Errors that may occur while interacting with the index storage.
///
/// This enum is used across all implementations of the storage traits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// A writer panicked while holding the storage lock.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// A write would break a uniqueness constraint of the index.
    #[error("conflict error: {0}")]
    ConflictError(String),

    /// The database backend failed.
    #[error("database error: {0}")]
    Database(String),

    /// The opened database lacks one of the index tables.
    #[error("column family not found: {0}")]
    ColumnFamilyNotFound(&'static str),

    /// A stored entry could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
