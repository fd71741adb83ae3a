//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred on the data medium.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The lock token file could not be created, opened or locked.
    #[error("cannot lock {path}: {source}")]
    Lock {
        /// Path of the lock token file.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// The DBM medium reported an error.
    #[error("DBM error: {0}")]
    Dbm(#[from] rusqlite::Error),

    /// The stored data does not match the bound layout.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// A field value cannot be represented in the store's format.
    #[error("field {column} cannot be stored: {reason}")]
    InvalidField {
        /// Zero-based column in the row.
        column: usize,
        /// Why the value was rejected.
        reason: String,
    },

    /// A row does not have as many fields as the layout.
    #[error("row has {actual} fields, layout expects {expected}")]
    WidthMismatch {
        /// Width of the layout.
        expected: usize,
        /// Width of the offending row.
        actual: usize,
    },

    /// No layout has been bound to the store.
    #[error("no record layout bound to the store")]
    Unbound,

    /// The store is closed.
    #[error("storage is closed")]
    Closed,
}
