//! Error types for persist core.

use persist_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in record engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or duplicate attribute definition.
    #[error("schema error: {message}")]
    Schema {
        /// Description of the problem.
        message: String,
    },

    /// Engine used without a valid schema and store binding.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Value outside an attribute's datatype domain.
    #[error("datatype error: {0}")]
    Datatype(#[from] persist_codec::CodecError),

    /// Insert into an existing primary key.
    #[error("duplicate key: {key:?}")]
    DuplicateKey {
        /// The identity tuple that already exists.
        key: Vec<String>,
    },

    /// A record required to exist does not.
    #[error("record not found: {key:?}")]
    NotFound {
        /// The identity tuple that was looked up.
        key: Vec<String>,
    },

    /// The lock token file could not be created, opened or locked.
    #[error("lock error on {path}: {source}")]
    Lock {
        /// Path of the token file.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// Malformed predicate or unknown attribute in a query.
    #[error("query error: {message}")]
    Query {
        /// Description of the problem.
        message: String,
    },

    /// I/O error on the store medium.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other store failure.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Lock { path, source } => Self::Lock { path, source },
            StorageError::Io(e) => Self::Io(e),
            other => Self::Storage(other),
        }
    }
}

impl CoreError {
    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
