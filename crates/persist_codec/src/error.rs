//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised when a value falls outside a datatype's domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value has the wrong shape for the datatype.
    #[error("{datatype} cannot hold {value}")]
    TypeMismatch {
        /// Name of the datatype.
        datatype: &'static str,
        /// Rendering of the rejected value.
        value: String,
    },

    /// Text is longer than the datatype allows.
    #[error("value of {len} characters exceeds maximum length {max}")]
    TooLong {
        /// Length of the rejected value in characters.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// A numeric value is not representable.
    #[error("invalid number: {message}")]
    InvalidNumber {
        /// Description of the problem.
        message: String,
    },

    /// A timestamp is not parseable or out of range.
    #[error("invalid timestamp: {message}")]
    InvalidTimestamp {
        /// Description of the problem.
        message: String,
    },

    /// Datatype name is not known.
    #[error("unknown datatype: {name}")]
    UnknownDatatype {
        /// The name that was looked up.
        name: String,
    },

    /// Constructor arguments do not fit the datatype.
    #[error("invalid arguments for {datatype}: {message}")]
    InvalidArguments {
        /// Name of the datatype.
        datatype: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// Operator and operand do not fit together.
    #[error("operator {operator} cannot be applied here: {message}")]
    InvalidOperand {
        /// The operator symbol.
        operator: &'static str,
        /// Description of the problem.
        message: String,
    },
}

impl CodecError {
    /// Create a type mismatch error.
    pub fn type_mismatch(datatype: &'static str, value: impl Into<String>) -> Self {
        Self::TypeMismatch {
            datatype,
            value: value.into(),
        }
    }

    /// Create an invalid number error.
    pub fn invalid_number(message: impl Into<String>) -> Self {
        Self::InvalidNumber {
            message: message.into(),
        }
    }

    /// Create an invalid timestamp error.
    pub fn invalid_timestamp(message: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            message: message.into(),
        }
    }

    /// Create an unknown datatype error.
    pub fn unknown_datatype(name: impl Into<String>) -> Self {
        Self::UnknownDatatype { name: name.into() }
    }

    /// Create an invalid arguments error.
    pub fn invalid_arguments(datatype: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            datatype,
            message: message.into(),
        }
    }

    /// Create an invalid operand error.
    pub fn invalid_operand(operator: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator,
            message: message.into(),
        }
    }
}
