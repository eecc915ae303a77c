use chwire_types::{CoerceError, TypeError};
use thiserror::Error;

/// Failure while encoding or decoding RowBinary data.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The input ended in the middle of a value.
    #[error("truncated data while reading {context}")]
    Truncated { context: &'static str },

    /// A length prefix exceeded the configured limit (see [`BinaryOptions`](crate::BinaryOptions)).
    #[error("{kind} length {len} exceeds the limit of {max}")]
    LengthLimit {
        kind: &'static str,
        len: u64,
        max: usize,
    },

    /// A LEB128 length prefix ran past 64 bits.
    #[error("malformed varint")]
    MalformedVarint,

    /// Bytes that decode to no valid value of the column type (a `Bool` byte of 2, a date
    /// outside the representable range, ...).
    #[error("invalid {target} value: {message}")]
    InvalidValue { target: String, message: String },

    /// The writer was handed a value whose shape does not match the descriptor.
    #[error("cannot write {actual} value as {expected}")]
    TypeMismatch {
        expected: String,
        actual: &'static str,
    },

    #[error("{count} unread bytes after the last value")]
    TrailingBytes { count: usize },

    #[error(transparent)]
    Coerce(#[from] CoerceError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl CodecError {
    pub(crate) fn invalid(target: impl ToString, message: impl Into<String>) -> Self {
        CodecError::InvalidValue {
            target: target.to_string(),
            message: message.into(),
        }
    }
}
