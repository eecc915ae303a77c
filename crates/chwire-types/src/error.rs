use thiserror::Error;

use crate::grammar::ParseError;

/// Failure to turn a signature (or a native type) into a descriptor.
///
/// Syntax problems are reported as [`TypeError::Parse`]; everything else means the signature was
/// well formed but refers to something the registry cannot build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unknown type {name:?}")]
    UnknownType { name: String },

    #[error("invalid arguments for {type_name}: {message}")]
    InvalidArgument {
        type_name: &'static str,
        message: String,
    },

    #[error("decimal precision {precision} is out of range (expected 1..=38)")]
    DecimalPrecisionOutOfRange { precision: u32 },

    #[error("tuple expects {expected} values, got {actual}")]
    TupleArityMismatch { expected: usize, actual: usize },

    #[error("enum name {0:?} not found")]
    EnumNameNotFound(String),

    #[error("enum code {0} not found")]
    EnumCodeNotFound(i16),

    #[error("no ClickHouse type for native type {0}")]
    UnsupportedNativeType(String),
}

impl TypeError {
    pub(crate) fn invalid(type_name: &'static str, message: impl Into<String>) -> Self {
        TypeError::InvalidArgument {
            type_name,
            message: message.into(),
        }
    }
}
