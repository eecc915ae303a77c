use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tag identifying every wire type the codec understands.
///
/// The declaration order is the diagnostic order used by
/// [`registered_types`](crate::registered_types).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    Nothing,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    Float32,
    Float64,
    Decimal,
    Decimal32,
    Decimal64,
    Decimal128,
    Date,
    Date32,
    DateTime,
    DateTime64,
    Enum8,
    Enum16,
    String,
    FixedString,
    #[serde(rename = "UUID")]
    Uuid,
    #[serde(rename = "IPv4")]
    IPv4,
    #[serde(rename = "IPv6")]
    IPv6,
    Array,
    Nested,
    Tuple,
    Nullable,
    LowCardinality,
    Map,
    SimpleAggregateFunction,
}

impl TypeCode {
    pub const ALL: [TypeCode; 36] = [
        TypeCode::Nothing,
        TypeCode::Bool,
        TypeCode::Int8,
        TypeCode::Int16,
        TypeCode::Int32,
        TypeCode::Int64,
        TypeCode::Int128,
        TypeCode::UInt8,
        TypeCode::UInt16,
        TypeCode::UInt32,
        TypeCode::UInt64,
        TypeCode::UInt128,
        TypeCode::Float32,
        TypeCode::Float64,
        TypeCode::Decimal,
        TypeCode::Decimal32,
        TypeCode::Decimal64,
        TypeCode::Decimal128,
        TypeCode::Date,
        TypeCode::Date32,
        TypeCode::DateTime,
        TypeCode::DateTime64,
        TypeCode::Enum8,
        TypeCode::Enum16,
        TypeCode::String,
        TypeCode::FixedString,
        TypeCode::Uuid,
        TypeCode::IPv4,
        TypeCode::IPv6,
        TypeCode::Array,
        TypeCode::Nested,
        TypeCode::Tuple,
        TypeCode::Nullable,
        TypeCode::LowCardinality,
        TypeCode::Map,
        TypeCode::SimpleAggregateFunction,
    ];

    /// Canonical ClickHouse spelling.
    pub const fn name(self) -> &'static str {
        match self {
            TypeCode::Nothing => "Nothing",
            TypeCode::Bool => "Bool",
            TypeCode::Int8 => "Int8",
            TypeCode::Int16 => "Int16",
            TypeCode::Int32 => "Int32",
            TypeCode::Int64 => "Int64",
            TypeCode::Int128 => "Int128",
            TypeCode::UInt8 => "UInt8",
            TypeCode::UInt16 => "UInt16",
            TypeCode::UInt32 => "UInt32",
            TypeCode::UInt64 => "UInt64",
            TypeCode::UInt128 => "UInt128",
            TypeCode::Float32 => "Float32",
            TypeCode::Float64 => "Float64",
            TypeCode::Decimal => "Decimal",
            TypeCode::Decimal32 => "Decimal32",
            TypeCode::Decimal64 => "Decimal64",
            TypeCode::Decimal128 => "Decimal128",
            TypeCode::Date => "Date",
            TypeCode::Date32 => "Date32",
            TypeCode::DateTime => "DateTime",
            TypeCode::DateTime64 => "DateTime64",
            TypeCode::Enum8 => "Enum8",
            TypeCode::Enum16 => "Enum16",
            TypeCode::String => "String",
            TypeCode::FixedString => "FixedString",
            TypeCode::Uuid => "UUID",
            TypeCode::IPv4 => "IPv4",
            TypeCode::IPv6 => "IPv6",
            TypeCode::Array => "Array",
            TypeCode::Nested => "Nested",
            TypeCode::Tuple => "Tuple",
            TypeCode::Nullable => "Nullable",
            TypeCode::LowCardinality => "LowCardinality",
            TypeCode::Map => "Map",
            TypeCode::SimpleAggregateFunction => "SimpleAggregateFunction",
        }
    }

    /// Codes whose signature never takes arguments.
    ///
    /// `DateTime` is listed because the bare name is valid; `DateTime('zone')` goes through the
    /// parameterized table instead.
    pub const fn is_simple(self) -> bool {
        matches!(
            self,
            TypeCode::Nothing
                | TypeCode::Bool
                | TypeCode::Int8
                | TypeCode::Int16
                | TypeCode::Int32
                | TypeCode::Int64
                | TypeCode::Int128
                | TypeCode::UInt8
                | TypeCode::UInt16
                | TypeCode::UInt32
                | TypeCode::UInt64
                | TypeCode::UInt128
                | TypeCode::Float32
                | TypeCode::Float64
                | TypeCode::Date
                | TypeCode::Date32
                | TypeCode::DateTime
                | TypeCode::String
                | TypeCode::Uuid
                | TypeCode::IPv4
                | TypeCode::IPv6
        )
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name is not a known [`TypeCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type code {0:?}")]
pub struct UnknownTypeCode(pub String);

impl FromStr for TypeCode {
    type Err = UnknownTypeCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeCode::ALL
            .iter()
            .copied()
            .find(|code| code.name() == s)
            .ok_or_else(|| UnknownTypeCode(s.to_string()))
    }
}
