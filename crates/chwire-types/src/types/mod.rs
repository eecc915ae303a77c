//! Type descriptors.
//!
//! [`ClickHouseType`] is a closed sum type over every supported wire type. Parameterless types
//! are unit variants; parameterized ones carry an immutable descriptor struct that knows how to
//! parse itself from a [`SyntaxTreeNode`] and how to print its canonical signature.

mod composite;
mod datetime;
mod decimal;
mod enums;

use std::fmt;

use chrono_tz::Tz;

pub use self::composite::{
    ArrayType, FixedStringType, LowCardinalityType, MapType, NestedType, NullableType,
    SimpleAggregateFunctionType, TupleElement, TupleType,
};
pub use self::datetime::{DateTime64Type, DateTimeType, MAX_DATETIME64_SCALE};
pub use self::decimal::{DecimalType, DecimalWidth};
pub use self::enums::{EnumType, EnumWidth};

use crate::error::TypeError;
use crate::grammar::SyntaxTreeNode;
use crate::native::NativeType;
use crate::type_code::TypeCode;
use crate::value::Value;
use crate::visitor::{TypeReader, TypeWriter};
use crate::zone::{resolve_zone, ZoneDatabase};

/// Everything a parameterized descriptor needs while parsing itself.
pub struct ParseContext<'a> {
    resolver: &'a dyn Fn(&SyntaxTreeNode) -> Result<ClickHouseType, TypeError>,
    zones: &'a dyn ZoneDatabase,
}

impl<'a> ParseContext<'a> {
    pub fn new(
        resolver: &'a dyn Fn(&SyntaxTreeNode) -> Result<ClickHouseType, TypeError>,
        zones: &'a dyn ZoneDatabase,
    ) -> Self {
        Self { resolver, zones }
    }

    /// Resolve a nested signature node into a descriptor.
    pub fn resolve(&self, node: &SyntaxTreeNode) -> Result<ClickHouseType, TypeError> {
        (self.resolver)(node)
    }

    /// Look up a zone by name, falling back to UTC.
    pub fn zone(&self, name: &str) -> Tz {
        resolve_zone(self.zones, name)
    }
}

/// Builds a descriptor from a signature node; one per parameterized type name.
pub type ParseFn = fn(&SyntaxTreeNode, &ParseContext<'_>) -> Result<ClickHouseType, TypeError>;

/// Read a non-negative integer literal argument.
pub(crate) fn integer_arg(
    node: &SyntaxTreeNode,
    type_name: &'static str,
) -> Result<u32, TypeError> {
    if node.has_children() {
        return Err(TypeError::invalid(
            type_name,
            format!("expected an integer, got {node}"),
        ));
    }
    node.value.trim().parse::<u32>().map_err(|_| {
        TypeError::invalid(type_name, format!("expected an integer, got {}", node.value))
    })
}

/// A resolved wire type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickHouseType {
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
    String,
    Uuid,
    IPv4,
    IPv6,
    Date,
    Date32,
    Decimal(DecimalType),
    FixedString(FixedStringType),
    DateTime(DateTimeType),
    DateTime64(DateTime64Type),
    Enum8(EnumType),
    Enum16(EnumType),
    Array(ArrayType),
    Nullable(NullableType),
    LowCardinality(LowCardinalityType),
    Tuple(TupleType),
    Nested(NestedType),
    Map(MapType),
    SimpleAggregateFunction(SimpleAggregateFunctionType),
}

impl ClickHouseType {
    /// The descriptor for a parameterless code, or `None` for codes that need arguments.
    pub fn simple(code: TypeCode) -> Option<Self> {
        Some(match code {
            TypeCode::Nothing => ClickHouseType::Nothing,
            TypeCode::Bool => ClickHouseType::Bool,
            TypeCode::Int8 => ClickHouseType::Int8,
            TypeCode::Int16 => ClickHouseType::Int16,
            TypeCode::Int32 => ClickHouseType::Int32,
            TypeCode::Int64 => ClickHouseType::Int64,
            TypeCode::Int128 => ClickHouseType::Int128,
            TypeCode::UInt8 => ClickHouseType::UInt8,
            TypeCode::UInt16 => ClickHouseType::UInt16,
            TypeCode::UInt32 => ClickHouseType::UInt32,
            TypeCode::UInt64 => ClickHouseType::UInt64,
            TypeCode::UInt128 => ClickHouseType::UInt128,
            TypeCode::Float32 => ClickHouseType::Float32,
            TypeCode::Float64 => ClickHouseType::Float64,
            TypeCode::String => ClickHouseType::String,
            TypeCode::Uuid => ClickHouseType::Uuid,
            TypeCode::IPv4 => ClickHouseType::IPv4,
            TypeCode::IPv6 => ClickHouseType::IPv6,
            TypeCode::Date => ClickHouseType::Date,
            TypeCode::Date32 => ClickHouseType::Date32,
            TypeCode::DateTime => ClickHouseType::DateTime(DateTimeType::default()),
            _ => return None,
        })
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            ClickHouseType::Nothing => TypeCode::Nothing,
            ClickHouseType::Bool => TypeCode::Bool,
            ClickHouseType::Int8 => TypeCode::Int8,
            ClickHouseType::Int16 => TypeCode::Int16,
            ClickHouseType::Int32 => TypeCode::Int32,
            ClickHouseType::Int64 => TypeCode::Int64,
            ClickHouseType::Int128 => TypeCode::Int128,
            ClickHouseType::UInt8 => TypeCode::UInt8,
            ClickHouseType::UInt16 => TypeCode::UInt16,
            ClickHouseType::UInt32 => TypeCode::UInt32,
            ClickHouseType::UInt64 => TypeCode::UInt64,
            ClickHouseType::UInt128 => TypeCode::UInt128,
            ClickHouseType::Float32 => TypeCode::Float32,
            ClickHouseType::Float64 => TypeCode::Float64,
            ClickHouseType::String => TypeCode::String,
            ClickHouseType::Uuid => TypeCode::Uuid,
            ClickHouseType::IPv4 => TypeCode::IPv4,
            ClickHouseType::IPv6 => TypeCode::IPv6,
            ClickHouseType::Date => TypeCode::Date,
            ClickHouseType::Date32 => TypeCode::Date32,
            ClickHouseType::Decimal(ty) => ty.type_code(),
            ClickHouseType::FixedString(_) => TypeCode::FixedString,
            ClickHouseType::DateTime(_) => TypeCode::DateTime,
            ClickHouseType::DateTime64(_) => TypeCode::DateTime64,
            ClickHouseType::Enum8(_) => TypeCode::Enum8,
            ClickHouseType::Enum16(_) => TypeCode::Enum16,
            ClickHouseType::Array(_) => TypeCode::Array,
            ClickHouseType::Nullable(_) => TypeCode::Nullable,
            ClickHouseType::LowCardinality(_) => TypeCode::LowCardinality,
            ClickHouseType::Tuple(_) => TypeCode::Tuple,
            ClickHouseType::Nested(_) => TypeCode::Nested,
            ClickHouseType::Map(_) => TypeCode::Map,
            ClickHouseType::SimpleAggregateFunction(_) => TypeCode::SimpleAggregateFunction,
        }
    }

    /// Human-readable name of the outermost type.
    pub fn name(&self) -> &'static str {
        self.type_code().name()
    }

    /// True for types with no child descriptors.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            ClickHouseType::Array(_)
                | ClickHouseType::Nullable(_)
                | ClickHouseType::LowCardinality(_)
                | ClickHouseType::Tuple(_)
                | ClickHouseType::Nested(_)
                | ClickHouseType::Map(_)
                | ClickHouseType::SimpleAggregateFunction(_)
        )
    }

    /// Strip wrappers that do not change the value shape (`LowCardinality`,
    /// `SimpleAggregateFunction`).
    pub fn logical(&self) -> &ClickHouseType {
        match self {
            ClickHouseType::LowCardinality(ty) => ty.inner().logical(),
            ClickHouseType::SimpleAggregateFunction(ty) => ty.inner().logical(),
            other => other,
        }
    }

    /// Shape of the native value this type reads into and writes from.
    pub fn native_type(&self) -> NativeType {
        match self {
            ClickHouseType::Nothing => NativeType::Unit,
            ClickHouseType::Bool => NativeType::Bool,
            ClickHouseType::Int8 => NativeType::I8,
            ClickHouseType::Int16 => NativeType::I16,
            ClickHouseType::Int32 => NativeType::I32,
            ClickHouseType::Int64 => NativeType::I64,
            ClickHouseType::Int128 => NativeType::I128,
            ClickHouseType::UInt8 => NativeType::U8,
            ClickHouseType::UInt16 => NativeType::U16,
            ClickHouseType::UInt32 => NativeType::U32,
            ClickHouseType::UInt64 => NativeType::U64,
            ClickHouseType::UInt128 => NativeType::U128,
            ClickHouseType::Float32 => NativeType::F32,
            ClickHouseType::Float64 => NativeType::F64,
            ClickHouseType::String => NativeType::String,
            ClickHouseType::Uuid => NativeType::Uuid,
            ClickHouseType::IPv4 => NativeType::Ipv4Addr,
            ClickHouseType::IPv6 => NativeType::Ipv6Addr,
            ClickHouseType::Date | ClickHouseType::Date32 => NativeType::Date,
            ClickHouseType::Decimal(_) => NativeType::Decimal,
            ClickHouseType::FixedString(_) => NativeType::Bytes,
            ClickHouseType::DateTime(_) | ClickHouseType::DateTime64(_) => NativeType::DateTime,
            ClickHouseType::Enum8(_) | ClickHouseType::Enum16(_) => NativeType::String,
            ClickHouseType::Array(ty) => ty.native_type(),
            ClickHouseType::Nullable(ty) => ty.native_type(),
            ClickHouseType::LowCardinality(ty) => ty.inner().native_type(),
            ClickHouseType::Tuple(ty) => ty.native_type(),
            ClickHouseType::Nested(ty) => ty.native_type(),
            ClickHouseType::Map(ty) => ty.native_type(),
            ClickHouseType::SimpleAggregateFunction(ty) => ty.inner().native_type(),
        }
    }

    /// Decode one value by handing this descriptor to `reader`.
    pub fn accept_read<R: TypeReader + ?Sized>(&self, reader: &mut R) -> Result<Value, R::Error> {
        match self {
            ClickHouseType::Nothing => reader.read_nothing(),
            ClickHouseType::Bool => reader.read_bool(),
            ClickHouseType::Int8 => reader.read_int8(),
            ClickHouseType::Int16 => reader.read_int16(),
            ClickHouseType::Int32 => reader.read_int32(),
            ClickHouseType::Int64 => reader.read_int64(),
            ClickHouseType::Int128 => reader.read_int128(),
            ClickHouseType::UInt8 => reader.read_uint8(),
            ClickHouseType::UInt16 => reader.read_uint16(),
            ClickHouseType::UInt32 => reader.read_uint32(),
            ClickHouseType::UInt64 => reader.read_uint64(),
            ClickHouseType::UInt128 => reader.read_uint128(),
            ClickHouseType::Float32 => reader.read_float32(),
            ClickHouseType::Float64 => reader.read_float64(),
            ClickHouseType::String => reader.read_string(),
            ClickHouseType::Uuid => reader.read_uuid(),
            ClickHouseType::IPv4 => reader.read_ipv4(),
            ClickHouseType::IPv6 => reader.read_ipv6(),
            ClickHouseType::Date => reader.read_date(),
            ClickHouseType::Date32 => reader.read_date32(),
            ClickHouseType::Decimal(ty) => reader.read_decimal(ty),
            ClickHouseType::FixedString(ty) => reader.read_fixed_string(ty),
            ClickHouseType::DateTime(ty) => reader.read_date_time(ty),
            ClickHouseType::DateTime64(ty) => reader.read_date_time64(ty),
            ClickHouseType::Enum8(ty) => reader.read_enum8(ty),
            ClickHouseType::Enum16(ty) => reader.read_enum16(ty),
            ClickHouseType::Array(ty) => reader.read_array(ty),
            ClickHouseType::Nullable(ty) => reader.read_nullable(ty),
            ClickHouseType::LowCardinality(ty) => reader.read_low_cardinality(ty),
            ClickHouseType::Tuple(ty) => reader.read_tuple(ty),
            ClickHouseType::Nested(ty) => reader.read_nested(ty),
            ClickHouseType::Map(ty) => reader.read_map(ty),
            ClickHouseType::SimpleAggregateFunction(ty) => {
                reader.read_simple_aggregate_function(ty)
            }
        }
    }

    /// Encode `value` by handing this descriptor to `writer`.
    pub fn accept_write<W: TypeWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: &Value,
    ) -> Result<(), W::Error> {
        match self {
            ClickHouseType::Nothing => writer.write_nothing(value),
            ClickHouseType::Bool => writer.write_bool(value),
            ClickHouseType::Int8 => writer.write_int8(value),
            ClickHouseType::Int16 => writer.write_int16(value),
            ClickHouseType::Int32 => writer.write_int32(value),
            ClickHouseType::Int64 => writer.write_int64(value),
            ClickHouseType::Int128 => writer.write_int128(value),
            ClickHouseType::UInt8 => writer.write_uint8(value),
            ClickHouseType::UInt16 => writer.write_uint16(value),
            ClickHouseType::UInt32 => writer.write_uint32(value),
            ClickHouseType::UInt64 => writer.write_uint64(value),
            ClickHouseType::UInt128 => writer.write_uint128(value),
            ClickHouseType::Float32 => writer.write_float32(value),
            ClickHouseType::Float64 => writer.write_float64(value),
            ClickHouseType::String => writer.write_string(value),
            ClickHouseType::Uuid => writer.write_uuid(value),
            ClickHouseType::IPv4 => writer.write_ipv4(value),
            ClickHouseType::IPv6 => writer.write_ipv6(value),
            ClickHouseType::Date => writer.write_date(value),
            ClickHouseType::Date32 => writer.write_date32(value),
            ClickHouseType::Decimal(ty) => writer.write_decimal(ty, value),
            ClickHouseType::FixedString(ty) => writer.write_fixed_string(ty, value),
            ClickHouseType::DateTime(ty) => writer.write_date_time(ty, value),
            ClickHouseType::DateTime64(ty) => writer.write_date_time64(ty, value),
            ClickHouseType::Enum8(ty) => writer.write_enum8(ty, value),
            ClickHouseType::Enum16(ty) => writer.write_enum16(ty, value),
            ClickHouseType::Array(ty) => writer.write_array(ty, value),
            ClickHouseType::Nullable(ty) => writer.write_nullable(ty, value),
            ClickHouseType::LowCardinality(ty) => writer.write_low_cardinality(ty, value),
            ClickHouseType::Tuple(ty) => writer.write_tuple(ty, value),
            ClickHouseType::Nested(ty) => writer.write_nested(ty, value),
            ClickHouseType::Map(ty) => writer.write_map(ty, value),
            ClickHouseType::SimpleAggregateFunction(ty) => {
                writer.write_simple_aggregate_function(ty, value)
            }
        }
    }
}

impl fmt::Display for ClickHouseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickHouseType::Decimal(ty) => write!(f, "{ty}"),
            ClickHouseType::FixedString(ty) => write!(f, "{ty}"),
            ClickHouseType::DateTime(ty) => write!(f, "{ty}"),
            ClickHouseType::DateTime64(ty) => write!(f, "{ty}"),
            ClickHouseType::Enum8(ty) | ClickHouseType::Enum16(ty) => write!(f, "{ty}"),
            ClickHouseType::Array(ty) => write!(f, "{ty}"),
            ClickHouseType::Nullable(ty) => write!(f, "{ty}"),
            ClickHouseType::LowCardinality(ty) => write!(f, "{ty}"),
            ClickHouseType::Tuple(ty) => write!(f, "{ty}"),
            ClickHouseType::Nested(ty) => write!(f, "{ty}"),
            ClickHouseType::Map(ty) => write!(f, "{ty}"),
            ClickHouseType::SimpleAggregateFunction(ty) => write!(f, "{ty}"),
            simple => f.write_str(simple.name()),
        }
    }
}
