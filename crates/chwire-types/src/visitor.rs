//! Read/write visitors.
//!
//! A codec implements [`TypeReader`] and/or [`TypeWriter`] once, with one method per concrete
//! descriptor kind; [`ClickHouseType::accept_read`](crate::ClickHouseType::accept_read) and
//! [`ClickHouseType::accept_write`](crate::ClickHouseType::accept_write) route each descriptor to
//! its method. Adding a wire type means adding a variant and a method to both traits.
//!
//! Composite methods receive their descriptor so the implementation can recurse into children by
//! calling `accept_read` / `accept_write` on them with itself.

use crate::types::{
    ArrayType, DateTime64Type, DateTimeType, DecimalType, EnumType, FixedStringType,
    LowCardinalityType, MapType, NestedType, NullableType, SimpleAggregateFunctionType, TupleType,
};
use crate::value::Value;

pub trait TypeReader {
    type Error;

    fn read_nothing(&mut self) -> Result<Value, Self::Error>;
    fn read_bool(&mut self) -> Result<Value, Self::Error>;
    fn read_int8(&mut self) -> Result<Value, Self::Error>;
    fn read_int16(&mut self) -> Result<Value, Self::Error>;
    fn read_int32(&mut self) -> Result<Value, Self::Error>;
    fn read_int64(&mut self) -> Result<Value, Self::Error>;
    fn read_int128(&mut self) -> Result<Value, Self::Error>;
    fn read_uint8(&mut self) -> Result<Value, Self::Error>;
    fn read_uint16(&mut self) -> Result<Value, Self::Error>;
    fn read_uint32(&mut self) -> Result<Value, Self::Error>;
    fn read_uint64(&mut self) -> Result<Value, Self::Error>;
    fn read_uint128(&mut self) -> Result<Value, Self::Error>;
    fn read_float32(&mut self) -> Result<Value, Self::Error>;
    fn read_float64(&mut self) -> Result<Value, Self::Error>;
    fn read_string(&mut self) -> Result<Value, Self::Error>;
    fn read_uuid(&mut self) -> Result<Value, Self::Error>;
    fn read_ipv4(&mut self) -> Result<Value, Self::Error>;
    fn read_ipv6(&mut self) -> Result<Value, Self::Error>;
    fn read_date(&mut self) -> Result<Value, Self::Error>;
    fn read_date32(&mut self) -> Result<Value, Self::Error>;
    fn read_decimal(&mut self, ty: &DecimalType) -> Result<Value, Self::Error>;
    fn read_fixed_string(&mut self, ty: &FixedStringType) -> Result<Value, Self::Error>;
    fn read_date_time(&mut self, ty: &DateTimeType) -> Result<Value, Self::Error>;
    fn read_date_time64(&mut self, ty: &DateTime64Type) -> Result<Value, Self::Error>;
    fn read_enum8(&mut self, ty: &EnumType) -> Result<Value, Self::Error>;
    fn read_enum16(&mut self, ty: &EnumType) -> Result<Value, Self::Error>;
    fn read_array(&mut self, ty: &ArrayType) -> Result<Value, Self::Error>;
    fn read_nullable(&mut self, ty: &NullableType) -> Result<Value, Self::Error>;
    fn read_low_cardinality(&mut self, ty: &LowCardinalityType) -> Result<Value, Self::Error>;
    fn read_tuple(&mut self, ty: &TupleType) -> Result<Value, Self::Error>;
    fn read_nested(&mut self, ty: &NestedType) -> Result<Value, Self::Error>;
    fn read_map(&mut self, ty: &MapType) -> Result<Value, Self::Error>;
    fn read_simple_aggregate_function(
        &mut self,
        ty: &SimpleAggregateFunctionType,
    ) -> Result<Value, Self::Error>;
}

/// Writers report value/descriptor mismatches (e.g. a string written to `Int32`) themselves.
pub trait TypeWriter {
    type Error;

    fn write_nothing(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_bool(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_int8(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_int16(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_int32(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_int64(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_int128(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_uint8(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_uint16(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_uint32(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_uint64(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_uint128(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_float32(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_float64(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_string(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_uuid(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_ipv4(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_ipv6(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_date(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_date32(&mut self, value: &Value) -> Result<(), Self::Error>;
    fn write_decimal(&mut self, ty: &DecimalType, value: &Value) -> Result<(), Self::Error>;
    fn write_fixed_string(&mut self, ty: &FixedStringType, value: &Value)
        -> Result<(), Self::Error>;
    fn write_date_time(&mut self, ty: &DateTimeType, value: &Value) -> Result<(), Self::Error>;
    fn write_date_time64(&mut self, ty: &DateTime64Type, value: &Value)
        -> Result<(), Self::Error>;
    fn write_enum8(&mut self, ty: &EnumType, value: &Value) -> Result<(), Self::Error>;
    fn write_enum16(&mut self, ty: &EnumType, value: &Value) -> Result<(), Self::Error>;
    fn write_array(&mut self, ty: &ArrayType, value: &Value) -> Result<(), Self::Error>;
    fn write_nullable(&mut self, ty: &NullableType, value: &Value) -> Result<(), Self::Error>;
    fn write_low_cardinality(
        &mut self,
        ty: &LowCardinalityType,
        value: &Value,
    ) -> Result<(), Self::Error>;
    fn write_tuple(&mut self, ty: &TupleType, value: &Value) -> Result<(), Self::Error>;
    fn write_nested(&mut self, ty: &NestedType, value: &Value) -> Result<(), Self::Error>;
    fn write_map(&mut self, ty: &MapType, value: &Value) -> Result<(), Self::Error>;
    fn write_simple_aggregate_function(
        &mut self,
        ty: &SimpleAggregateFunctionType,
        value: &Value,
    ) -> Result<(), Self::Error>;
}
