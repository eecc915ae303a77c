use std::io::Write;

use chwire_types::types::{
    ArrayType, DateTime64Type, DateTimeType, DecimalType, DecimalWidth, EnumType,
    FixedStringType, LowCardinalityType, MapType, NestedType, NullableType,
    SimpleAggregateFunctionType, TupleType,
};
use chwire_types::{days_since_epoch, ClickHouseType, TypeError, TypeWriter, Value};

use crate::error::CodecError;
use crate::options::BinaryOptions;
use crate::varint::write_varint;

/// Encodes RowBinary values into any [`Write`] sink.
///
/// Values must already have the native shape of their descriptor (see
/// [`Value::coerce_to`]); anything else is a [`CodecError::TypeMismatch`].
#[derive(Debug)]
pub struct BinaryWriter<W> {
    inner: W,
    options: BinaryOptions,
}

fn mismatch(expected: impl ToString, value: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected: expected.to_string(),
        actual: value.kind(),
    }
}

macro_rules! write_scalar {
    ($($method:ident: $variant:ident => $target:literal),* $(,)?) => {
        $(
            fn $method(&mut self, value: &Value) -> Result<(), CodecError> {
                match value {
                    Value::$variant(v) => self.put(&v.to_le_bytes()),
                    other => Err(mismatch($target, other)),
                }
            }
        )*
    };
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, BinaryOptions::default())
    }

    pub fn with_options(inner: W, options: BinaryOptions) -> Self {
        Self { inner, options }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Encode one value of type `ty`.
    pub fn write(&mut self, ty: &ClickHouseType, value: &Value) -> Result<(), CodecError> {
        ty.accept_write(self, value)
    }

    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    fn length(&mut self, kind: &'static str, len: usize, max: usize) -> Result<(), CodecError> {
        if len > max {
            return Err(CodecError::LengthLimit {
                kind,
                len: len as u64,
                max,
            });
        }
        write_varint(&mut self.inner, len as u64)
    }

    fn collection_len(&mut self, kind: &'static str, len: usize) -> Result<(), CodecError> {
        self.length(kind, len, self.options.max_collection_len)
    }

    fn write_row(&mut self, ty: &TupleType, items: &[Value]) -> Result<(), CodecError> {
        if items.len() != ty.len() {
            return Err(TypeError::TupleArityMismatch {
                expected: ty.len(),
                actual: items.len(),
            }
            .into());
        }
        ty.types()
            .zip(items)
            .try_for_each(|(element, item)| element.accept_write(self, item))
    }

    fn enum_code(&self, ty: &EnumType, value: &Value) -> Result<i16, CodecError> {
        match value {
            Value::String(name) => Ok(ty.code_of(name)?),
            Value::Int8(code) => {
                ty.name_of(i16::from(*code))?;
                Ok(i16::from(*code))
            }
            Value::Int16(code) => {
                ty.name_of(*code)?;
                Ok(*code)
            }
            other => Err(mismatch(ty, other)),
        }
    }
}

impl<W: Write> TypeWriter for BinaryWriter<W> {
    type Error = CodecError;

    write_scalar!(
        write_int8: Int8 => "Int8",
        write_int16: Int16 => "Int16",
        write_int32: Int32 => "Int32",
        write_int64: Int64 => "Int64",
        write_int128: Int128 => "Int128",
        write_uint8: UInt8 => "UInt8",
        write_uint16: UInt16 => "UInt16",
        write_uint32: UInt32 => "UInt32",
        write_uint64: UInt64 => "UInt64",
        write_uint128: UInt128 => "UInt128",
        write_float32: Float32 => "Float32",
        write_float64: Float64 => "Float64",
    );

    fn write_nothing(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Nothing | Value::Null => self.put(&[0]),
            other => Err(mismatch("Nothing", other)),
        }
    }

    fn write_bool(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Bool(v) => self.put(&[u8::from(*v)]),
            other => Err(mismatch("Bool", other)),
        }
    }

    fn write_string(&mut self, value: &Value) -> Result<(), CodecError> {
        let bytes = match value {
            Value::String(s) => s.as_bytes(),
            Value::Bytes(b) => b.as_slice(),
            other => return Err(mismatch("String", other)),
        };
        self.length("String", bytes.len(), self.options.max_string_len)?;
        self.put(bytes)
    }

    fn write_uuid(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Uuid(v) => {
                let (high, low) = v.as_u64_pair();
                self.put(&high.to_le_bytes())?;
                self.put(&low.to_le_bytes())
            }
            other => Err(mismatch("UUID", other)),
        }
    }

    fn write_ipv4(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Ipv4(v) => self.put(&u32::from(*v).to_le_bytes()),
            other => Err(mismatch("IPv4", other)),
        }
    }

    fn write_ipv6(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Ipv6(v) => self.put(&v.octets()),
            other => Err(mismatch("IPv6", other)),
        }
    }

    fn write_date(&mut self, value: &Value) -> Result<(), CodecError> {
        let Value::Date(date) = value else {
            return Err(mismatch("Date", value));
        };
        let days = u16::try_from(days_since_epoch(*date))
            .map_err(|_| CodecError::invalid("Date", format!("{date} is out of range")))?;
        self.put(&days.to_le_bytes())
    }

    fn write_date32(&mut self, value: &Value) -> Result<(), CodecError> {
        let Value::Date(date) = value else {
            return Err(mismatch("Date32", value));
        };
        let days = i32::try_from(days_since_epoch(*date))
            .map_err(|_| CodecError::invalid("Date32", format!("{date} is out of range")))?;
        self.put(&days.to_le_bytes())
    }

    fn write_decimal(&mut self, ty: &DecimalType, value: &Value) -> Result<(), CodecError> {
        let Value::Decimal(decimal) = value else {
            return Err(mismatch(ty, value));
        };
        let mantissa = decimal
            .rescale(ty.scale())
            .map(|d| d.mantissa())
            .filter(|m| ty.fits(*m))
            .ok_or_else(|| CodecError::invalid(ty, format!("{decimal} does not fit")))?;
        // `fits` bounds the mantissa by the precision, which never exceeds the width.
        let overflow = || CodecError::invalid(ty, format!("{decimal} does not fit"));
        match ty.width() {
            DecimalWidth::W32 => {
                let m = i32::try_from(mantissa).map_err(|_| overflow())?;
                self.put(&m.to_le_bytes())
            }
            DecimalWidth::W64 => {
                let m = i64::try_from(mantissa).map_err(|_| overflow())?;
                self.put(&m.to_le_bytes())
            }
            DecimalWidth::W128 => self.put(&mantissa.to_le_bytes()),
        }
    }

    fn write_fixed_string(
        &mut self,
        ty: &FixedStringType,
        value: &Value,
    ) -> Result<(), CodecError> {
        let bytes = match value {
            Value::Bytes(b) => b.as_slice(),
            Value::String(s) => s.as_bytes(),
            other => return Err(mismatch(ty, other)),
        };
        if bytes.len() != ty.length() {
            return Err(CodecError::invalid(
                ty,
                format!("expected {} bytes, got {}", ty.length(), bytes.len()),
            ));
        }
        self.put(bytes)
    }

    fn write_date_time(&mut self, ty: &DateTimeType, value: &Value) -> Result<(), CodecError> {
        let seconds = match value {
            Value::DateTime(v) => v.timestamp(),
            Value::NaiveDateTime(v) => ty.localize(v).timestamp(),
            other => return Err(mismatch(ty, other)),
        };
        let seconds = u32::try_from(seconds)
            .map_err(|_| CodecError::invalid(ty, format!("timestamp {seconds} is out of range")))?;
        self.put(&seconds.to_le_bytes())
    }

    fn write_date_time64(
        &mut self,
        ty: &DateTime64Type,
        value: &Value,
    ) -> Result<(), CodecError> {
        let ticks = match value {
            Value::DateTime(v) => ty.to_ticks(v),
            Value::NaiveDateTime(v) => ty.to_ticks(&ty.localize(v)),
            other => return Err(mismatch(ty, other)),
        }
        .ok_or_else(|| CodecError::invalid(ty, "instant is out of range"))?;
        self.put(&ticks.to_le_bytes())
    }

    fn write_enum8(&mut self, ty: &EnumType, value: &Value) -> Result<(), CodecError> {
        let code = self.enum_code(ty, value)?;
        let code = i8::try_from(code)
            .map_err(|_| CodecError::invalid(ty, format!("code {code} does not fit in Enum8")))?;
        self.put(&code.to_le_bytes())
    }

    fn write_enum16(&mut self, ty: &EnumType, value: &Value) -> Result<(), CodecError> {
        let code = self.enum_code(ty, value)?;
        self.put(&code.to_le_bytes())
    }

    fn write_array(&mut self, ty: &ArrayType, value: &Value) -> Result<(), CodecError> {
        let Value::Array(items) = value else {
            return Err(mismatch(ty, value));
        };
        self.collection_len("Array", items.len())?;
        items
            .iter()
            .try_for_each(|item| ty.element().accept_write(self, item))
    }

    fn write_nullable(&mut self, ty: &NullableType, value: &Value) -> Result<(), CodecError> {
        if value.is_null() {
            return self.put(&[1]);
        }
        self.put(&[0])?;
        ty.inner().accept_write(self, value)
    }

    fn write_low_cardinality(
        &mut self,
        ty: &LowCardinalityType,
        value: &Value,
    ) -> Result<(), CodecError> {
        ty.inner().accept_write(self, value)
    }

    fn write_tuple(&mut self, ty: &TupleType, value: &Value) -> Result<(), CodecError> {
        let Value::Tuple(items) = value else {
            return Err(mismatch(ty, value));
        };
        self.write_row(ty, items)
    }

    fn write_nested(&mut self, ty: &NestedType, value: &Value) -> Result<(), CodecError> {
        let Value::Array(rows) = value else {
            return Err(mismatch(ty, value));
        };
        self.collection_len("Nested", rows.len())?;
        for row in rows {
            let Value::Tuple(items) = row else {
                return Err(mismatch(ty.row(), row));
            };
            self.write_row(ty.row(), items)?;
        }
        Ok(())
    }

    fn write_map(&mut self, ty: &MapType, value: &Value) -> Result<(), CodecError> {
        let Value::Map(pairs) = value else {
            return Err(mismatch(ty, value));
        };
        self.collection_len("Map", pairs.len())?;
        for (key, item) in pairs {
            ty.key().accept_write(self, key)?;
            ty.value().accept_write(self, item)?;
        }
        Ok(())
    }

    fn write_simple_aggregate_function(
        &mut self,
        ty: &SimpleAggregateFunctionType,
        value: &Value,
    ) -> Result<(), CodecError> {
        ty.inner().accept_write(self, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chwire_types::{parse_clickhouse_type, Decimal};
    use pretty_assertions::assert_eq;

    fn write(signature: &str, value: &Value) -> Result<Vec<u8>, CodecError> {
        let ty = parse_clickhouse_type(signature).unwrap();
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write(&ty, value)?;
        Ok(writer.into_inner())
    }

    #[test]
    fn strict_about_value_shape() {
        assert!(matches!(
            write("Int32", &Value::Int64(1)),
            Err(CodecError::TypeMismatch {
                actual: "Int64",
                ..
            })
        ));
        assert!(matches!(
            write("Array(Int32)", &Value::Int32(1)),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn decimals_use_descriptor_width() {
        let value = Value::Decimal(Decimal::new(-150, 2).unwrap());
        assert_eq!(
            write("Decimal(9, 2)", &value).unwrap(),
            (-150i32).to_le_bytes()
        );
        assert_eq!(
            write("Decimal(18, 3)", &value).unwrap(),
            (-1500i64).to_le_bytes()
        );
        assert!(matches!(
            write("Decimal(9, 1)", &Value::Decimal(Decimal::new(-155, 2).unwrap())),
            Err(CodecError::InvalidValue { .. })
        ));
    }

    #[test]
    fn fixed_string_needs_exact_length() {
        assert_eq!(
            write("FixedString(3)", &Value::Bytes(b"abc".to_vec())).unwrap(),
            b"abc"
        );
        assert!(write("FixedString(3)", &Value::from("ab")).is_err());
    }

    #[test]
    fn enums_accept_names_and_known_codes() {
        let sig = "Enum16('low' = -1000, 'high' = 1000)";
        assert_eq!(
            write(sig, &Value::from("high")).unwrap(),
            1000i16.to_le_bytes()
        );
        assert_eq!(
            write(sig, &Value::Int16(-1000)).unwrap(),
            (-1000i16).to_le_bytes()
        );
        assert!(matches!(
            write(sig, &Value::Int16(5)),
            Err(CodecError::Type(TypeError::EnumCodeNotFound(5)))
        ));
    }

    #[test]
    fn tuple_arity_is_checked() {
        assert!(matches!(
            write("Tuple(UInt8, UInt8)", &Value::Tuple(vec![Value::UInt8(1)])),
            Err(CodecError::Type(TypeError::TupleArityMismatch {
                expected: 2,
                actual: 1
            }))
        ));
    }
}
