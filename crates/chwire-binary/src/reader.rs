use std::io::{ErrorKind, Read};
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Days, Utc};
use chwire_types::types::{
    ArrayType, DateTime64Type, DateTimeType, DecimalType, DecimalWidth, EnumType,
    FixedStringType, LowCardinalityType, MapType, NestedType, NullableType,
    SimpleAggregateFunctionType, TupleType,
};
use chwire_types::{ClickHouseType, Decimal, TypeReader, Value};
use uuid::Uuid;

use crate::error::CodecError;
use crate::options::BinaryOptions;
use crate::varint::read_varint;

/// Upper bound on speculative `Vec` reservations driven by untrusted length prefixes.
const MAX_PREALLOCATION: usize = 4096;

/// Whether values of `ty` occupy no bytes on the wire (`Tuple()` and tuples of those).
fn is_zero_width(ty: &ClickHouseType) -> bool {
    match ty.logical() {
        ClickHouseType::Tuple(tuple) => tuple.types().all(is_zero_width),
        _ => false,
    }
}

/// Decodes RowBinary values from any [`Read`] source.
#[derive(Debug)]
pub struct BinaryReader<R> {
    inner: R,
    options: BinaryOptions,
    /// Zero-width collection elements still allowed in the current value.
    zero_width_left: usize,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, BinaryOptions::default())
    }

    pub fn with_options(inner: R, options: BinaryOptions) -> Self {
        Self {
            inner,
            options,
            zero_width_left: options.max_zero_width_elements,
        }
    }

    pub fn options(&self) -> &BinaryOptions {
        &self.options
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Decode one value of type `ty`.
    pub fn read(&mut self, ty: &ClickHouseType) -> Result<Value, CodecError> {
        self.zero_width_left = self.options.max_zero_width_elements;
        ty.accept_read(self)
    }

    fn fill(&mut self, buf: &mut [u8], context: &'static str) -> Result<(), CodecError> {
        self.inner.read_exact(buf).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => CodecError::Truncated { context },
            _ => CodecError::Io(err),
        })
    }

    fn take<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], CodecError> {
        let mut buf = [0u8; N];
        self.fill(&mut buf, context)?;
        Ok(buf)
    }

    fn take_vec(&mut self, len: usize, context: &'static str) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        let read = (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(CodecError::Io)?;
        if read < len {
            return Err(CodecError::Truncated { context });
        }
        Ok(buf)
    }

    fn length(&mut self, kind: &'static str, max: usize) -> Result<usize, CodecError> {
        let len = read_varint(&mut self.inner)?;
        match usize::try_from(len) {
            Ok(n) if n <= max => Ok(n),
            _ => Err(CodecError::LengthLimit { kind, len, max }),
        }
    }

    /// Elements that consume no input are charged against a per-value budget, since the
    /// input size no longer bounds how many of them a length prefix can produce.
    fn collection_len(
        &mut self,
        kind: &'static str,
        zero_width: bool,
    ) -> Result<usize, CodecError> {
        let len = self.length(kind, self.options.max_collection_len)?;
        if zero_width {
            if len > self.zero_width_left {
                return Err(CodecError::LengthLimit {
                    kind,
                    len: len as u64,
                    max: self.zero_width_left,
                });
            }
            self.zero_width_left -= len;
        }
        Ok(len)
    }

    fn read_elements(
        &mut self,
        len: usize,
        ty: &ClickHouseType,
    ) -> Result<Vec<Value>, CodecError> {
        let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        for _ in 0..len {
            items.push(ty.accept_read(self)?);
        }
        Ok(items)
    }

    fn date_from_days(&self, days: i64, target: &'static str) -> Result<Value, CodecError> {
        let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
        let date = if days >= 0 {
            epoch.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            epoch.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        date.map(Value::Date)
            .ok_or_else(|| CodecError::invalid(target, format!("day {days} is out of range")))
    }
}

impl<R: Read> TypeReader for BinaryReader<R> {
    type Error = CodecError;

    fn read_nothing(&mut self) -> Result<Value, CodecError> {
        self.take::<1>("Nothing")?;
        Ok(Value::Nothing)
    }

    fn read_bool(&mut self) -> Result<Value, CodecError> {
        match self.take::<1>("Bool")? {
            [0] => Ok(Value::Bool(false)),
            [1] => Ok(Value::Bool(true)),
            [other] => Err(CodecError::invalid("Bool", format!("byte {other:#04x}"))),
        }
    }

    fn read_int8(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Int8(i8::from_le_bytes(self.take("Int8")?)))
    }

    fn read_int16(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Int16(i16::from_le_bytes(self.take("Int16")?)))
    }

    fn read_int32(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Int32(i32::from_le_bytes(self.take("Int32")?)))
    }

    fn read_int64(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Int64(i64::from_le_bytes(self.take("Int64")?)))
    }

    fn read_int128(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Int128(i128::from_le_bytes(self.take("Int128")?)))
    }

    fn read_uint8(&mut self) -> Result<Value, CodecError> {
        Ok(Value::UInt8(u8::from_le_bytes(self.take("UInt8")?)))
    }

    fn read_uint16(&mut self) -> Result<Value, CodecError> {
        Ok(Value::UInt16(u16::from_le_bytes(self.take("UInt16")?)))
    }

    fn read_uint32(&mut self) -> Result<Value, CodecError> {
        Ok(Value::UInt32(u32::from_le_bytes(self.take("UInt32")?)))
    }

    fn read_uint64(&mut self) -> Result<Value, CodecError> {
        Ok(Value::UInt64(u64::from_le_bytes(self.take("UInt64")?)))
    }

    fn read_uint128(&mut self) -> Result<Value, CodecError> {
        Ok(Value::UInt128(u128::from_le_bytes(self.take("UInt128")?)))
    }

    fn read_float32(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Float32(f32::from_le_bytes(self.take("Float32")?)))
    }

    fn read_float64(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Float64(f64::from_le_bytes(self.take("Float64")?)))
    }

    fn read_string(&mut self) -> Result<Value, CodecError> {
        let len = self.length("String", self.options.max_string_len)?;
        let bytes = self.take_vec(len, "String")?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(err) if self.options.utf8_strings => {
                Value::String(String::from_utf8_lossy(err.as_bytes()).into_owned())
            }
            Err(err) => Value::Bytes(err.into_bytes()),
        })
    }

    fn read_uuid(&mut self) -> Result<Value, CodecError> {
        let high = u64::from_le_bytes(self.take("UUID")?);
        let low = u64::from_le_bytes(self.take("UUID")?);
        Ok(Value::Uuid(Uuid::from_u64_pair(high, low)))
    }

    fn read_ipv4(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Ipv4(Ipv4Addr::from(u32::from_le_bytes(
            self.take("IPv4")?,
        ))))
    }

    fn read_ipv6(&mut self) -> Result<Value, CodecError> {
        Ok(Value::Ipv6(Ipv6Addr::from(self.take::<16>("IPv6")?)))
    }

    fn read_date(&mut self) -> Result<Value, CodecError> {
        let days = u16::from_le_bytes(self.take("Date")?);
        self.date_from_days(i64::from(days), "Date")
    }

    fn read_date32(&mut self) -> Result<Value, CodecError> {
        let days = i32::from_le_bytes(self.take("Date32")?);
        self.date_from_days(i64::from(days), "Date32")
    }

    fn read_decimal(&mut self, ty: &DecimalType) -> Result<Value, CodecError> {
        let mantissa = match ty.width() {
            DecimalWidth::W32 => i128::from(i32::from_le_bytes(self.take("Decimal32")?)),
            DecimalWidth::W64 => i128::from(i64::from_le_bytes(self.take("Decimal64")?)),
            DecimalWidth::W128 => i128::from_le_bytes(self.take("Decimal128")?),
        };
        if !ty.fits(mantissa) {
            return Err(CodecError::invalid(ty, format!("{mantissa} exceeds the precision")));
        }
        Decimal::new(mantissa, ty.scale())
            .map(Value::Decimal)
            .ok_or_else(|| CodecError::invalid(ty, "scale out of range"))
    }

    fn read_fixed_string(&mut self, ty: &FixedStringType) -> Result<Value, CodecError> {
        Ok(Value::Bytes(self.take_vec(ty.length(), "FixedString")?))
    }

    fn read_date_time(&mut self, ty: &DateTimeType) -> Result<Value, CodecError> {
        let seconds = u32::from_le_bytes(self.take("DateTime")?);
        ty.from_unix_seconds(i64::from(seconds))
            .map(Value::DateTime)
            .ok_or_else(|| CodecError::invalid(ty, format!("timestamp {seconds}")))
    }

    fn read_date_time64(&mut self, ty: &DateTime64Type) -> Result<Value, CodecError> {
        let ticks = i64::from_le_bytes(self.take("DateTime64")?);
        ty.from_ticks(ticks)
            .map(Value::DateTime)
            .ok_or_else(|| CodecError::invalid(ty, format!("ticks {ticks}")))
    }

    fn read_enum8(&mut self, ty: &EnumType) -> Result<Value, CodecError> {
        let code = i8::from_le_bytes(self.take("Enum8")?);
        Ok(Value::String(ty.name_of(i16::from(code))?.to_string()))
    }

    fn read_enum16(&mut self, ty: &EnumType) -> Result<Value, CodecError> {
        let code = i16::from_le_bytes(self.take("Enum16")?);
        Ok(Value::String(ty.name_of(code)?.to_string()))
    }

    fn read_array(&mut self, ty: &ArrayType) -> Result<Value, CodecError> {
        let len = self.collection_len("Array", is_zero_width(ty.element()))?;
        Ok(Value::Array(self.read_elements(len, ty.element())?))
    }

    fn read_nullable(&mut self, ty: &NullableType) -> Result<Value, CodecError> {
        match self.take::<1>("Nullable flag")? {
            [1] => Ok(Value::Null),
            [0] => ty.inner().accept_read(self),
            [other] => Err(CodecError::invalid(ty, format!("null flag {other:#04x}"))),
        }
    }

    fn read_low_cardinality(&mut self, ty: &LowCardinalityType) -> Result<Value, CodecError> {
        ty.inner().accept_read(self)
    }

    fn read_tuple(&mut self, ty: &TupleType) -> Result<Value, CodecError> {
        let items = ty
            .types()
            .map(|element| element.accept_read(self))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Tuple(items))
    }

    fn read_nested(&mut self, ty: &NestedType) -> Result<Value, CodecError> {
        let zero_width = ty.row().types().all(is_zero_width);
        let len = self.collection_len("Nested", zero_width)?;
        let mut rows = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        for _ in 0..len {
            rows.push(self.read_tuple(ty.row())?);
        }
        Ok(Value::Array(rows))
    }

    fn read_map(&mut self, ty: &MapType) -> Result<Value, CodecError> {
        let zero_width = is_zero_width(ty.key()) && is_zero_width(ty.value());
        let len = self.collection_len("Map", zero_width)?;
        let mut pairs = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        for _ in 0..len {
            let key = ty.key().accept_read(self)?;
            let value = ty.value().accept_read(self)?;
            pairs.push((key, value));
        }
        Ok(Value::Map(pairs))
    }

    fn read_simple_aggregate_function(
        &mut self,
        ty: &SimpleAggregateFunctionType,
    ) -> Result<Value, CodecError> {
        ty.inner().accept_read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chwire_types::parse_clickhouse_type;
    use pretty_assertions::assert_eq;

    fn read(signature: &str, bytes: &[u8]) -> Result<Value, CodecError> {
        let ty = parse_clickhouse_type(signature).unwrap();
        BinaryReader::new(bytes).read(&ty)
    }

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(read("Int16", &[0x34, 0x12]).unwrap(), Value::Int16(0x1234));
        assert_eq!(read("UInt32", &[1, 0, 0, 0]).unwrap(), Value::UInt32(1));
        assert_eq!(read("Int8", &[0xff]).unwrap(), Value::Int8(-1));
    }

    #[test]
    fn dates_count_days_from_epoch() {
        assert_eq!(
            read("Date", &[1, 0]).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap())
        );
        assert_eq!(
            read("Date32", &(-1i32).to_le_bytes()).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap())
        );
    }

    #[test]
    fn invalid_bytes_are_rejected() {
        assert!(matches!(read("Bool", &[2]), Err(CodecError::InvalidValue { .. })));
        assert!(matches!(
            read("Nullable(Int8)", &[7, 0]),
            Err(CodecError::InvalidValue { .. })
        ));
        assert!(matches!(
            read("Enum8('a' = 1)", &[2]),
            Err(CodecError::Type(_))
        ));
    }

    #[test]
    fn short_input_reports_context() {
        let err = read("Int64", &[1, 2, 3]).unwrap_err();
        assert_eq!(err.to_string(), "truncated data while reading Int64");
        assert!(matches!(
            read("String", &[5, b'a']),
            Err(CodecError::Truncated { context: "String" })
        ));
    }

    #[test]
    fn length_prefixes_respect_limits() {
        let ty = parse_clickhouse_type("Array(UInt8)").unwrap();
        let options = BinaryOptions {
            max_collection_len: 2,
            ..BinaryOptions::default()
        };
        let mut reader = BinaryReader::with_options(&[3u8, 1, 2, 3][..], options);
        assert!(matches!(
            reader.read(&ty),
            Err(CodecError::LengthLimit {
                kind: "Array",
                len: 3,
                max: 2
            })
        ));
    }

    #[test]
    fn zero_width_elements_share_one_budget() {
        let options = BinaryOptions {
            max_zero_width_elements: 4,
            ..BinaryOptions::default()
        };

        let ty = parse_clickhouse_type("Array(Tuple())").unwrap();
        let mut reader = BinaryReader::with_options(&[4u8][..], options);
        assert_eq!(
            reader.read(&ty).unwrap(),
            Value::Array(vec![Value::Tuple(vec![]); 4])
        );

        // Two inner arrays of three each exceed the budget together.
        let ty = parse_clickhouse_type("Array(Array(Tuple(Tuple())))").unwrap();
        let mut reader = BinaryReader::with_options(&[2u8, 3, 3][..], options);
        assert!(matches!(
            reader.read(&ty),
            Err(CodecError::LengthLimit {
                kind: "Array",
                len: 3,
                max: 1
            })
        ));

        // The budget is per value, not per reader.
        let ty = parse_clickhouse_type("Nested(a Tuple())").unwrap();
        let mut reader = BinaryReader::with_options(&[3u8, 3][..], options);
        assert!(reader.read(&ty).is_ok());
        assert!(reader.read(&ty).is_ok());
    }

    #[test]
    fn hostile_zero_width_lengths_are_rejected() {
        // 2^24 empty tuples from four bytes of input.
        let err = read("Array(Tuple())", &[0x80, 0x80, 0x80, 0x08]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::LengthLimit {
                kind: "Array",
                len: 16_777_216,
                ..
            }
        ));
    }

    #[test]
    fn invalid_utf8_falls_back_to_bytes_or_lossy_text() {
        let bytes = [2u8, 0xff, b'a'];
        assert_eq!(read("String", &bytes).unwrap(), Value::Bytes(vec![0xff, b'a']));

        let ty = parse_clickhouse_type("String").unwrap();
        let options = BinaryOptions {
            utf8_strings: true,
            ..BinaryOptions::default()
        };
        assert_eq!(
            BinaryReader::with_options(&bytes[..], options).read(&ty).unwrap(),
            Value::String("\u{fffd}a".into())
        );
    }
}
