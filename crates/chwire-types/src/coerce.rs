//! Converting loosely typed values to the native shape of a descriptor.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use uuid::Uuid;

use crate::error::TypeError;
use crate::types::{ClickHouseType, DateTime64Type, DateTimeType, DecimalType, TupleType};
use crate::value::{Decimal, Value};

/// Formats accepted for zone-naive date-time text.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A value that cannot be represented by a descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    #[error("cannot convert {value} to {target}")]
    Incompatible { value: String, target: String },

    #[error("{value} is out of range for {target}")]
    OutOfRange { value: String, target: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl CoerceError {
    fn incompatible(value: &Value, target: &ClickHouseType) -> Self {
        CoerceError::Incompatible {
            value: describe(value),
            target: target.to_string(),
        }
    }

    fn out_of_range(value: &Value, target: &ClickHouseType) -> Self {
        CoerceError::OutOfRange {
            value: describe(value),
            target: target.to_string(),
        }
    }
}

fn describe(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > 64 {
        let mut end = 64;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("...");
    }
    format!("{} {text}", value.kind())
}

/// An integer source, kept signed or unsigned so `u128::MAX` and `i128::MIN` both survive.
enum Integer {
    Signed(i128),
    Unsigned(u128),
}

fn integer_of(value: &Value) -> Option<Integer> {
    Some(match value {
        Value::Bool(v) => Integer::Unsigned(u128::from(*v)),
        Value::Int8(v) => Integer::Signed(i128::from(*v)),
        Value::Int16(v) => Integer::Signed(i128::from(*v)),
        Value::Int32(v) => Integer::Signed(i128::from(*v)),
        Value::Int64(v) => Integer::Signed(i128::from(*v)),
        Value::Int128(v) => Integer::Signed(*v),
        Value::UInt8(v) => Integer::Unsigned(u128::from(*v)),
        Value::UInt16(v) => Integer::Unsigned(u128::from(*v)),
        Value::UInt32(v) => Integer::Unsigned(u128::from(*v)),
        Value::UInt64(v) => Integer::Unsigned(u128::from(*v)),
        Value::UInt128(v) => Integer::Unsigned(*v),
        Value::Float32(v) => integral_float(f64::from(*v))?,
        Value::Float64(v) => integral_float(*v)?,
        Value::Decimal(v) => Integer::Signed(v.rescale(0)?.mantissa()),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i128>() {
                Ok(v) => Integer::Signed(v),
                Err(_) => Integer::Unsigned(s.parse::<u128>().ok()?),
            }
        }
        _ => return None,
    })
}

fn integral_float(v: f64) -> Option<Integer> {
    // Only whole numbers inside the i128 range convert.
    if !v.is_finite() || v.fract() != 0.0 || v.abs() >= 1.7e38 {
        return None;
    }
    Some(Integer::Signed(v as i128))
}

fn to_int<T>(value: &Value, target: &ClickHouseType) -> Result<T, CoerceError>
where
    T: TryFrom<i128> + TryFrom<u128>,
{
    let converted = match integer_of(value) {
        Some(Integer::Signed(v)) => <T as TryFrom<i128>>::try_from(v).ok(),
        Some(Integer::Unsigned(v)) => <T as TryFrom<u128>>::try_from(v).ok(),
        None => return Err(CoerceError::incompatible(value, target)),
    };
    converted.ok_or_else(|| CoerceError::out_of_range(value, target))
}

fn to_f64(value: &Value) -> Option<f64> {
    Some(match value {
        Value::Float32(v) => f64::from(*v),
        Value::Float64(v) => *v,
        Value::Decimal(v) => v.to_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        other => match integer_of(other)? {
            Integer::Signed(v) => v as f64,
            Integer::Unsigned(v) => v as f64,
        },
    })
}

fn to_decimal(
    value: &Value,
    ty: &DecimalType,
    target: &ClickHouseType,
) -> Result<Decimal, CoerceError> {
    let source = match value {
        Value::Decimal(v) => *v,
        Value::String(s) => {
            Decimal::from_str(s).map_err(|_| CoerceError::incompatible(value, target))?
        }
        // Floats are inexact to begin with, so they round to the column scale.
        Value::Float32(v) => Decimal::from_f64(f64::from(*v), ty.scale())
            .ok_or_else(|| CoerceError::out_of_range(value, target))?,
        Value::Float64(v) => Decimal::from_f64(*v, ty.scale())
            .ok_or_else(|| CoerceError::out_of_range(value, target))?,
        other => match integer_of(other) {
            Some(Integer::Signed(v)) => Decimal::from_integer(v),
            Some(Integer::Unsigned(v)) => Decimal::from_integer(
                i128::try_from(v).map_err(|_| CoerceError::out_of_range(value, target))?,
            ),
            None => return Err(CoerceError::incompatible(value, target)),
        },
    };
    let rescaled = source
        .rescale(ty.scale())
        .filter(|d| ty.fits(d.mantissa()))
        .ok_or_else(|| CoerceError::out_of_range(value, target))?;
    Ok(rescaled)
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::from_str(s)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Resolve any date/time-like value to an instant, interpreting naive input with `localize`.
fn to_instant(
    value: &Value,
    localize: impl Fn(&NaiveDateTime) -> DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    match value {
        Value::DateTime(v) => Some(*v),
        Value::NaiveDateTime(v) => Some(localize(v)),
        Value::Date(v) => Some(localize(&v.and_time(NaiveTime::MIN))),
        Value::String(s) => match DateTime::parse_from_rfc3339(s.trim()) {
            Ok(fixed) => Some(fixed.with_timezone(&Tz::UTC)),
            Err(_) => parse_naive_datetime(s).map(|naive| localize(&naive)),
        },
        _ => None,
    }
}

fn to_datetime(
    value: &Value,
    ty: &DateTimeType,
    target: &ClickHouseType,
) -> Result<DateTime<Tz>, CoerceError> {
    let instant = match integer_of(value).filter(|_| !matches!(value, Value::String(_))) {
        Some(Integer::Signed(v)) => i64::try_from(v).ok().and_then(|s| ty.from_unix_seconds(s)),
        Some(Integer::Unsigned(v)) => i64::try_from(v).ok().and_then(|s| ty.from_unix_seconds(s)),
        None => to_instant(value, |naive| ty.localize(naive)),
    }
    .ok_or_else(|| CoerceError::incompatible(value, target))?;
    if u32::try_from(instant.timestamp()).is_err() {
        return Err(CoerceError::out_of_range(value, target));
    }
    Ok(instant.with_timezone(&ty.effective_zone()))
}

fn to_datetime64(
    value: &Value,
    ty: &DateTime64Type,
    target: &ClickHouseType,
) -> Result<DateTime<Tz>, CoerceError> {
    let instant = match integer_of(value).filter(|_| !matches!(value, Value::String(_))) {
        Some(Integer::Signed(v)) => i64::try_from(v).ok().and_then(|t| ty.from_ticks(t)),
        Some(Integer::Unsigned(v)) => i64::try_from(v).ok().and_then(|t| ty.from_ticks(t)),
        None => to_instant(value, |naive| ty.localize(naive)),
    }
    .ok_or_else(|| CoerceError::incompatible(value, target))?;
    if ty.to_ticks(&instant).is_none() {
        return Err(CoerceError::out_of_range(value, target));
    }
    Ok(instant.with_timezone(&ty.effective_zone()))
}

fn to_date(value: &Value, target: &ClickHouseType) -> Result<NaiveDate, CoerceError> {
    let date = match value {
        Value::Date(v) => *v,
        Value::DateTime(v) => v.date_naive(),
        Value::NaiveDateTime(v) => v.date(),
        Value::String(s) => parse_naive_datetime(s)
            .map(|naive| naive.date())
            .ok_or_else(|| CoerceError::incompatible(value, target))?,
        _ => return Err(CoerceError::incompatible(value, target)),
    };
    let days = days_since_epoch(date);
    let in_range = match target {
        ClickHouseType::Date => u16::try_from(days).is_ok(),
        _ => i32::try_from(days).is_ok(),
    };
    if !in_range {
        return Err(CoerceError::out_of_range(value, target));
    }
    Ok(date)
}

/// Days between the Unix epoch and `date` (negative before 1970).
pub fn days_since_epoch(date: NaiveDate) -> i64 {
    date.signed_duration_since(DateTime::<Utc>::UNIX_EPOCH.date_naive())
        .num_days()
}

fn to_bytes(value: Value, length: usize, target: &ClickHouseType) -> Result<Value, CoerceError> {
    let mut bytes = match value {
        Value::Bytes(bytes) => bytes,
        Value::String(s) => s.into_bytes(),
        other => return Err(CoerceError::incompatible(&other, target)),
    };
    if bytes.len() > length {
        return Err(CoerceError::out_of_range(&Value::Bytes(bytes), target));
    }
    bytes.resize(length, 0);
    Ok(Value::Bytes(bytes))
}

fn coerce_row(items: Vec<Value>, row: &TupleType) -> Result<Value, CoerceError> {
    if items.len() != row.len() {
        return Err(TypeError::TupleArityMismatch {
            expected: row.len(),
            actual: items.len(),
        }
        .into());
    }
    let items = items
        .into_iter()
        .zip(row.types())
        .map(|(item, ty)| item.coerce_to(ty))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Tuple(items))
}

impl Value {
    /// Convert this value to the native shape `ty` reads and writes.
    ///
    /// Integer conversions are range checked; floats convert to integers only when integral;
    /// decimals rescale exactly (extra non-zero fraction digits are rejected); text parses into
    /// numbers, UUIDs, addresses, dates and times; enum names and codes are validated against
    /// the enum. Composite values are converted element by element.
    pub fn coerce_to(self, ty: &ClickHouseType) -> Result<Value, CoerceError> {
        let target = ty.logical();
        if self.is_null() {
            return match target {
                ClickHouseType::Nullable(_) => Ok(Value::Null),
                ClickHouseType::Nothing => Ok(Value::Nothing),
                _ => Err(CoerceError::incompatible(&self, target)),
            };
        }

        Ok(match target {
            ClickHouseType::Nothing => match self {
                Value::Nothing => Value::Nothing,
                other => return Err(CoerceError::incompatible(&other, target)),
            },
            ClickHouseType::Bool => match &self {
                Value::Bool(v) => Value::Bool(*v),
                Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Value::Bool(true),
                Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Value::Bool(false),
                other => match to_int::<u8>(other, target)? {
                    0 => Value::Bool(false),
                    1 => Value::Bool(true),
                    _ => return Err(CoerceError::out_of_range(other, target)),
                },
            },
            ClickHouseType::Int8 => Value::Int8(to_int(&self, target)?),
            ClickHouseType::Int16 => Value::Int16(to_int(&self, target)?),
            ClickHouseType::Int32 => Value::Int32(to_int(&self, target)?),
            ClickHouseType::Int64 => Value::Int64(to_int(&self, target)?),
            ClickHouseType::Int128 => Value::Int128(to_int(&self, target)?),
            ClickHouseType::UInt8 => Value::UInt8(to_int(&self, target)?),
            ClickHouseType::UInt16 => Value::UInt16(to_int(&self, target)?),
            ClickHouseType::UInt32 => Value::UInt32(to_int(&self, target)?),
            ClickHouseType::UInt64 => Value::UInt64(to_int(&self, target)?),
            ClickHouseType::UInt128 => Value::UInt128(to_int(&self, target)?),
            ClickHouseType::Float32 => match to_f64(&self) {
                Some(v) => Value::Float32(v as f32),
                None => return Err(CoerceError::incompatible(&self, target)),
            },
            ClickHouseType::Float64 => match to_f64(&self) {
                Some(v) => Value::Float64(v),
                None => return Err(CoerceError::incompatible(&self, target)),
            },
            ClickHouseType::Decimal(dec) => Value::Decimal(to_decimal(&self, dec, target)?),
            ClickHouseType::String => match self {
                Value::String(s) => Value::String(s),
                // String columns hold arbitrary bytes.
                Value::Bytes(bytes) => match String::from_utf8(bytes) {
                    Ok(s) => Value::String(s),
                    Err(err) => Value::Bytes(err.into_bytes()),
                },
                other => return Err(CoerceError::incompatible(&other, target)),
            },
            ClickHouseType::FixedString(fixed) => to_bytes(self, fixed.length(), target)?,
            ClickHouseType::Uuid => match &self {
                Value::Uuid(v) => Value::Uuid(*v),
                Value::String(s) => Value::Uuid(
                    Uuid::parse_str(s.trim())
                        .map_err(|_| CoerceError::incompatible(&self, target))?,
                ),
                Value::Bytes(bytes) => Value::Uuid(
                    Uuid::from_slice(bytes)
                        .map_err(|_| CoerceError::incompatible(&self, target))?,
                ),
                other => return Err(CoerceError::incompatible(other, target)),
            },
            ClickHouseType::IPv4 => match &self {
                Value::Ipv4(v) => Value::Ipv4(*v),
                Value::String(s) => Value::Ipv4(
                    Ipv4Addr::from_str(s.trim())
                        .map_err(|_| CoerceError::incompatible(&self, target))?,
                ),
                Value::UInt32(v) => Value::Ipv4(Ipv4Addr::from(*v)),
                other => return Err(CoerceError::incompatible(other, target)),
            },
            ClickHouseType::IPv6 => match &self {
                Value::Ipv6(v) => Value::Ipv6(*v),
                Value::Ipv4(v) => Value::Ipv6(v.to_ipv6_mapped()),
                Value::String(s) => Value::Ipv6(
                    Ipv6Addr::from_str(s.trim())
                        .map_err(|_| CoerceError::incompatible(&self, target))?,
                ),
                other => return Err(CoerceError::incompatible(other, target)),
            },
            ClickHouseType::Date | ClickHouseType::Date32 => Value::Date(to_date(&self, target)?),
            ClickHouseType::DateTime(dt) => Value::DateTime(to_datetime(&self, dt, target)?),
            ClickHouseType::DateTime64(dt) => Value::DateTime(to_datetime64(&self, dt, target)?),
            ClickHouseType::Enum8(en) | ClickHouseType::Enum16(en) => match &self {
                Value::String(name) => {
                    en.code_of(name)?;
                    Value::String(name.clone())
                }
                other => {
                    let code = to_int::<i16>(other, target)?;
                    Value::String(en.name_of(code)?.to_string())
                }
            },
            ClickHouseType::Nullable(nullable) => self.coerce_to(nullable.inner())?,
            ClickHouseType::Array(array) => match self {
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| item.coerce_to(array.element()))
                        .collect::<Result<_, _>>()?,
                ),
                other => return Err(CoerceError::incompatible(&other, target)),
            },
            ClickHouseType::Tuple(tuple) => match self {
                Value::Tuple(items) => coerce_row(items, tuple)?,
                other => return Err(CoerceError::incompatible(&other, target)),
            },
            ClickHouseType::Nested(nested) => match self {
                Value::Array(rows) => Value::Array(
                    rows.into_iter()
                        .map(|row| match row {
                            Value::Tuple(items) => coerce_row(items, nested.row()),
                            other => Err(CoerceError::incompatible(&other, target)),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                other => return Err(CoerceError::incompatible(&other, target)),
            },
            ClickHouseType::Map(map) => match self {
                Value::Map(pairs) => Value::Map(
                    pairs
                        .into_iter()
                        .map(|(k, v)| Ok((k.coerce_to(map.key())?, v.coerce_to(map.value())?)))
                        .collect::<Result<_, CoerceError>>()?,
                ),
                other => return Err(CoerceError::incompatible(&other, target)),
            },
            // `logical()` already stripped these wrappers.
            ClickHouseType::LowCardinality(_) | ClickHouseType::SimpleAggregateFunction(_) => {
                return Err(CoerceError::incompatible(&self, target))
            }
        })
    }
}
