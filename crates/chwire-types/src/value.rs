use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use thiserror::Error;
use uuid::Uuid;

/// Largest decimal scale representable with an `i128` mantissa.
pub const MAX_DECIMAL_SCALE: u32 = 38;

pub(crate) fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

/// Exact fixed-point decimal: `mantissa * 10^-scale`.
///
/// Equality is structural (`1.0` and `1.00` differ); use [`Decimal::rescale`] to compare values
/// at a common scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal {0:?}")]
pub struct ParseDecimalError(pub String);

impl Decimal {
    /// Returns `None` when `scale` exceeds [`MAX_DECIMAL_SCALE`].
    pub const fn new(mantissa: i128, scale: u32) -> Option<Self> {
        if scale > MAX_DECIMAL_SCALE {
            None
        } else {
            Some(Self { mantissa, scale })
        }
    }

    pub const fn from_integer(value: i128) -> Self {
        Self {
            mantissa: value,
            scale: 0,
        }
    }

    pub const fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub const fn scale(&self) -> u32 {
        self.scale
    }

    /// Change the scale without losing information.
    ///
    /// Returns `None` if the mantissa overflows or if dropping fraction digits would discard
    /// non-zero digits.
    pub fn rescale(&self, scale: u32) -> Option<Self> {
        if scale > MAX_DECIMAL_SCALE {
            return None;
        }
        let mantissa = if scale >= self.scale {
            self.mantissa.checked_mul(pow10(scale - self.scale)?)?
        } else {
            let divisor = pow10(self.scale - scale)?;
            if self.mantissa % divisor != 0 {
                return None;
            }
            self.mantissa / divisor
        };
        Some(Self { mantissa, scale })
    }

    /// Round half away from zero to `scale` fraction digits.
    pub fn from_f64(value: f64, scale: u32) -> Option<Self> {
        if !value.is_finite() || scale > MAX_DECIMAL_SCALE {
            return None;
        }
        let scaled = (value * 10f64.powi(scale as i32)).round();
        // i128::MAX is ~1.7e38; anything at or beyond that cannot be represented.
        if scaled.abs() >= 1.7e38 {
            return None;
        }
        Some(Self {
            mantissa: scaled as i128,
            scale,
        })
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }

    /// Number of significant digits in the mantissa (zero has one digit).
    pub fn digits(&self) -> u32 {
        let mut n = self.mantissa.unsigned_abs();
        let mut digits = 1;
        while n >= 10 {
            n /= 10;
            digits += 1;
        }
        digits
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        if self.mantissa < 0 {
            f.write_str("-")?;
        }
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() <= scale {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        } else {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{int_part}.{frac_part}")
        }
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());
        let trimmed = s.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| err())?;
        if scale > MAX_DECIMAL_SCALE {
            return Err(err());
        }
        let mut mantissa: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(b - b'0')))
                .ok_or_else(err)?;
        }
        if negative {
            mantissa = -mantissa;
        }
        Ok(Self { mantissa, scale })
    }
}

/// Dynamically typed native value moved through the read/write visitors.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value of a `Nullable` column.
    Null,
    /// The single value of the `Nothing` type.
    Nothing,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    String(String),
    /// Raw bytes: `FixedString` payloads and `String` payloads that are not UTF-8.
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Date(NaiveDate),
    /// Zone-aware instant.
    DateTime(DateTime<Tz>),
    /// Zone-naive local time, interpreted in the column's zone on write.
    NaiveDateTime(NaiveDateTime),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Nothing => "Nothing",
            Value::Bool(_) => "Bool",
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Int128(_) => "Int128",
            Value::UInt8(_) => "UInt8",
            Value::UInt16(_) => "UInt16",
            Value::UInt32(_) => "UInt32",
            Value::UInt64(_) => "UInt64",
            Value::UInt128(_) => "UInt128",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Decimal(_) => "Decimal",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Uuid(_) => "UUID",
            Value::Ipv4(_) => "IPv4",
            Value::Ipv6(_) => "IPv6",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::NaiveDateTime(_) => "NaiveDateTime",
            Value::Array(_) => "Array",
            Value::Tuple(_) => "Tuple",
            Value::Map(_) => "Map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
            f.write_str(open)?;
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str(close)
        }

        match self {
            Value::Null => f.write_str("NULL"),
            Value::Nothing => f.write_str("nothing"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Int128(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::UInt128(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{}", crate::grammar::quote(v)),
            Value::Bytes(v) => {
                f.write_str("x'")?;
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                f.write_str("'")
            }
            Value::Uuid(v) => write!(f, "'{v}'"),
            Value::Ipv4(v) => write!(f, "'{v}'"),
            Value::Ipv6(v) => write!(f, "'{v}'"),
            Value::Date(v) => write!(f, "'{v}'"),
            Value::DateTime(v) => write!(f, "'{}'", v.to_rfc3339()),
            Value::NaiveDateTime(v) => write!(f, "'{v}'"),
            Value::Array(items) => list(f, "[", items, "]"),
            Value::Tuple(items) => list(f, "(", items, ")"),
            Value::Map(pairs) => {
                f.write_str("{")?;
                for (idx, (k, v)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_value!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Int128,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    u128 => UInt128,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
    String => String,
    Uuid => Uuid,
    Ipv4Addr => Ipv4,
    Ipv6Addr => Ipv6,
    NaiveDate => Date,
    DateTime<Tz> => DateTime,
    NaiveDateTime => NaiveDateTime,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_display() {
        assert_eq!(Decimal::new(12345, 2).unwrap().to_string(), "123.45");
        assert_eq!(Decimal::new(-5, 3).unwrap().to_string(), "-0.005");
        assert_eq!(Decimal::new(7, 0).unwrap().to_string(), "7");
        assert_eq!(Decimal::new(0, 2).unwrap().to_string(), "0.00");
    }

    #[test]
    fn decimal_parse() {
        let d: Decimal = "-123.4500".parse().unwrap();
        assert_eq!((d.mantissa(), d.scale()), (-1234500, 4));
        let d: Decimal = ".5".parse().unwrap();
        assert_eq!((d.mantissa(), d.scale()), (5, 1));
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
        assert!("abc".parse::<Decimal>().is_err());
    }

    #[test]
    fn decimal_rescale_is_exact() {
        let d = Decimal::new(1250, 3).unwrap(); // 1.250
        assert_eq!(d.rescale(2), Decimal::new(125, 2));
        assert_eq!(d.rescale(5), Decimal::new(125000, 5));
        assert_eq!(Decimal::new(1255, 3).unwrap().rescale(2), None);
    }

    #[test]
    fn decimal_from_f64_rounds() {
        assert_eq!(Decimal::from_f64(1.005, 1), Decimal::new(10, 1));
        assert_eq!(Decimal::from_f64(-2.5, 0), Decimal::new(-3, 0));
        assert_eq!(Decimal::from_f64(f64::NAN, 2), None);
    }

    #[test]
    fn value_display_nests() {
        let v = Value::Tuple(vec![
            Value::from(1i32),
            Value::from("a'b"),
            Value::Array(vec![Value::Null, Value::from(2u8)]),
        ]);
        assert_eq!(v.to_string(), r"(1, 'a\'b', [NULL, 2])");
    }
}
