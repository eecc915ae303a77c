//! Structural description of the in-memory (Rust) representation of each wire type.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::value::Decimal;

/// Tuples up to this arity map to a fixed Rust tuple; wider ones fall back to [`NativeType::Row`].
pub const MAX_FIXED_TUPLE_ARITY: usize = 7;

/// Shape of a native value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeType {
    Unit,
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Decimal,
    String,
    Bytes,
    Uuid,
    Ipv4Addr,
    Ipv6Addr,
    Date,
    DateTime,
    NaiveDateTime,
    Array(Box<NativeType>),
    Optional(Box<NativeType>),
    /// Fixed tuple of at most [`MAX_FIXED_TUPLE_ARITY`] elements.
    Tuple(Vec<NativeType>),
    /// Variable-arity row used for tuples wider than [`MAX_FIXED_TUPLE_ARITY`].
    Row(Vec<NativeType>),
    Map(Box<NativeType>, Box<NativeType>),
}

impl NativeType {
    pub fn array_of(element: NativeType) -> Self {
        NativeType::Array(Box::new(element))
    }

    /// Wrap in `Option`, unless the type is already optional.
    pub fn optional_of(inner: NativeType) -> Self {
        match inner {
            NativeType::Optional(_) => inner,
            other => NativeType::Optional(Box::new(other)),
        }
    }

    pub fn tuple_of(elements: Vec<NativeType>) -> Self {
        if elements.len() <= MAX_FIXED_TUPLE_ARITY {
            NativeType::Tuple(elements)
        } else {
            NativeType::Row(elements)
        }
    }

    pub fn map_of(key: NativeType, value: NativeType) -> Self {
        NativeType::Map(Box::new(key), Box::new(value))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, NativeType::Optional(_))
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[NativeType]) -> fmt::Result {
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            NativeType::Unit => f.write_str("()"),
            NativeType::Bool => f.write_str("bool"),
            NativeType::I8 => f.write_str("i8"),
            NativeType::I16 => f.write_str("i16"),
            NativeType::I32 => f.write_str("i32"),
            NativeType::I64 => f.write_str("i64"),
            NativeType::I128 => f.write_str("i128"),
            NativeType::U8 => f.write_str("u8"),
            NativeType::U16 => f.write_str("u16"),
            NativeType::U32 => f.write_str("u32"),
            NativeType::U64 => f.write_str("u64"),
            NativeType::U128 => f.write_str("u128"),
            NativeType::F32 => f.write_str("f32"),
            NativeType::F64 => f.write_str("f64"),
            NativeType::Decimal => f.write_str("Decimal"),
            NativeType::String => f.write_str("String"),
            NativeType::Bytes => f.write_str("Bytes"),
            NativeType::Uuid => f.write_str("Uuid"),
            NativeType::Ipv4Addr => f.write_str("Ipv4Addr"),
            NativeType::Ipv6Addr => f.write_str("Ipv6Addr"),
            NativeType::Date => f.write_str("NaiveDate"),
            NativeType::DateTime => f.write_str("DateTime<Tz>"),
            NativeType::NaiveDateTime => f.write_str("NaiveDateTime"),
            NativeType::Array(inner) => write!(f, "Vec<{inner}>"),
            NativeType::Optional(inner) => write!(f, "Option<{inner}>"),
            NativeType::Tuple(items) => {
                f.write_str("(")?;
                join(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            NativeType::Row(items) => {
                f.write_str("Row<")?;
                join(f, items)?;
                f.write_str(">")
            }
            NativeType::Map(key, value) => write!(f, "Map<{key}, {value}>"),
        }
    }
}

/// Rust types with a known native shape, used to infer a ClickHouse type from a type parameter.
pub trait NativeTyped {
    fn native_type() -> NativeType;
}

macro_rules! impl_native_typed {
    ($($ty:ty => $native:ident),* $(,)?) => {
        $(
            impl NativeTyped for $ty {
                fn native_type() -> NativeType {
                    NativeType::$native
                }
            }
        )*
    };
}

impl_native_typed!(
    () => Unit,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    String => String,
    str => String,
    Uuid => Uuid,
    Ipv4Addr => Ipv4Addr,
    Ipv6Addr => Ipv6Addr,
    NaiveDate => Date,
    DateTime<Tz> => DateTime,
    DateTime<Utc> => DateTime,
    NaiveDateTime => NaiveDateTime,
);

impl<T: NativeTyped + ?Sized> NativeTyped for &T {
    fn native_type() -> NativeType {
        T::native_type()
    }
}

impl<T: NativeTyped> NativeTyped for Vec<T> {
    fn native_type() -> NativeType {
        NativeType::array_of(T::native_type())
    }
}

impl<T: NativeTyped> NativeTyped for [T] {
    fn native_type() -> NativeType {
        NativeType::array_of(T::native_type())
    }
}

impl<T: NativeTyped> NativeTyped for Option<T> {
    fn native_type() -> NativeType {
        NativeType::optional_of(T::native_type())
    }
}

impl<K: NativeTyped, V: NativeTyped> NativeTyped for HashMap<K, V> {
    fn native_type() -> NativeType {
        NativeType::map_of(K::native_type(), V::native_type())
    }
}

impl<K: NativeTyped, V: NativeTyped> NativeTyped for BTreeMap<K, V> {
    fn native_type() -> NativeType {
        NativeType::map_of(K::native_type(), V::native_type())
    }
}

macro_rules! impl_native_typed_tuple {
    ($($name:ident),+) => {
        impl<$($name: NativeTyped),+> NativeTyped for ($($name,)+) {
            fn native_type() -> NativeType {
                NativeType::tuple_of(vec![$($name::native_type()),+])
            }
        }
    };
}

impl_native_typed_tuple!(A);
impl_native_typed_tuple!(A, B);
impl_native_typed_tuple!(A, B, C);
impl_native_typed_tuple!(A, B, C, D);
impl_native_typed_tuple!(A, B, C, D, E);
impl_native_typed_tuple!(A, B, C, D, E, F);
impl_native_typed_tuple!(A, B, C, D, E, F, G);
