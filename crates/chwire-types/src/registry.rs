//! Signature ↔ descriptor resolution.
//!
//! The registry holds three lookup tables, all built once and read-only afterwards:
//!
//! - parameterless [`TypeCode`]s → cached descriptors,
//! - parameterized type names → [`ParseFn`]s,
//! - scalar [`NativeType`]s → descriptors (used by [`to_clickhouse_type`]).
//!
//! The process-wide instance behind the free functions is created lazily on first use.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use crate::error::TypeError;
use crate::grammar::{parse_signature, SyntaxTreeNode};
use crate::native::{NativeType, NativeTyped};
use crate::type_code::TypeCode;
use crate::types::{
    ArrayType, ClickHouseType, DateTime64Type, DateTimeType, DecimalType, EnumType,
    FixedStringType, LowCardinalityType, MapType, NestedType, NullableType, ParseContext, ParseFn,
    SimpleAggregateFunctionType, TupleType,
};
use crate::zone::{TzDatabase, ZoneDatabase};

/// Precision and scale used when a bare native `Decimal` has to pick a column type.
pub const DEFAULT_NATIVE_DECIMAL: (u32, u32) = (38, 18);

const PARAMETERIZED: &[(&str, ParseFn)] = &[
    ("Decimal", DecimalType::parse),
    ("Decimal32", DecimalType::parse_decimal32),
    ("Decimal64", DecimalType::parse_decimal64),
    ("Decimal128", DecimalType::parse_decimal128),
    ("FixedString", FixedStringType::parse),
    ("DateTime", DateTimeType::parse),
    ("DateTime64", DateTime64Type::parse),
    ("Enum", EnumType::parse_enum),
    ("Enum8", EnumType::parse_enum8),
    ("Enum16", EnumType::parse_enum16),
    ("Array", ArrayType::parse),
    ("Nullable", NullableType::parse),
    ("LowCardinality", LowCardinalityType::parse),
    ("Tuple", TupleType::parse),
    ("Nested", NestedType::parse),
    ("Map", MapType::parse),
    ("SimpleAggregateFunction", SimpleAggregateFunctionType::parse),
];

/// Lookup tables for resolving signatures and native types.
pub struct TypeRegistry {
    simple: HashMap<TypeCode, ClickHouseType>,
    parameterized: HashMap<&'static str, ParseFn>,
    reverse: HashMap<NativeType, ClickHouseType>,
    zones: Box<dyn ZoneDatabase>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("simple", &self.simple.len())
            .field("parameterized", &self.parameterized.len())
            .field("reverse", &self.reverse.len())
            .finish_non_exhaustive()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry resolving time zones through the compiled-in `chrono-tz` database.
    pub fn new() -> Self {
        Self::with_zone_database(TzDatabase)
    }

    pub fn with_zone_database(zones: impl ZoneDatabase + 'static) -> Self {
        let simple: HashMap<TypeCode, ClickHouseType> = TypeCode::ALL
            .iter()
            .filter(|code| code.is_simple())
            .filter_map(|&code| Some((code, ClickHouseType::simple(code)?)))
            .collect();

        let parameterized: HashMap<&'static str, ParseFn> = PARAMETERIZED.iter().copied().collect();

        let (precision, scale) = DEFAULT_NATIVE_DECIMAL;
        let mut reverse = HashMap::new();
        for (native, ty) in [
            (NativeType::Unit, ClickHouseType::Nothing),
            (NativeType::Bool, ClickHouseType::Bool),
            (NativeType::I8, ClickHouseType::Int8),
            (NativeType::I16, ClickHouseType::Int16),
            (NativeType::I32, ClickHouseType::Int32),
            (NativeType::I64, ClickHouseType::Int64),
            (NativeType::I128, ClickHouseType::Int128),
            (NativeType::U8, ClickHouseType::UInt8),
            (NativeType::U16, ClickHouseType::UInt16),
            (NativeType::U32, ClickHouseType::UInt32),
            (NativeType::U64, ClickHouseType::UInt64),
            (NativeType::U128, ClickHouseType::UInt128),
            (NativeType::F32, ClickHouseType::Float32),
            (NativeType::F64, ClickHouseType::Float64),
            (NativeType::String, ClickHouseType::String),
            (NativeType::Bytes, ClickHouseType::String),
            (NativeType::Uuid, ClickHouseType::Uuid),
            (NativeType::Ipv4Addr, ClickHouseType::IPv4),
            (NativeType::Ipv6Addr, ClickHouseType::IPv6),
            (NativeType::Date, ClickHouseType::Date),
            (
                NativeType::DateTime,
                ClickHouseType::DateTime(DateTimeType::default()),
            ),
            (
                NativeType::NaiveDateTime,
                ClickHouseType::DateTime(DateTimeType::default()),
            ),
        ] {
            let prev = reverse.insert(native, ty);
            debug_assert!(prev.is_none(), "duplicate reverse mapping");
        }
        if let Ok(decimal) = DecimalType::new(precision, scale) {
            reverse.insert(NativeType::Decimal, ClickHouseType::Decimal(decimal));
        }

        log::debug!(
            "type registry initialized: {} simple, {} parameterized, {} native mappings",
            simple.len(),
            parameterized.len(),
            reverse.len()
        );

        Self {
            simple,
            parameterized,
            reverse,
            zones: Box::new(zones),
        }
    }

    /// Parse a signature such as `Array(Nullable(Decimal(9, 2)))`.
    pub fn parse(&self, signature: &str) -> Result<ClickHouseType, TypeError> {
        let tree = parse_signature(signature)?;
        self.resolve(&tree)
    }

    /// Resolve an already parsed signature tree.
    pub fn resolve(&self, node: &SyntaxTreeNode) -> Result<ClickHouseType, TypeError> {
        if !node.has_children() {
            if let Some(ty) = node
                .value
                .parse::<TypeCode>()
                .ok()
                .and_then(|code| self.simple.get(&code))
            {
                return Ok(ty.clone());
            }
        }

        let Some(parse) = self.parameterized.get(node.value.as_str()) else {
            return Err(TypeError::UnknownType {
                name: node.value.clone(),
            });
        };
        let resolver = |child: &SyntaxTreeNode| self.resolve(child);
        let ctx = ParseContext::new(&resolver, self.zones.as_ref());
        parse(node, &ctx)
    }

    /// The cached descriptor for a parameterless code.
    pub fn simple_type(&self, code: TypeCode) -> Option<&ClickHouseType> {
        self.simple.get(&code)
    }

    /// Pick the column type a native value shape maps to.
    pub fn to_clickhouse_type(&self, native: &NativeType) -> Result<ClickHouseType, TypeError> {
        if let Some(ty) = self.reverse.get(native) {
            return Ok(ty.clone());
        }
        match native {
            NativeType::Array(element) => Ok(ClickHouseType::Array(ArrayType::new(
                self.to_clickhouse_type(element)?,
            ))),
            NativeType::Optional(inner) => Ok(ClickHouseType::Nullable(NullableType::new(
                self.to_clickhouse_type(inner)?,
            ))),
            NativeType::Tuple(elements) | NativeType::Row(elements) => {
                let types = elements
                    .iter()
                    .map(|element| self.to_clickhouse_type(element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ClickHouseType::Tuple(TupleType::new(types)))
            }
            NativeType::Map(key, value) => {
                if !is_map_key(key) {
                    return Err(TypeError::UnsupportedNativeType(native.to_string()));
                }
                Ok(ClickHouseType::Map(MapType::new(
                    self.to_clickhouse_type(key)?,
                    self.to_clickhouse_type(value)?,
                )))
            }
            other => Err(TypeError::UnsupportedNativeType(other.to_string())),
        }
    }

    /// Every code the registry can produce, in declaration order.
    pub fn registered_types(&self) -> Vec<TypeCode> {
        let mut codes: BTreeSet<TypeCode> = self.simple.keys().copied().collect();
        codes.extend(
            self.parameterized
                .keys()
                .filter_map(|name| name.parse::<TypeCode>().ok()),
        );
        codes.into_iter().collect()
    }
}

/// ClickHouse only accepts scalar, non-floating keys in `Map`.
fn is_map_key(native: &NativeType) -> bool {
    !matches!(
        native,
        NativeType::F32
            | NativeType::F64
            | NativeType::Optional(_)
            | NativeType::Array(_)
            | NativeType::Tuple(_)
            | NativeType::Row(_)
            | NativeType::Map(_, _)
    )
}

static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// The process-wide registry.
pub fn registry() -> &'static TypeRegistry {
    REGISTRY.get_or_init(TypeRegistry::new)
}

pub fn parse_clickhouse_type(signature: &str) -> Result<ClickHouseType, TypeError> {
    registry().parse(signature)
}

pub fn to_clickhouse_type(native: &NativeType) -> Result<ClickHouseType, TypeError> {
    registry().to_clickhouse_type(native)
}

/// Column type for the Rust type `T`, e.g. `Vec<Option<i32>>` → `Array(Nullable(Int32))`.
pub fn clickhouse_type_of<T: NativeTyped + ?Sized>() -> Result<ClickHouseType, TypeError> {
    to_clickhouse_type(&T::native_type())
}

pub fn registered_types() -> Vec<TypeCode> {
    registry().registered_types()
}
