//! ClickHouse column type descriptors.
//!
//! This crate turns type signatures such as `Array(Nullable(Decimal(9, 2)))` into immutable
//! descriptors and back:
//! - [`parse_signature`]: recursive-descent parser producing a [`SyntaxTreeNode`] tree
//! - [`parse_clickhouse_type`]: signature text → [`ClickHouseType`] through the process-wide
//!   [`TypeRegistry`]
//! - [`to_clickhouse_type`] / [`clickhouse_type_of`]: native (Rust) shape → descriptor
//! - [`TypeReader`] / [`TypeWriter`]: visitor traits a wire codec implements once; descriptors
//!   dispatch to them via [`ClickHouseType::accept_read`] and [`ClickHouseType::accept_write`]
//!
//! Descriptors print their canonical signature with `Display`, so
//! `parse_clickhouse_type(&ty.to_string()) == Ok(ty)` holds for every descriptor the parser
//! produces.
//!
//! Time zones named in `DateTime('...')` are looked up through a [`ZoneDatabase`]; names it does
//! not know resolve to UTC (logged once per name) rather than failing the parse.

mod coerce;
mod error;
mod grammar;
mod native;
mod registry;
mod type_code;
pub mod types;
mod value;
mod visitor;
mod zone;

pub use coerce::{days_since_epoch, CoerceError};
pub use error::TypeError;
pub use grammar::{parse_signature, quote, unquote, ParseError, SyntaxTreeNode, MAX_SIGNATURE_DEPTH};
pub use native::{NativeType, NativeTyped, MAX_FIXED_TUPLE_ARITY};
pub use registry::{
    clickhouse_type_of, parse_clickhouse_type, registered_types, registry, to_clickhouse_type,
    TypeRegistry, DEFAULT_NATIVE_DECIMAL,
};
pub use type_code::{TypeCode, UnknownTypeCode};
pub use types::ClickHouseType;
pub use value::{Decimal, ParseDecimalError, Value, MAX_DECIMAL_SCALE};
pub use visitor::{TypeReader, TypeWriter};
pub use zone::{resolve_local, resolve_zone, TzDatabase, ZoneDatabase};

// Re-exported so downstream crates name the same zone type.
pub use chrono_tz::Tz;
