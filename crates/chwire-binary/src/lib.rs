//! RowBinary codec for ClickHouse values.
//!
//! [`BinaryReader`] and [`BinaryWriter`] implement the `chwire-types` visitor traits, so any
//! descriptor produced by [`chwire_types::parse_clickhouse_type`] can be decoded or encoded
//! without this crate knowing about individual composite shapes.
//!
//! Layout summary:
//! - fixed-width numbers, dates and times are little-endian
//! - `String`, `Array`, `Nested` and `Map` carry an unsigned LEB128 length prefix
//! - `Nullable` prefixes one flag byte (`1` = null)
//! - `LowCardinality` and `SimpleAggregateFunction` are encoded exactly like their inner type

mod error;
mod options;
mod reader;
mod varint;
mod writer;

pub use error::CodecError;
pub use options::BinaryOptions;
pub use reader::BinaryReader;
pub use varint::{read_varint, write_varint};
pub use writer::BinaryWriter;

use chwire_types::{ClickHouseType, TypeError, Value};

/// Decode exactly one value from `bytes`.
pub fn read_value(bytes: &[u8], ty: &ClickHouseType) -> Result<Value, CodecError> {
    read_value_with(bytes, ty, BinaryOptions::default())
}

pub fn read_value_with(
    bytes: &[u8],
    ty: &ClickHouseType,
    options: BinaryOptions,
) -> Result<Value, CodecError> {
    let mut reader = BinaryReader::with_options(bytes, options);
    let value = reader.read(ty)?;
    let rest = reader.get_ref().len();
    if rest > 0 {
        return Err(CodecError::TrailingBytes { count: rest });
    }
    Ok(value)
}

/// Encode one value, converting it to the descriptor's native shape first.
pub fn write_value(ty: &ClickHouseType, value: &Value) -> Result<Vec<u8>, CodecError> {
    let value = value.clone().coerce_to(ty)?;
    let mut writer = BinaryWriter::new(Vec::new());
    writer.write(ty, &value)?;
    Ok(writer.into_inner())
}

/// Decode rows of `columns` until `bytes` is exhausted.
pub fn read_rows(bytes: &[u8], columns: &[ClickHouseType]) -> Result<Vec<Vec<Value>>, CodecError> {
    let mut reader = BinaryReader::new(bytes);
    let mut rows = Vec::new();
    while !reader.get_ref().is_empty() {
        let before = reader.get_ref().len();
        let row = columns
            .iter()
            .map(|column| reader.read(column))
            .collect::<Result<Vec<_>, _>>()?;
        // Rows of zero-width columns (or no columns) cannot account for the remaining input.
        if reader.get_ref().len() == before {
            return Err(CodecError::TrailingBytes { count: before });
        }
        rows.push(row);
    }
    log::debug!("decoded {} rows of {} columns", rows.len(), columns.len());
    Ok(rows)
}

/// Encode `rows`, each holding one value per column.
pub fn write_rows(columns: &[ClickHouseType], rows: &[Vec<Value>]) -> Result<Vec<u8>, CodecError> {
    let mut writer = BinaryWriter::new(Vec::new());
    for row in rows {
        if row.len() != columns.len() {
            return Err(TypeError::TupleArityMismatch {
                expected: columns.len(),
                actual: row.len(),
            }
            .into());
        }
        for (column, value) in columns.iter().zip(row) {
            let value = value.clone().coerce_to(column)?;
            writer.write(column, &value)?;
        }
    }
    log::debug!("encoded {} rows of {} columns", rows.len(), columns.len());
    Ok(writer.into_inner())
}
