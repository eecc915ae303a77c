//! JSON view of [`Value`]s.
//!
//! Output follows ClickHouse's `JSONEachRow` conventions where they are unambiguous: 128-bit
//! integers and decimals are strings, dates and times are `YYYY-MM-DD hh:mm:ss[.fff]` text in
//! the column's zone. Input is shaped by the target descriptor and then left to
//! [`Value::coerce_to`], so `"42"`, `42` and `42.0` all encode into an `Int32` column.

use anyhow::{bail, Result};
use chwire_types::types::TupleType;
use chwire_types::{ClickHouseType, Value};
use serde_json::{Map, Number, Value as Json};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Render a decoded value as JSON.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null | Value::Nothing => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int8(v) => Json::from(*v),
        Value::Int16(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) => Json::from(*v),
        Value::UInt8(v) => Json::from(*v),
        Value::UInt16(v) => Json::from(*v),
        Value::UInt32(v) => Json::from(*v),
        Value::UInt64(v) => Json::from(*v),
        Value::Int128(v) => Json::String(v.to_string()),
        Value::UInt128(v) => Json::String(v.to_string()),
        Value::Float32(v) => float(f64::from(*v)),
        Value::Float64(v) => float(*v),
        Value::Decimal(v) => Json::String(v.to_string()),
        Value::String(v) => Json::String(v.clone()),
        Value::Bytes(v) => Json::String(String::from_utf8_lossy(v).into_owned()),
        Value::Uuid(v) => Json::String(v.to_string()),
        Value::Ipv4(v) => Json::String(v.to_string()),
        Value::Ipv6(v) => Json::String(v.to_string()),
        Value::Date(v) => Json::String(v.format(DATE_FORMAT).to_string()),
        Value::DateTime(v) => Json::String(v.format(DATETIME_FORMAT).to_string()),
        Value::NaiveDateTime(v) => Json::String(v.format(DATETIME_FORMAT).to_string()),
        Value::Array(items) | Value::Tuple(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => map_to_json(entries),
    }
}

fn float(v: f64) -> Json {
    // NaN and infinities have no JSON number form.
    Number::from_f64(v)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(v.to_string()))
}

/// Maps with string keys become objects; anything else becomes a list of `[key, value]` pairs.
fn map_to_json(entries: &[(Value, Value)]) -> Json {
    if entries.iter().all(|(key, _)| matches!(key, Value::String(_))) {
        let mut object = Map::with_capacity(entries.len());
        for (key, value) in entries {
            if let Value::String(key) = key {
                object.insert(key.clone(), to_json(value));
            }
        }
        return Json::Object(object);
    }
    Json::Array(
        entries
            .iter()
            .map(|(key, value)| Json::Array(vec![to_json(key), to_json(value)]))
            .collect(),
    )
}

/// Build a value for `ty` from JSON.
///
/// Only the structure is checked here; scalars are passed through loosely typed.
pub fn from_json(json: &Json, ty: &ClickHouseType) -> Result<Value> {
    let ty = ty.logical();
    Ok(match (json, ty) {
        (Json::Null, _) => Value::Null,
        (_, ClickHouseType::Nullable(nullable)) => from_json(json, nullable.inner())?,
        (Json::Array(items), ClickHouseType::Array(array)) => Value::Array(
            items
                .iter()
                .map(|item| from_json(item, array.element()))
                .collect::<Result<_>>()?,
        ),
        (Json::Array(_) | Json::Object(_), ClickHouseType::Tuple(tuple)) => {
            Value::Tuple(row_from_json(json, tuple)?)
        }
        (Json::Array(rows), ClickHouseType::Nested(nested)) => Value::Array(
            rows.iter()
                .map(|row| row_from_json(row, nested.row()).map(Value::Tuple))
                .collect::<Result<_>>()?,
        ),
        (Json::Object(fields), ClickHouseType::Map(map)) => Value::Map(
            fields
                .iter()
                .map(|(key, value)| {
                    Ok((
                        from_json(&Json::String(key.clone()), map.key())?,
                        from_json(value, map.value())?,
                    ))
                })
                .collect::<Result<_>>()?,
        ),
        (Json::Array(pairs), ClickHouseType::Map(map)) => Value::Map(
            pairs
                .iter()
                .map(|pair| match pair.as_array().map(Vec::as_slice) {
                    Some([key, value]) => Ok((
                        from_json(key, map.key())?,
                        from_json(value, map.value())?,
                    )),
                    _ => bail!("expected a [key, value] pair for {ty}, got {pair}"),
                })
                .collect::<Result<_>>()?,
        ),
        (Json::Array(_) | Json::Object(_), _) => bail!("JSON {json} does not fit {ty}"),
        (Json::Bool(v), _) => Value::Bool(*v),
        (Json::Number(n), _) => number(n),
        (Json::String(s), _) => Value::String(s.clone()),
    })
}

fn number(n: &Number) -> Value {
    if let Some(v) = n.as_i64() {
        Value::Int64(v)
    } else if let Some(v) = n.as_u64() {
        Value::UInt64(v)
    } else {
        Value::Float64(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// A tuple row from a positional array or, for named elements, an object keyed by name.
fn row_from_json(json: &Json, row: &TupleType) -> Result<Vec<Value>> {
    match json {
        Json::Array(items) => {
            if items.len() != row.len() {
                bail!("{row} takes {} values, got {}", row.len(), items.len());
            }
            items
                .iter()
                .zip(row.types())
                .map(|(item, ty)| from_json(item, ty))
                .collect()
        }
        Json::Object(fields) => row
            .elements()
            .iter()
            .map(|element| {
                let Some(name) = &element.name else {
                    bail!("{row} has unnamed elements; pass an array");
                };
                match fields.get(name) {
                    Some(field) => from_json(field, &element.ty),
                    None => bail!("missing field {name:?} for {row}"),
                }
            })
            .collect(),
        other => bail!("expected an array or object for {row}, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chwire_types::{parse_clickhouse_type, Decimal};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ty(signature: &str) -> ClickHouseType {
        parse_clickhouse_type(signature).unwrap()
    }

    #[test]
    fn scalars_render_like_clickhouse() {
        assert_eq!(to_json(&Value::UInt64(u64::MAX)), json!(u64::MAX));
        assert_eq!(to_json(&Value::Int128(-5)), json!("-5"));
        assert_eq!(
            to_json(&Value::Decimal(Decimal::new(-1205, 2).unwrap())),
            json!("-12.05")
        );
        assert_eq!(to_json(&Value::Float64(f64::NAN)), json!("NaN"));
        assert_eq!(to_json(&Value::Null), Json::Null);
    }

    #[test]
    fn maps_prefer_objects() {
        let by_name = Value::Map(vec![(Value::from("a"), Value::UInt8(1))]);
        assert_eq!(to_json(&by_name), json!({"a": 1}));
        let by_number = Value::Map(vec![(Value::UInt8(3), Value::from("c"))]);
        assert_eq!(to_json(&by_number), json!([[3, "c"]]));
    }

    #[test]
    fn structure_follows_the_descriptor() {
        let value = from_json(&json!([1, null]), &ty("Array(Nullable(Int32))")).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int64(1), Value::Null]));

        let value = from_json(
            &json!({"name": "x", "id": 7}),
            &ty("Tuple(id UInt8, name String)"),
        )
        .unwrap();
        assert_eq!(value, Value::Tuple(vec![Value::Int64(7), Value::from("x")]));

        let value = from_json(&json!({"7": 1.5}), &ty("Map(UInt16, Float64)")).unwrap();
        assert_eq!(
            value,
            Value::Map(vec![(Value::from("7"), Value::Float64(1.5))])
        );
    }

    #[test]
    fn shape_mismatches_are_rejected() {
        assert!(from_json(&json!([1, 2, 3]), &ty("Tuple(Int8, Int8)")).is_err());
        assert!(from_json(&json!({"a": 1}), &ty("Tuple(Int8)")).is_err());
        assert!(from_json(&json!([1]), &ty("String")).is_err());
        assert!(from_json(&json!([[1]]), &ty("Map(String, Int8)")).is_err());
    }
}
