use chwire_types::types::{DecimalWidth, TupleType};
use chwire_types::{
    parse_clickhouse_type, ClickHouseType, CoerceError, NativeType, TypeCode, TypeError, Value,
};
use pretty_assertions::assert_eq;

fn parse(signature: &str) -> ClickHouseType {
    parse_clickhouse_type(signature).expect(signature)
}

#[test]
fn decimal_storage_follows_precision() {
    for (precision, bytes, code) in [
        (1, 4, TypeCode::Decimal32),
        (9, 4, TypeCode::Decimal32),
        (10, 8, TypeCode::Decimal64),
        (18, 8, TypeCode::Decimal64),
        (19, 16, TypeCode::Decimal128),
        (38, 16, TypeCode::Decimal128),
    ] {
        let ClickHouseType::Decimal(ty) = parse(&format!("Decimal({precision}, 0)")) else {
            panic!("Decimal({precision}, 0) is not a decimal");
        };
        assert_eq!(ty.size(), bytes, "precision {precision}");
        assert_eq!(ty.type_code(), code, "precision {precision}");
    }

    for precision in [0, 39] {
        assert_eq!(
            parse_clickhouse_type(&format!("Decimal({precision}, 0)")),
            Err(TypeError::DecimalPrecisionOutOfRange { precision })
        );
    }
}

#[test]
fn decimal_scale_and_exponent_are_fixed() {
    let ClickHouseType::Decimal(ty) = parse("Decimal(18, 4)") else {
        panic!("not a decimal");
    };
    assert_eq!(ty.precision(), 18);
    assert_eq!(ty.scale(), 4);
    assert_eq!(ty.exponent(), 10_000);
    assert_eq!(ty.width(), DecimalWidth::W64);
    assert!(parse_clickhouse_type("Decimal(4, 5)").is_err());
}

#[test]
fn nested_composites_keep_their_structure() {
    let ty = parse("Array(Nullable(Decimal(9,2)))");
    assert_eq!(ty.type_code(), TypeCode::Array);

    let ClickHouseType::Array(array) = &ty else {
        panic!("not an array");
    };
    let ClickHouseType::Nullable(nullable) = array.element() else {
        panic!("element is not nullable");
    };
    let ClickHouseType::Decimal(decimal) = nullable.inner() else {
        panic!("inner is not a decimal");
    };
    assert_eq!((decimal.precision(), decimal.scale(), decimal.size()), (9, 2, 4));

    assert_eq!(
        ty.native_type(),
        NativeType::array_of(NativeType::optional_of(NativeType::Decimal))
    );
    assert_eq!(ty.native_type().to_string(), "Vec<Option<Decimal>>");
}

#[test]
fn enum_lookups_work_both_ways() {
    let ClickHouseType::Enum8(ty) = parse("Enum8('a' = 1, 'b' = 2)") else {
        panic!("not an enum");
    };
    assert_eq!(ty.code_of("a"), Ok(1));
    assert_eq!(ty.code_of("b"), Ok(2));
    assert_eq!(ty.name_of(1), Ok("a"));
    assert_eq!(ty.name_of(2), Ok("b"));
    assert_eq!(ty.code_of("c"), Err(TypeError::EnumNameNotFound("c".into())));
    assert_eq!(ty.name_of(3), Err(TypeError::EnumCodeNotFound(3)));
}

#[test]
fn enum_signatures_are_validated() {
    assert!(parse_clickhouse_type("Enum8('a' = 1, 'a' = 2)").is_err());
    assert!(parse_clickhouse_type("Enum8('a' = 1000)").is_err());
    assert!(parse_clickhouse_type("Enum8(1)").is_err());
    assert!(parse_clickhouse_type("Enum16()").is_err());
}

#[test]
fn tuples_enforce_arity_and_convert_scalars() {
    let ClickHouseType::Tuple(ty) = parse("Tuple(Int32, String)") else {
        panic!("not a tuple");
    };
    assert_eq!(ty.len(), 2);
    assert_eq!(
        ty.native_type(),
        NativeType::Tuple(vec![NativeType::I32, NativeType::String])
    );

    assert_eq!(
        ty.make_tuple(vec![Value::Int32(1)]),
        Err(CoerceError::Type(TypeError::TupleArityMismatch {
            expected: 2,
            actual: 1
        }))
    );
    assert_eq!(
        ty.make_tuple(vec![Value::Int64(1), Value::from("x")]),
        Ok(Value::Tuple(vec![Value::Int32(1), Value::from("x")]))
    );
    assert!(matches!(
        ty.make_tuple(vec![Value::Int64(i64::MAX), Value::from("x")]),
        Err(CoerceError::OutOfRange { .. })
    ));
}

#[test]
fn wide_tuples_use_rows() {
    let ty = parse("Tuple(Int8, Int8, Int8, Int8, Int8, Int8, Int8, Int8)");
    assert_eq!(ty.native_type(), NativeType::Row(vec![NativeType::I8; 8]));

    let seven = TupleType::new(vec![ClickHouseType::Int8; 7]);
    assert_eq!(seven.native_type(), NativeType::Tuple(vec![NativeType::I8; 7]));
}

#[test]
fn unknown_time_zone_falls_back_to_utc() {
    let ty = parse("DateTime('Not/AZone')");
    let ClickHouseType::DateTime(dt) = &ty else {
        panic!("not a date-time");
    };
    assert_eq!(dt.time_zone(), Some(chwire_types::Tz::UTC));
    assert_eq!(ty.to_string(), "DateTime('UTC')");

    assert_eq!(
        parse("DateTime64(3, 'Not/AZone')").to_string(),
        "DateTime64(3, 'UTC')"
    );
}

#[test]
fn known_time_zones_are_kept() {
    assert_eq!(
        parse("DateTime64(6, 'America/New_York')").to_string(),
        "DateTime64(6, 'America/New_York')"
    );
    assert!(parse_clickhouse_type("DateTime64(10)").is_err());
    assert!(parse_clickhouse_type("DateTime(UTC)").is_err());
}

#[test]
fn nullable_array_of_int32() {
    let ty = parse("Nullable(Array(Int32))");
    assert_eq!(ty.type_code(), TypeCode::Nullable);
    let ClickHouseType::Nullable(nullable) = &ty else {
        panic!("not nullable");
    };
    let ClickHouseType::Array(array) = nullable.inner() else {
        panic!("inner is not an array");
    };
    assert_eq!(array.element(), &ClickHouseType::Int32);
    assert_eq!(
        ty.native_type(),
        NativeType::optional_of(NativeType::array_of(NativeType::I32))
    );
    assert_eq!(ty.to_string(), "Nullable(Array(Int32))");
}

#[test]
fn transparent_wrappers_share_native_type() {
    let low = parse("LowCardinality(Nullable(String))");
    assert_eq!(low.native_type(), NativeType::optional_of(NativeType::String));
    assert_eq!(
        low.logical(),
        &parse("Nullable(String)")
    );

    let agg = parse("SimpleAggregateFunction(sum, UInt64)");
    assert_eq!(agg.native_type(), NativeType::U64);
    assert!(!agg.is_scalar());
}

#[test]
fn syntax_errors_surface_as_parse_errors() {
    for input in ["", "Array(", "Array(Int32))", "Array(,)", "Enum8('a = 1)", "()"] {
        assert!(
            matches!(parse_clickhouse_type(input), Err(TypeError::Parse(_))),
            "input {input:?}"
        );
    }
}

#[test]
fn wrong_argument_counts_are_rejected() {
    for input in [
        "Array(Int32, Int32)",
        "Nullable()",
        "Map(String)",
        "FixedString(0)",
        "FixedString('x')",
        "Nested()",
        "DateTime('UTC', 'UTC')",
    ] {
        assert!(
            matches!(
                parse_clickhouse_type(input),
                Err(TypeError::InvalidArgument { .. })
            ),
            "input {input:?}"
        );
    }
}
