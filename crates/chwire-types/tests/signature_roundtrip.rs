use chwire_types::types::{
    ArrayType, DateTime64Type, DateTimeType, DecimalType, EnumType, EnumWidth, FixedStringType,
    LowCardinalityType, MapType, NestedType, NullableType, SimpleAggregateFunctionType, TupleType,
};
use chwire_types::{parse_clickhouse_type, ClickHouseType, Tz};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn canonical_signatures_print_back_unchanged() {
    for signature in [
        "Int8",
        "UInt128",
        "Bool",
        "UUID",
        "IPv6",
        "Date32",
        "DateTime",
        "DateTime('Europe/Berlin')",
        "DateTime64(3)",
        "DateTime64(9, 'Asia/Tokyo')",
        "Decimal(9, 2)",
        "Decimal(38, 0)",
        "FixedString(16)",
        "Enum8('a' = 1, 'b' = 2)",
        "Enum16('a=b' = -300, 'it\\'s' = 300)",
        "Array(Nullable(Decimal(9, 2)))",
        "LowCardinality(Nullable(String))",
        "Tuple()",
        "Tuple(Int32, String)",
        "Tuple(id UInt64, `first name` String)",
        "Nested(a Int32, b Array(String))",
        "Map(String, Array(UInt8))",
        "SimpleAggregateFunction(any, UInt64)",
        "Array(Tuple(Array(Int8), Map(UUID, Nullable(Float64))))",
    ] {
        let ty = parse_clickhouse_type(signature).expect(signature);
        assert_eq!(ty.to_string(), signature);
        assert_eq!(parse_clickhouse_type(&ty.to_string()), Ok(ty));
    }
}

#[test]
fn whitespace_and_aliases_normalize() {
    let cases = [
        ("  Array (  Int32 )  ", "Array(Int32)"),
        ("Decimal(10)", "Decimal(10, 0)"),
        ("Decimal32(4)", "Decimal(9, 4)"),
        ("Decimal64(4)", "Decimal(18, 4)"),
        ("Decimal128(4)", "Decimal(38, 4)"),
        ("Enum('x' = 1)", "Enum8('x' = 1)"),
        ("Tuple(`a` Int8)", "Tuple(a Int8)"),
    ];
    for (input, canonical) in cases {
        let ty = parse_clickhouse_type(input).expect(input);
        assert_eq!(ty.to_string(), canonical, "input {input:?}");
    }
}

const ZONES: &[Tz] = &[
    Tz::UTC,
    Tz::Europe__Berlin,
    Tz::Asia__Tokyo,
    Tz::America__New_York,
];

fn zone() -> impl Strategy<Value = Option<Tz>> {
    prop::option::of(prop::sample::select(ZONES))
}

fn enum_type() -> impl Strategy<Value = ClickHouseType> {
    (
        any::<bool>(),
        prop::collection::btree_set(any::<i8>(), 1..5),
        "[a-z'= \\\\]{0,3}",
    )
        .prop_map(|(wide, codes, prefix)| {
            let entries: Vec<(String, i16)> = codes
                .into_iter()
                .enumerate()
                .map(|(idx, code)| (format!("{prefix}{idx}"), i16::from(code) * if wide { 100 } else { 1 }))
                .collect();
            let width = if wide { EnumWidth::Enum16 } else { EnumWidth::Enum8 };
            let ty = EnumType::new(width, entries).expect("distinct codes and names");
            if wide {
                ClickHouseType::Enum16(ty)
            } else {
                ClickHouseType::Enum8(ty)
            }
        })
}

fn leaf() -> impl Strategy<Value = ClickHouseType> {
    prop_oneof![
        prop::sample::select(vec![
            ClickHouseType::Nothing,
            ClickHouseType::Bool,
            ClickHouseType::Int8,
            ClickHouseType::Int16,
            ClickHouseType::Int32,
            ClickHouseType::Int64,
            ClickHouseType::Int128,
            ClickHouseType::UInt8,
            ClickHouseType::UInt16,
            ClickHouseType::UInt32,
            ClickHouseType::UInt64,
            ClickHouseType::UInt128,
            ClickHouseType::Float32,
            ClickHouseType::Float64,
            ClickHouseType::String,
            ClickHouseType::Uuid,
            ClickHouseType::IPv4,
            ClickHouseType::IPv6,
            ClickHouseType::Date,
            ClickHouseType::Date32,
        ]),
        (1u32..=38)
            .prop_flat_map(|p| (Just(p), 0..=p))
            .prop_map(|(p, s)| ClickHouseType::Decimal(DecimalType::new(p, s).expect("valid"))),
        (1usize..64).prop_map(|n| ClickHouseType::FixedString(
            FixedStringType::new(n).expect("positive")
        )),
        zone().prop_map(|tz| ClickHouseType::DateTime(DateTimeType::new(tz))),
        (0u32..=9, zone()).prop_map(|(scale, tz)| ClickHouseType::DateTime64(
            DateTime64Type::new(scale, tz).expect("scale in range")
        )),
        enum_type(),
    ]
}

fn field_name() -> impl Strategy<Value = String> {
    prop_oneof!["[a-z_][a-z0-9_]{0,5}", "[a-z][a-z ]{0,4}[a-z]"]
}

fn any_type() -> impl Strategy<Value = ClickHouseType> {
    leaf().prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|t| ClickHouseType::Array(ArrayType::new(t))),
            inner.clone().prop_map(|t| ClickHouseType::Nullable(NullableType::new(t))),
            inner.clone().prop_map(|t| ClickHouseType::LowCardinality(LowCardinalityType::new(t))),
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|ts| ClickHouseType::Tuple(TupleType::new(ts))),
            prop::collection::vec((field_name(), inner.clone()), 1..4)
                .prop_map(|fields| ClickHouseType::Tuple(TupleType::named(fields))),
            prop::collection::vec((field_name(), inner.clone()), 1..4)
                .prop_map(|fields| ClickHouseType::Nested(NestedType::new(TupleType::named(fields)))),
            (inner.clone(), inner.clone())
                .prop_map(|(k, v)| ClickHouseType::Map(MapType::new(k, v))),
            (prop::sample::select(vec!["any", "sum", "max"]), inner).prop_map(|(f, t)| {
                ClickHouseType::SimpleAggregateFunction(SimpleAggregateFunctionType::new(f, t))
            }),
        ]
    })
}

proptest! {
    #[test]
    fn display_then_parse_is_identity(ty in any_type()) {
        let signature = ty.to_string();
        prop_assert_eq!(parse_clickhouse_type(&signature), Ok(ty), "signature {}", signature);
    }

    #[test]
    fn arbitrary_text_never_panics(input in "[A-Za-z0-9(),' =`-]{0,40}") {
        let _ = parse_clickhouse_type(&input);
    }
}
