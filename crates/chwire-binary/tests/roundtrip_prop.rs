use chwire_binary::{read_value, write_value};
use chwire_types::{parse_clickhouse_type, Decimal, Value};
use proptest::prelude::*;

fn nullable_int32() -> impl Strategy<Value = Value> {
    prop_oneof![Just(Value::Null), any::<i32>().prop_map(Value::Int32)]
}

fn decimal_9_2() -> impl Strategy<Value = Value> {
    (-999_999_999i128..=999_999_999).prop_map(|m| {
        Value::Decimal(Decimal::new(m, 2).expect("scale 2 is valid"))
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn arrays_of_nullable_ints(items in prop::collection::vec(nullable_int32(), 0..32)) {
        let ty = parse_clickhouse_type("Array(Nullable(Int32))").unwrap();
        let value = Value::Array(items);
        let bytes = write_value(&ty, &value).unwrap();
        prop_assert_eq!(read_value(&bytes, &ty).unwrap(), value);
    }

    #[test]
    fn tuples_of_text_and_decimals(
        text in any::<String>(),
        dec in decimal_9_2(),
        uuid in any::<u128>(),
    ) {
        let ty = parse_clickhouse_type("Tuple(String, Decimal(9, 2), UUID)").unwrap();
        let value = Value::Tuple(vec![
            Value::String(text),
            dec,
            Value::Uuid(uuid::Uuid::from_u128(uuid)),
        ]);
        let bytes = write_value(&ty, &value).unwrap();
        prop_assert_eq!(read_value(&bytes, &ty).unwrap(), value);
    }

    #[test]
    fn maps_of_unsigned_keys(pairs in prop::collection::vec((any::<u64>(), any::<i16>()), 0..16)) {
        let ty = parse_clickhouse_type("Map(UInt64, Int16)").unwrap();
        let value = Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (Value::UInt64(k), Value::Int16(v)))
                .collect(),
        );
        let bytes = write_value(&ty, &value).unwrap();
        prop_assert_eq!(read_value(&bytes, &ty).unwrap(), value);
    }

    #[test]
    fn garbage_input_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        for signature in [
            "Array(Nullable(String))",
            "Map(String, Tuple(Int8, Enum8('a' = 1)))",
            "Nested(a DateTime64(9, 'Europe/Berlin'), b Decimal(38, 10))",
        ] {
            let ty = parse_clickhouse_type(signature).unwrap();
            let _ = read_value(&bytes, &ty);
        }
    }
}
