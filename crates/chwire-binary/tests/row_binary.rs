use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{NaiveDate, TimeZone, Utc};
use chwire_binary::{read_rows, read_value, write_rows, write_value, CodecError};
use chwire_types::{parse_clickhouse_type, ClickHouseType, Decimal, Tz, Value};
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn ty(signature: &str) -> ClickHouseType {
    parse_clickhouse_type(signature).expect(signature)
}

fn encode(signature: &str, value: Value) -> Vec<u8> {
    write_value(&ty(signature), &value).expect(signature)
}

fn decode(signature: &str, hex_bytes: &str) -> Value {
    let bytes = hex::decode(hex_bytes).expect("hex");
    read_value(&bytes, &ty(signature)).expect(signature)
}

#[test]
fn nullable_array_of_int32_round_trips() {
    let ty = ty("Nullable(Array(Int32))");
    let value = Value::Array(vec![Value::Int32(1), Value::Int32(2)]);

    let bytes = write_value(&ty, &value).unwrap();
    assert_eq!(hex::encode(&bytes), "00020100000002000000");
    assert_eq!(read_value(&bytes, &ty).unwrap(), value);

    let null = write_value(&ty, &Value::Null).unwrap();
    assert_eq!(null, [0x01]);
    assert_eq!(read_value(&null, &ty).unwrap(), Value::Null);
}

#[test]
fn scalar_layouts() {
    assert_eq!(hex::encode(encode("Bool", Value::Bool(true))), "01");
    assert_eq!(hex::encode(encode("Int64", Value::Int64(-2))), "feffffffffffffff");
    assert_eq!(hex::encode(encode("Float32", Value::Float32(1.5))), "0000c03f");
    assert_eq!(hex::encode(encode("String", Value::from("hé"))), "0368c3a9");
    assert_eq!(hex::encode(encode("FixedString(4)", Value::from("ab"))), "61620000");
    assert_eq!(hex::encode(encode("Nothing", Value::Null)), "00");
    assert_eq!(
        hex::encode(encode("IPv4", Value::Ipv4(Ipv4Addr::new(192, 168, 0, 1)))),
        "0100a8c0"
    );
    assert_eq!(
        hex::encode(encode("IPv6", Value::Ipv6(Ipv6Addr::LOCALHOST))),
        "00000000000000000000000000000001"
    );
}

#[test]
fn uuid_halves_are_little_endian() {
    let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
    let hex_bytes = "7766554433221100ffeeddccbbaa9988";
    assert_eq!(hex::encode(encode("UUID", Value::Uuid(uuid))), hex_bytes);
    assert_eq!(decode("UUID", hex_bytes), Value::Uuid(uuid));
}

#[test]
fn decimals_are_scaled_integers() {
    assert_eq!(
        hex::encode(encode("Decimal(9, 2)", Value::from("12.34"))),
        "d2040000"
    );
    assert_eq!(
        decode("Decimal(9, 2)", "d2040000"),
        Value::Decimal(Decimal::new(1234, 2).unwrap())
    );
    assert_eq!(
        encode("Decimal(38, 2)", Value::Int32(-1)),
        (-100i128).to_le_bytes()
    );
}

#[test]
fn dates_and_times() {
    let day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    assert_eq!(hex::encode(encode("Date", Value::Date(day))), "cd2a");
    assert_eq!(decode("Date", "cd2a"), Value::Date(day));
    assert_eq!(hex::encode(encode("Date32", Value::Date(day))), "cd2a0000");

    let instant = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
    let bytes = encode("DateTime('Asia/Tokyo')", Value::DateTime(instant.with_timezone(&Tz::UTC)));
    assert_eq!(bytes, 1_700_000_000u32.to_le_bytes());
    let Value::DateTime(read_back) = decode("DateTime('Asia/Tokyo')", &hex::encode(&bytes)) else {
        panic!("expected a date-time");
    };
    assert_eq!(read_back.timestamp(), 1_700_000_000);
    assert_eq!(read_back.timezone(), Tz::Asia__Tokyo);

    let bytes = encode("DateTime64(3)", Value::DateTime(instant.with_timezone(&Tz::UTC)));
    assert_eq!(bytes, 1_700_000_000_500i64.to_le_bytes());
}

#[test]
fn naive_times_are_read_in_the_column_zone() {
    let local = NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let berlin = encode("DateTime('Europe/Berlin')", Value::NaiveDateTime(local));
    let utc = encode("DateTime", Value::NaiveDateTime(local));
    let berlin = u32::from_le_bytes(berlin.try_into().unwrap());
    let utc = u32::from_le_bytes(utc.try_into().unwrap());
    // Berlin is UTC+2 in July.
    assert_eq!(utc - berlin, 2 * 3600);
}

#[test]
fn enums_travel_as_codes() {
    let sig = "Enum8('red' = 1, 'green' = -2)";
    assert_eq!(encode(sig, Value::from("green")), [0xfe]);
    assert_eq!(decode(sig, "01"), Value::from("red"));
    assert!(matches!(
        write_value(&ty(sig), &Value::from("blue")),
        Err(CodecError::Coerce(_))
    ));
}

#[test]
fn composite_layouts() {
    let map = Value::Map(vec![(Value::from("a"), Value::UInt8(1))]);
    assert_eq!(hex::encode(encode("Map(String, UInt8)", map.clone())), "01016101");
    assert_eq!(decode("Map(String, UInt8)", "01016101"), map);

    let tuple = Value::Tuple(vec![Value::UInt8(7), Value::from("x")]);
    assert_eq!(hex::encode(encode("Tuple(UInt8, String)", tuple)), "070178");

    let nested = Value::Array(vec![
        Value::Tuple(vec![Value::Int8(1), Value::from("a")]),
        Value::Tuple(vec![Value::Int8(2), Value::from("b")]),
    ]);
    let bytes = encode("Nested(id Int8, name String)", nested.clone());
    assert_eq!(hex::encode(&bytes), "02010161020162");
    assert_eq!(decode("Nested(id Int8, name String)", "02010161020162"), nested);

    assert_eq!(
        encode("LowCardinality(Nullable(String))", Value::from("z")),
        [0x00, 0x01, b'z']
    );
    assert_eq!(
        encode("SimpleAggregateFunction(sum, UInt16)", Value::UInt16(258)),
        [0x02, 0x01]
    );
}

#[test]
fn trailing_bytes_are_an_error() {
    assert!(matches!(
        read_value(&[1, 0, 0], &ty("UInt16")),
        Err(CodecError::TrailingBytes { count: 1 })
    ));
}

#[test]
fn rows_round_trip() {
    let columns = [ty("UInt32"), ty("Nullable(String)"), ty("Array(Float64)")];
    let rows = vec![
        vec![
            Value::UInt32(1),
            Value::from("one"),
            Value::Array(vec![Value::Float64(0.5)]),
        ],
        vec![Value::UInt32(2), Value::Null, Value::Array(vec![])],
    ];
    let bytes = write_rows(&columns, &rows).unwrap();
    assert_eq!(read_rows(&bytes, &columns).unwrap(), rows);
}

#[test]
fn rows_are_converted_and_checked() {
    let columns = [ty("Int64"), ty("Date")];
    let bytes = write_rows(
        &columns,
        &[vec![Value::Int8(-1), Value::from("1970-01-03")]],
    )
    .unwrap();
    assert_eq!(hex::encode(bytes), "ffffffffffffffff0200");

    assert!(matches!(
        write_rows(&columns, &[vec![Value::Int8(1)]]),
        Err(CodecError::Type(_))
    ));
    assert!(matches!(
        read_rows(&[1, 0, 0, 0, 0, 0, 0, 0, 2], &columns),
        Err(CodecError::Truncated { context: "Date" })
    ));
}

#[test]
fn zero_width_rows_cannot_absorb_input() {
    for signature in ["Tuple()", "Tuple(Tuple())"] {
        let columns = [ty(signature)];
        assert_eq!(read_rows(&[], &columns).unwrap(), Vec::<Vec<Value>>::new());
        assert!(matches!(
            read_rows(&[0x01], &columns),
            Err(CodecError::TrailingBytes { count: 1 })
        ));
    }
    assert!(matches!(
        read_rows(&[0x01, 0x02], &[]),
        Err(CodecError::TrailingBytes { count: 2 })
    ));

    // Alongside a column with a width, an empty tuple is just part of the row.
    let columns = [ty("Tuple()"), ty("UInt8")];
    assert_eq!(
        read_rows(&[7, 8], &columns).unwrap(),
        vec![
            vec![Value::Tuple(vec![]), Value::UInt8(7)],
            vec![Value::Tuple(vec![]), Value::UInt8(8)],
        ]
    );
}

#[test]
fn zero_width_collections_are_bounded() {
    let err = read_value(&[0x80, 0x80, 0x80, 0x08], &ty("Array(Tuple())")).unwrap_err();
    assert!(matches!(err, CodecError::LengthLimit { kind: "Array", .. }));
    assert_eq!(
        read_value(&[2], &ty("Array(Tuple())")).unwrap(),
        Value::Array(vec![Value::Tuple(vec![]), Value::Tuple(vec![])])
    );
}

#[test]
fn extreme_datetime64_ticks_re_encode() {
    let ty = ty("DateTime64(9)");
    for ticks in [i64::MIN, i64::MAX] {
        let bytes = ticks.to_le_bytes();
        let value = read_value(&bytes, &ty).unwrap();
        assert_eq!(write_value(&ty, &value).unwrap(), bytes);
    }
}
