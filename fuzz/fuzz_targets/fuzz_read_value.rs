#![no_main]

use chwire_binary::{read_value_with, write_value, BinaryOptions};
use libfuzzer_sys::fuzz_target;

/// Column types the fuzzer picks from with the first input byte.
const SIGNATURES: &[&str] = &[
    "Nullable(Array(Int32))",
    "Array(Nullable(String))",
    "Map(String, Tuple(Int8, Enum8('a' = 1, 'b' = 2)))",
    "Nested(id UInt64, at DateTime64(6, 'Europe/Berlin'), price Decimal(18, 4))",
    "Tuple(UUID, IPv4, IPv6, Date, Date32, FixedString(3))",
    "LowCardinality(Nullable(String))",
    "Array(Array(Decimal(38, 10)))",
];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, bytes)) = data.split_first() else {
        return;
    };
    let signature = SIGNATURES[usize::from(selector) % SIGNATURES.len()];
    let Ok(ty) = chwire_types::parse_clickhouse_type(signature) else {
        return;
    };

    // Small limits keep hostile length prefixes from dominating the run.
    let options = BinaryOptions {
        max_collection_len: 1 << 12,
        max_string_len: 1 << 16,
        ..BinaryOptions::default()
    };
    let Ok(value) = read_value_with(bytes, &ty, options) else {
        return;
    };

    // Anything that decodes must encode again.
    let encoded = write_value(&ty, &value)
        .unwrap_or_else(|err| panic!("re-encoding {value} as {ty} failed: {err}"));
    std::hint::black_box(encoded);
});
