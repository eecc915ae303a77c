#![no_main]

use libfuzzer_sys::fuzz_target;

/// Real signatures are short; longer inputs only slow the fuzzer down.
const MAX_INPUT_BYTES: usize = 4_096;

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(MAX_INPUT_BYTES)];
    let input = String::from_utf8_lossy(data);

    let Ok(ty) = chwire_types::parse_clickhouse_type(&input) else {
        return;
    };

    // Whatever parses must print a signature that parses back to the same descriptor.
    let canonical = ty.to_string();
    let reparsed = chwire_types::parse_clickhouse_type(&canonical)
        .unwrap_or_else(|err| panic!("canonical form {canonical:?} failed to parse: {err}"));
    assert_eq!(reparsed, ty, "round trip changed {canonical:?}");

    std::hint::black_box(ty.native_type());
});
