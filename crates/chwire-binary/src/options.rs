/// Limits and decoding choices for [`BinaryReader`](crate::BinaryReader) and
/// [`BinaryWriter`](crate::BinaryWriter).
///
/// The limits bound how much a single length prefix may claim, so corrupt or hostile input
/// fails fast instead of allocating gigabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOptions {
    /// Maximum element count of one `Array`, `Nested` or `Map` value.
    pub max_collection_len: usize,
    /// Maximum byte length of one `String` value.
    pub max_string_len: usize,
    /// Maximum number of collection elements that occupy no bytes (such as `Tuple()`) in one
    /// decoded value, summed over every collection inside it.
    pub max_zero_width_elements: usize,
    /// When set, `String` bytes that are not valid UTF-8 decode lossily (with U+FFFD); otherwise
    /// they decode to [`Value::Bytes`](chwire_types::Value::Bytes).
    pub utf8_strings: bool,
}

impl Default for BinaryOptions {
    fn default() -> Self {
        Self {
            max_collection_len: 1 << 24,
            max_string_len: 1 << 30,
            max_zero_width_elements: 1 << 16,
            utf8_strings: false,
        }
    }
}
