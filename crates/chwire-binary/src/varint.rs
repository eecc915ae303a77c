//! Unsigned LEB128, used for every length prefix in RowBinary.

use std::io::{Read, Write};

use crate::error::CodecError;

/// A `u64` never needs more than ten 7-bit groups.
const MAX_VARINT_LEN: usize = 10;

pub fn read_varint<R: Read>(reader: &mut R) -> Result<u64, CodecError> {
    let mut value = 0u64;
    for idx in 0..MAX_VARINT_LEN {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => CodecError::Truncated {
                context: "length prefix",
            },
            _ => CodecError::Io(err),
        })?;
        let group = u64::from(byte[0] & 0x7f);
        let shift = 7 * idx as u32;
        // The tenth group may only contribute the single remaining bit.
        if idx == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(CodecError::MalformedVarint);
        }
        value |= group << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::MalformedVarint)
}

pub fn write_varint<W: Write>(writer: &mut W, mut value: u64) -> Result<(), CodecError> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut len = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf[len] = byte;
            len += 1;
            break;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
    writer.write_all(&buf[..len])?;
    Ok(())
}
