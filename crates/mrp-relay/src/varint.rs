//! Varint length prefix of wire frames.

use mrp_core::error::FramingError;

/// Longest LEB128 encoding of a u64.
pub const MAX_VARINT_LEN: usize = 10;

/// Append `len` as a protobuf varint.
pub fn encode_length(len: usize, buf: &mut Vec<u8>) {
    prost::encoding::encode_varint(len as u64, buf);
}

/// Read a length prefix from the start of `buf`.
///
/// Returns the value and the number of prefix bytes, or `None` while the
/// prefix is still incomplete.
pub fn decode_length(buf: &[u8]) -> Result<Option<(u64, usize)>, FramingError> {
    let mut value: u64 = 0;

    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }

    if buf.len() >= MAX_VARINT_LEN {
        return Err(FramingError::MalformedLength);
    }
    Ok(None)
}
