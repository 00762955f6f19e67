//! RFC 7541 section 5 primitives: prefixed integers and string literals.

use bytes::{BufMut, BytesMut};

use crate::error::{HpackError, Result};

/// Huffman flag on the first byte of a string literal.
const HUFFMAN_FLAG: u8 = 0x80;

/// Prefix width used for string literal lengths.
pub const STRING_PREFIX_BITS: u8 = 7;

/// Append `value` as a prefixed integer. `flags` carries the opcode bits
/// above the prefix.
pub fn encode_integer(value: u64, prefix_bits: u8, flags: u8, dst: &mut BytesMut) {
    debug_assert!((1..=8).contains(&prefix_bits));
    let max_prefix = (1u64 << prefix_bits) - 1;
    if value < max_prefix {
        dst.put_u8(flags | value as u8);
        return;
    }

    dst.put_u8(flags | max_prefix as u8);
    let mut rest = value - max_prefix;
    while rest >= 128 {
        dst.put_u8(0x80 | (rest & 0x7f) as u8);
        rest >>= 7;
    }
    dst.put_u8(rest as u8);
}

/// Decode a prefixed integer, returning `(value, bytes_consumed)`.
///
/// Values above `u32::MAX` are rejected.
pub fn decode_integer(src: &[u8], prefix_bits: u8) -> Result<(u64, usize)> {
    debug_assert!((1..=8).contains(&prefix_bits));
    let first = *src.first().ok_or(HpackError::Truncated)?;
    let max_prefix = (1u64 << prefix_bits) - 1;
    let mut value = u64::from(first) & max_prefix;
    if value < max_prefix {
        return Ok((value, 1));
    }

    let mut shift = 0u32;
    for (i, &byte) in src.iter().enumerate().skip(1) {
        if shift > 28 {
            return Err(HpackError::IntegerOverflow);
        }
        value += u64::from(byte & 0x7f) << shift;
        if value > u64::from(u32::MAX) {
            return Err(HpackError::IntegerOverflow);
        }
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(HpackError::Truncated)
}

/// Number of bytes `encode_integer` emits for `value`.
pub fn integer_len(value: u64, prefix_bits: u8) -> usize {
    let max_prefix = (1u64 << prefix_bits) - 1;
    if value < max_prefix {
        return 1;
    }
    let mut rest = value - max_prefix;
    let mut len = 2;
    while rest >= 128 {
        rest >>= 7;
        len += 1;
    }
    len
}

/// Append a raw (never Huffman-coded) string literal.
pub fn encode_string(s: &[u8], dst: &mut BytesMut) {
    encode_integer(s.len() as u64, STRING_PREFIX_BITS, 0x00, dst);
    dst.put_slice(s);
}

/// Decode a string literal, returning the borrowed bytes and the number of
/// bytes consumed.
pub fn decode_string(src: &[u8]) -> Result<(&[u8], usize)> {
    let first = *src.first().ok_or(HpackError::Truncated)?;
    let (len, used) = decode_integer(src, STRING_PREFIX_BITS)?;
    let len = len as usize;
    let end = used.checked_add(len).ok_or(HpackError::IntegerOverflow)?;
    if src.len() < end {
        return Err(HpackError::Truncated);
    }
    if first & HUFFMAN_FLAG != 0 {
        return Err(HpackError::HuffmanUnsupported);
    }
    Ok((&src[used..end], end))
}

/// Encoded size of a raw string literal.
pub fn string_len(s: &[u8]) -> usize {
    integer_len(s.len() as u64, STRING_PREFIX_BITS) + s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_c1_1_ten_in_five_bit_prefix() {
        let mut buf = BytesMut::new();
        encode_integer(10, 5, 0, &mut buf);
        assert_eq!(&buf[..], &[0x0a]);
        assert_eq!(decode_integer(&buf, 5).unwrap(), (10, 1));
    }

    #[test]
    fn rfc_c1_2_1337_in_five_bit_prefix() {
        let mut buf = BytesMut::new();
        encode_integer(1337, 5, 0, &mut buf);
        assert_eq!(&buf[..], &[0x1f, 0x9a, 0x0a]);
        assert_eq!(decode_integer(&buf, 5).unwrap(), (1337, 3));
        assert_eq!(integer_len(1337, 5), 3);
    }

    #[test]
    fn size_update_4096_takes_three_bytes() {
        let mut buf = BytesMut::new();
        encode_integer(4096, 5, 0x20, &mut buf);
        assert_eq!(&buf[..], &[0x3f, 0xe1, 0x1f]);
    }

    #[test]
    fn opcode_bits_are_preserved() {
        let mut buf = BytesMut::new();
        encode_integer(2, 7, 0x80, &mut buf);
        assert_eq!(&buf[..], &[0x82]);
        assert_eq!(decode_integer(&buf, 7).unwrap(), (2, 1));
    }

    #[test]
    fn integer_len_matches_encoding() {
        for prefix in [4u8, 5, 6, 7] {
            for value in [0u64, 14, 15, 16, 62, 63, 126, 127, 128, 254, 255, 16_384, 1 << 21] {
                let mut buf = BytesMut::new();
                encode_integer(value, prefix, 0, &mut buf);
                assert_eq!(buf.len(), integer_len(value, prefix), "value {value} prefix {prefix}");
            }
        }
    }

    #[test]
    fn truncated_continuation_is_rejected() {
        assert_eq!(decode_integer(&[0x1f, 0x9a], 5), Err(HpackError::Truncated));
        assert_eq!(decode_integer(&[], 5), Err(HpackError::Truncated));
    }

    #[test]
    fn oversized_integer_is_rejected() {
        let src = [0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(decode_integer(&src, 7), Err(HpackError::IntegerOverflow));
    }

    #[test]
    fn string_literal_roundtrip() {
        let mut buf = BytesMut::new();
        encode_string(b"custom-key", &mut buf);
        assert_eq!(buf[0], 0x0a);
        assert_eq!(buf.len(), string_len(b"custom-key"));
        let (s, used) = decode_string(&buf).unwrap();
        assert_eq!(s, b"custom-key");
        assert_eq!(used, 11);
    }

    #[test]
    fn string_longer_than_block_is_truncated() {
        assert_eq!(decode_string(&[0x05, b'a', b'b']), Err(HpackError::Truncated));
    }

    #[test]
    fn huffman_literal_is_unsupported() {
        assert_eq!(
            decode_string(&[0x82, 0x94, 0xe7]),
            Err(HpackError::HuffmanUnsupported)
        );
    }
}
