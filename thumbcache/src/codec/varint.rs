//! Base-128 variable-length integers.
//!
//! Least-significant group first, high bit set on every byte except the last.

use super::CodecError;

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Number of bytes needed to encode `value`.
pub fn encoded_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Appends the encoding of `value` to `buf`.
pub fn put(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Reads a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
pub fn get(buf: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;

    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(CodecError::VarintOverflow);
        }
        let group = u64::from(byte & 0x7F);
        // The tenth byte may only carry the top bit of a u64.
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(CodecError::VarintOverflow);
        }
        value |= group << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }

    Err(CodecError::Truncated {
        needed: buf.len() + 1,
        available: buf.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_values() {
        for value in [0u64, 1, 0x7F] {
            let mut buf = Vec::new();
            put(&mut buf, value);
            assert_eq!(buf.len(), 1);
            assert_eq!(encoded_len(value), 1);
            assert_eq!(get(&buf).unwrap(), (value, 1));
        }
    }

    #[test]
    fn test_known_encoding() {
        let mut buf = Vec::new();
        put(&mut buf, 300);
        assert_eq!(buf, vec![0xAC, 0x02]);
        assert_eq!(get(&buf).unwrap(), (300, 2));
    }

    #[test]
    fn test_max_value_uses_ten_bytes() {
        let mut buf = Vec::new();
        put(&mut buf, u64::MAX);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        assert_eq!(encoded_len(u64::MAX), MAX_VARINT_LEN);
        assert_eq!(get(&buf).unwrap(), (u64::MAX, MAX_VARINT_LEN));
    }

    #[test]
    fn test_unterminated_is_truncated() {
        let result = get(&[0x80, 0x80]);
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_empty_is_truncated() {
        assert!(matches!(get(&[]), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_eleven_continuation_bytes_overflow() {
        let buf = [0xFF; 11];
        assert_eq!(get(&buf), Err(CodecError::VarintOverflow));
    }

    #[test]
    fn test_tenth_byte_too_large_overflows() {
        let mut buf = vec![0xFF; 9];
        buf.push(0x02);
        assert_eq!(get(&buf), Err(CodecError::VarintOverflow));
    }
}
