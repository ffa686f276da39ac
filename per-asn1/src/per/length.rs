//! Length determinants (ITU-T X.691 clause 10.9)
//!
//! Only the single-octet (`n < 128`) and two-octet (`n < 16K`) forms are
//! produced or accepted. Larger lengths need the fragmented form, which is
//! rejected with [`PerError::UnsupportedLength`] on encode and
//! [`PerError::MalformedInput`] on decode.

use crate::bitstream::{BitInputStream, BitOutputStream};
use crate::per::number::{decode_constrained_number, encode_constrained_number};
use per_core::{PerError, PerResult};

/// Largest count the two-octet length determinant can carry
pub const MAX_LENGTH_DETERMINANT: usize = 0x3FFF;

/// Upper bound below which a constrained length is encoded as a
/// constrained whole number instead of a length determinant
pub const CONSTRAINED_LENGTH_LIMIT: usize = 0xFFFF;

/// Encode a length determinant
///
/// # Encoding Format
/// The stream is aligned first, then:
/// - `n < 128`: one octet, bit 8 zero, `n` in the low 7 bits
/// - `n < 16384`: two octets, first octet starts with bits `10`, 14-bit `n`
///
/// # Returns
/// Number of octets written for the determinant itself.
pub fn encode_length_determinant(stream: &mut BitOutputStream, length: usize) -> PerResult<usize> {
    stream.align();
    if length < 0x80 {
        stream.write_byte(length as u8);
        Ok(1)
    } else if length <= MAX_LENGTH_DETERMINANT {
        stream.write_byte(((length >> 8) & 0x3F) as u8 | 0x80);
        stream.write_byte((length & 0xFF) as u8);
        Ok(2)
    } else {
        Err(PerError::UnsupportedLength(length))
    }
}

/// Decode a length determinant
///
/// # Error Handling
/// A first octet starting with bits `11` announces a fragment, which is
/// reported as malformed input.
pub fn decode_length_determinant(stream: &mut BitInputStream<'_>) -> PerResult<usize> {
    stream.align();
    let first = stream.read_byte()?;
    match first & 0xC0 {
        0x00 | 0x40 => Ok(usize::from(first)),
        0x80 => {
            let second = stream.read_byte()?;
            Ok((usize::from(first & 0x3F) << 8) | usize::from(second))
        }
        _ => Err(PerError::MalformedInput(format!(
            "Unsupported length determinant prefix 0x{:02X} (fragmented form)",
            first
        ))),
    }
}

/// Encode a length whose bounds are known
///
/// When `max` is at most 64K the length is a constrained whole number over
/// `[min, max]` and no explicit length octets are written; otherwise the
/// plain length determinant is used.
pub fn encode_constrained_length_determinant(
    stream: &mut BitOutputStream,
    length: usize,
    min: usize,
    max: usize,
) -> PerResult<()> {
    if max <= CONSTRAINED_LENGTH_LIMIT {
        encode_constrained_number(stream, length as i64, min as i64, max as i64)
    } else {
        encode_length_determinant(stream, length).map(|_| ())
    }
}

/// Decode a length whose bounds are known
pub fn decode_constrained_length_determinant(
    stream: &mut BitInputStream<'_>,
    min: usize,
    max: usize,
) -> PerResult<usize> {
    if max <= CONSTRAINED_LENGTH_LIMIT {
        let length = decode_constrained_number(stream, min as i64, max as i64)?;
        Ok(length as usize)
    } else {
        decode_length_determinant(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(length: usize) -> PerResult<Vec<u8>> {
        let mut stream = BitOutputStream::new();
        encode_length_determinant(&mut stream, length)?;
        Ok(stream.into_bytes().to_vec())
    }

    #[test]
    fn test_length_boundaries() {
        assert_eq!(encode(127).unwrap(), vec![0x7F]);
        assert_eq!(encode(128).unwrap(), vec![0x80, 0x80]);
        assert_eq!(encode(16383).unwrap(), vec![0xBF, 0xFF]);
        assert!(matches!(encode(16384), Err(PerError::UnsupportedLength(16384))));
    }

    #[test]
    fn test_length_roundtrip() {
        for length in [0usize, 1, 127, 128, 300, 16383] {
            let bytes = encode(length).unwrap();
            let mut stream = BitInputStream::new(&bytes);
            assert_eq!(decode_length_determinant(&mut stream).unwrap(), length);
        }
    }

    #[test]
    fn test_length_is_aligned() {
        let mut stream = BitOutputStream::new();
        stream.write_bit(true);
        encode_length_determinant(&mut stream, 5).unwrap();
        assert_eq!(stream.into_bytes().as_ref(), &[0x80, 0x05]);
    }

    #[test]
    fn test_reject_fragment_prefix() {
        let data = [0xC1, 0x00];
        let mut stream = BitInputStream::new(&data);
        assert!(matches!(
            decode_length_determinant(&mut stream),
            Err(PerError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_constrained_length_uses_whole_number() {
        let mut stream = BitOutputStream::new();
        encode_constrained_length_determinant(&mut stream, 3, 0, 7).unwrap();
        // 3 bits, aligned first
        assert_eq!(stream.position(), 3);
        let bytes = stream.into_bytes();
        let mut input = BitInputStream::new(&bytes);
        assert_eq!(decode_constrained_length_determinant(&mut input, 0, 7).unwrap(), 3);

        let mut stream = BitOutputStream::new();
        encode_constrained_length_determinant(&mut stream, 3, 0, 70_000).unwrap();
        assert_eq!(stream.into_bytes().as_ref(), &[0x03]);
    }
}
