//! REAL encoding (ITU-T X.691 clause 15, contents per X.690 8.5)
//!
//! Doubles are written in the binary form with base 2 and no scaling
//! factor. The mantissa is stripped of trailing zero bits before encoding so
//! every value has exactly one, shortest, representation. Decoding rebuilds
//! the IEEE-754 bit pattern exactly and refuses any input that could only be
//! represented by rounding.

use crate::bitstream::{BitInputStream, BitOutputStream};
use crate::per::length::{decode_length_determinant, encode_length_determinant};
use crate::per::number::{signed_from_octets, signed_octet_len, unsigned_from_octets, unsigned_octet_len};
use per_core::{PerError, PerResult};

const PLUS_INFINITY: u8 = 0x40;
const MINUS_INFINITY: u8 = 0x41;
const NOT_A_NUMBER: u8 = 0x42;
const MINUS_ZERO: u8 = 0x43;

const BINARY_ENCODING: u8 = 0x80;
const SIGN_BIT: u8 = 0x40;

const FRACTION_MASK: u64 = 0x000F_FFFF_FFFF_FFFF;
const IMPLICIT_BIT: u64 = 1 << 52;
const EXPONENT_BIAS: i64 = 1023;
const MANTISSA_BITS: i64 = 52;

/// Build the content octets for `value`
///
/// `+0.0` yields no octets at all; infinities, NaN and `-0.0` yield their
/// one-octet special values.
pub fn real_content_octets(value: f64) -> Vec<u8> {
    if value.is_nan() {
        return vec![NOT_A_NUMBER];
    }
    if value == f64::INFINITY {
        return vec![PLUS_INFINITY];
    }
    if value == f64::NEG_INFINITY {
        return vec![MINUS_INFINITY];
    }

    let bits = value.to_bits();
    if bits == 0 {
        return Vec::new();
    }
    if value == 0.0 {
        return vec![MINUS_ZERO];
    }

    let negative = bits >> 63 == 1;
    let biased = ((bits >> 52) & 0x7FF) as i64;
    let (mut mantissa, mut exponent) = if biased == 0 {
        (bits & FRACTION_MASK, 1 - EXPONENT_BIAS - MANTISSA_BITS)
    } else {
        (
            (bits & FRACTION_MASK) | IMPLICIT_BIT,
            biased - EXPONENT_BIAS - MANTISSA_BITS,
        )
    };

    while mantissa & 0xFF == 0 {
        mantissa >>= 8;
        exponent += 8;
    }
    while mantissa & 0x01 == 0 {
        mantissa >>= 1;
        exponent += 1;
    }

    let exponent_len = signed_octet_len(i128::from(exponent));
    let mantissa_len = unsigned_octet_len(mantissa);

    let mut preamble = BINARY_ENCODING | (exponent_len as u8 - 1);
    if negative {
        preamble |= SIGN_BIT;
    }

    let mut octets = Vec::with_capacity(1 + exponent_len + mantissa_len);
    octets.push(preamble);
    for index in (0..exponent_len).rev() {
        octets.push((exponent >> (8 * index)) as u8);
    }
    for index in (0..mantissa_len).rev() {
        octets.push((mantissa >> (8 * index)) as u8);
    }
    octets
}

/// Rebuild a double from content octets
///
/// # Error Handling
/// - decimal (X.690 8.5.8) and base 8/16 forms are unsupported
/// - a value that does not fit a double without rounding is malformed
pub fn real_from_content_octets(octets: &[u8]) -> PerResult<f64> {
    let Some(&first) = octets.first() else {
        return Ok(0.0);
    };

    if first & BINARY_ENCODING == 0 {
        if octets.len() != 1 && first & 0xC0 == 0x40 {
            return Err(PerError::MalformedInput(format!(
                "Special real value 0x{:02X} with {} content octets",
                first,
                octets.len()
            )));
        }
        return match first {
            PLUS_INFINITY => Ok(f64::INFINITY),
            MINUS_INFINITY => Ok(f64::NEG_INFINITY),
            NOT_A_NUMBER => Ok(f64::NAN),
            MINUS_ZERO => Ok(-0.0),
            _ if first & 0xC0 == 0 => Err(PerError::Unsupported(
                "Decimal real encoding".to_string(),
            )),
            _ => Err(PerError::MalformedInput(format!(
                "Unknown special real value 0x{:02X}",
                first
            ))),
        };
    }

    let negative = first & SIGN_BIT != 0;
    let base = (first >> 4) & 0x03;
    if base != 0 {
        return Err(PerError::Unsupported(format!(
            "Real base {} (only base 2 is supported)",
            [2, 8, 16, 0][usize::from(base)]
        )));
    }
    let scale = u32::from((first >> 2) & 0x03);
    let exponent_code = first & 0x03;
    if exponent_code == 0x03 {
        return Err(PerError::Unsupported(
            "Real exponent longer than three octets".to_string(),
        ));
    }
    let exponent_len = usize::from(exponent_code) + 1;
    if octets.len() < 2 + exponent_len {
        return Err(PerError::MalformedInput(format!(
            "Real encoding of {} octets is too short",
            octets.len()
        )));
    }

    let exponent = signed_from_octets(&octets[1..1 + exponent_len])? as i64;
    let mantissa = unsigned_from_octets(&octets[1 + exponent_len..])?;
    if mantissa == 0 {
        return Err(PerError::MalformedInput("Zero mantissa in binary real".to_string()));
    }
    if mantissa.leading_zeros() < scale {
        return Err(PerError::MalformedInput("Real mantissa overflow".to_string()));
    }

    compose_double(negative, mantissa << scale, exponent)
}

/// Build the IEEE-754 double equal to `mantissa * 2^exponent`
fn compose_double(negative: bool, mut mantissa: u64, mut exponent: i64) -> PerResult<f64> {
    while mantissa >= IMPLICIT_BIT << 1 {
        if mantissa & 1 != 0 {
            return Err(PerError::MalformedInput(
                "Real mantissa exceeds double precision".to_string(),
            ));
        }
        mantissa >>= 1;
        exponent += 1;
    }
    while mantissa < IMPLICIT_BIT {
        mantissa <<= 1;
        exponent -= 1;
    }

    let mut biased = exponent + MANTISSA_BITS + EXPONENT_BIAS;
    if biased >= 0x7FF {
        return Err(PerError::MalformedInput("Real exponent overflows a double".to_string()));
    }
    if biased <= 0 {
        let shift = 1 - biased;
        if shift > MANTISSA_BITS + 1 || mantissa & ((1u64 << shift) - 1) != 0 {
            return Err(PerError::MalformedInput(
                "Real value underflows a double".to_string(),
            ));
        }
        mantissa >>= shift;
        biased = 0;
    }

    let mut bits = ((biased as u64) << 52) | (mantissa & FRACTION_MASK);
    if negative {
        bits |= 1 << 63;
    }
    Ok(f64::from_bits(bits))
}

/// Encode a REAL: length determinant, alignment, content octets
pub fn encode_real(stream: &mut BitOutputStream, value: f64) -> PerResult<()> {
    let octets = real_content_octets(value);
    encode_length_determinant(stream, octets.len())?;
    stream.align();
    stream.write_bytes(&octets);
    Ok(())
}

/// Decode a REAL
pub fn decode_real(stream: &mut BitInputStream<'_>) -> PerResult<f64> {
    let len = decode_length_determinant(stream)?;
    stream.align();
    let octets = stream.read_bytes(len)?;
    real_from_content_octets(&octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: f64) -> f64 {
        let mut stream = BitOutputStream::new();
        encode_real(&mut stream, value).unwrap();
        let bytes = stream.into_bytes();
        let mut input = BitInputStream::new(&bytes);
        decode_real(&mut input).unwrap()
    }

    #[test]
    fn test_zero_has_no_payload() {
        assert!(real_content_octets(0.0).is_empty());
        let mut stream = BitOutputStream::new();
        encode_real(&mut stream, 0.0).unwrap();
        assert_eq!(stream.into_bytes().as_ref(), &[0x00]);
        assert_eq!(roundtrip(0.0).to_bits(), 0);
    }

    #[test]
    fn test_infinities() {
        let mut stream = BitOutputStream::new();
        encode_real(&mut stream, f64::INFINITY).unwrap();
        assert_eq!(stream.into_bytes().as_ref(), &[0x01, 0x40]);

        let mut stream = BitOutputStream::new();
        encode_real(&mut stream, f64::NEG_INFINITY).unwrap();
        assert_eq!(stream.into_bytes().as_ref(), &[0x01, 0x41]);

        assert_eq!(roundtrip(f64::INFINITY), f64::INFINITY);
        assert_eq!(roundtrip(f64::NEG_INFINITY), f64::NEG_INFINITY);
    }

    #[test]
    fn test_nan_and_negative_zero() {
        assert!(roundtrip(f64::NAN).is_nan());
        let negative_zero = roundtrip(-0.0);
        assert_eq!(negative_zero, 0.0);
        assert!(negative_zero.is_sign_negative());
    }

    #[test]
    fn test_one_and_a_half() {
        // 1.5 = 3 * 2^-1
        assert_eq!(real_content_octets(1.5), vec![0x80, 0xFF, 0x03]);
        assert_eq!(roundtrip(1.5).to_bits(), 1.5f64.to_bits());
        assert_eq!(real_content_octets(-1.5), vec![0xC0, 0xFF, 0x03]);
    }

    #[test]
    fn test_exact_roundtrip() {
        for value in [
            1.0,
            -2.0,
            0.1,
            std::f64::consts::PI,
            1e300,
            -1e-300,
            f64::MAX,
            f64::MIN_POSITIVE,
            5e-324,
            -2.2250738585072009e-308,
        ] {
            assert_eq!(roundtrip(value).to_bits(), value.to_bits(), "value {}", value);
        }
    }

    #[test]
    fn test_reject_decimal_form() {
        assert!(matches!(
            real_from_content_octets(&[0x01, b'1']),
            Err(PerError::Unsupported(_))
        ));
        assert!(real_from_content_octets(&[0x40, 0x00]).is_err());
    }
}
