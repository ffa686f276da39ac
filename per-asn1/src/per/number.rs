//! Whole number encodings (ITU-T X.691 clauses 10.5 - 10.8)
//!
//! The encoding form of a constrained whole number depends only on its
//! range `max - min`:
//!
//! | range            | form                                              |
//! |------------------|---------------------------------------------------|
//! | 0                | nothing, the value is implied                     |
//! | 1 ..= 255        | aligned bit-field of `ceil(log2(range + 1))` bits |
//! | 256 ..= 65535    | two aligned octets                                |
//! | 65536 and above  | constrained octet count, then minimal octets      |
//!
//! Semi-constrained and unconstrained numbers always carry a length
//! determinant followed by minimal two's-complement octets.

use crate::bitstream::{BitInputStream, BitOutputStream};
use crate::per::length::{
    decode_constrained_length_determinant, decode_length_determinant,
    encode_constrained_length_determinant, encode_length_determinant,
};
use per_core::{PerError, PerResult};

/// Minimum octets holding `value` as a two's-complement integer
pub fn signed_octet_len(value: i128) -> usize {
    let mut len = 1;
    while len < 16 {
        let bits = len * 8;
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        if value >= min && value <= max {
            break;
        }
        len += 1;
    }
    len
}

/// Minimum octets holding `value` as a non-negative binary integer (at least one)
pub fn unsigned_octet_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

/// Number of bits needed to represent every offset in `0..=range`
pub fn bit_len(range: u64) -> u32 {
    64 - range.leading_zeros()
}

pub(crate) fn write_signed_octets(stream: &mut BitOutputStream, value: i128, len: usize) {
    for index in (0..len).rev() {
        stream.write_byte((value >> (8 * index)) as u8);
    }
}

pub(crate) fn write_unsigned_octets(stream: &mut BitOutputStream, value: u64, len: usize) {
    for index in (0..len).rev() {
        stream.write_byte((value >> (8 * index)) as u8);
    }
}

/// Interpret big-endian two's-complement octets
pub(crate) fn signed_from_octets(octets: &[u8]) -> PerResult<i128> {
    if octets.is_empty() || octets.len() > 16 {
        return Err(PerError::MalformedInput(format!(
            "Invalid integer length: {} octets",
            octets.len()
        )));
    }
    let mut value: i128 = if octets[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in octets {
        value = (value << 8) | i128::from(byte);
    }
    Ok(value)
}

/// Interpret big-endian unsigned octets
pub(crate) fn unsigned_from_octets(octets: &[u8]) -> PerResult<u64> {
    if octets.is_empty() || octets.len() > 8 {
        return Err(PerError::MalformedInput(format!(
            "Invalid unsigned integer length: {} octets",
            octets.len()
        )));
    }
    Ok(octets.iter().fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)))
}

fn narrow(value: i128) -> PerResult<i64> {
    i64::try_from(value)
        .map_err(|_| PerError::MalformedInput(format!("Integer {} does not fit in 64 bits", value)))
}

fn range_of(min: i64, max: i64) -> PerResult<u64> {
    if min > max {
        return Err(PerError::InvalidMetadata(format!(
            "Empty value range: min {} > max {}",
            min, max
        )));
    }
    Ok((i128::from(max) - i128::from(min)) as u64)
}

/// Encode a constrained whole number (X.691 10.5)
pub fn encode_constrained_number(
    stream: &mut BitOutputStream,
    value: i64,
    min: i64,
    max: i64,
) -> PerResult<()> {
    let range = range_of(min, max)?;
    if value < min || value > max {
        return Err(PerError::ConstraintViolation(format!(
            "Value {} outside range [{}, {}]",
            value, min, max
        )));
    }
    let narrowed = (i128::from(value) - i128::from(min)) as u64;

    if range == 0 {
        return Ok(());
    }

    if range < 256 {
        stream.align();
        stream.write_bits(narrowed, bit_len(range));
    } else if range < 65536 {
        stream.align();
        stream.write_bits(narrowed, 16);
    } else {
        let len = unsigned_octet_len(narrowed);
        encode_constrained_length_determinant(stream, len, 1, unsigned_octet_len(range))?;
        stream.align();
        write_unsigned_octets(stream, narrowed, len);
    }
    Ok(())
}

/// Decode a constrained whole number (X.691 10.5)
pub fn decode_constrained_number(stream: &mut BitInputStream<'_>, min: i64, max: i64) -> PerResult<i64> {
    let range = range_of(min, max)?;
    if range == 0 {
        return Ok(min);
    }

    let narrowed = if range < 256 {
        stream.align();
        stream.read_bits(bit_len(range))?
    } else if range < 65536 {
        stream.align();
        stream.read_bits(16)?
    } else {
        let len = decode_constrained_length_determinant(stream, 1, unsigned_octet_len(range))?;
        stream.align();
        unsigned_from_octets(&stream.read_bytes(len)?)?
    };

    if narrowed > range {
        return Err(PerError::ConstraintViolation(format!(
            "Decoded offset {} exceeds range [{}, {}]",
            narrowed, min, max
        )));
    }
    narrow(i128::from(min) + i128::from(narrowed))
}

/// Encode a semi-constrained whole number (X.691 10.7)
///
/// The offset from `min` is written as minimal two's-complement octets after
/// a length determinant.
pub fn encode_semi_constrained_number(stream: &mut BitOutputStream, value: i64, min: i64) -> PerResult<()> {
    if value < min {
        return Err(PerError::ConstraintViolation(format!(
            "Value {} below lower bound {}",
            value, min
        )));
    }
    let narrowed = i128::from(value) - i128::from(min);
    let len = signed_octet_len(narrowed);
    encode_length_determinant(stream, len)?;
    stream.align();
    write_signed_octets(stream, narrowed, len);
    Ok(())
}

/// Decode a semi-constrained whole number (X.691 10.7)
pub fn decode_semi_constrained_number(stream: &mut BitInputStream<'_>, min: i64) -> PerResult<i64> {
    let len = decode_length_determinant(stream)?;
    if len == 0 || len > 9 {
        return Err(PerError::MalformedInput(format!(
            "Invalid semi-constrained integer length: {} octets",
            len
        )));
    }
    stream.align();
    let narrowed = signed_from_octets(&stream.read_bytes(len)?)?;
    if narrowed < 0 {
        return Err(PerError::MalformedInput(format!(
            "Negative offset {} in semi-constrained integer",
            narrowed
        )));
    }
    narrow(i128::from(min) + narrowed)
}

/// Encode an unconstrained whole number (X.691 10.8)
pub fn encode_unconstrained_number(stream: &mut BitOutputStream, value: i64) -> PerResult<()> {
    let len = signed_octet_len(i128::from(value));
    encode_length_determinant(stream, len)?;
    stream.align();
    write_signed_octets(stream, i128::from(value), len);
    Ok(())
}

/// Decode an unconstrained whole number (X.691 10.8)
pub fn decode_unconstrained_number(stream: &mut BitInputStream<'_>) -> PerResult<i64> {
    let len = decode_length_determinant(stream)?;
    if len == 0 || len > 8 {
        return Err(PerError::MalformedInput(format!(
            "Invalid unconstrained integer length: {} octets",
            len
        )));
    }
    stream.align();
    narrow(signed_from_octets(&stream.read_bytes(len)?)?)
}

/// Encode a normally small non-negative whole number (X.691 10.6)
///
/// Values below 64 take a `0` flag bit plus six bits; anything larger takes
/// a `1` flag bit followed by a semi-constrained number with lower bound 0.
pub fn encode_normally_small_number(stream: &mut BitOutputStream, value: u64) -> PerResult<()> {
    if value < 64 {
        stream.write_bit(false);
        stream.write_bits(value, 6);
        Ok(())
    } else {
        let value = i64::try_from(value)
            .map_err(|_| PerError::ConstraintViolation(format!("Index {} too large", value)))?;
        stream.write_bit(true);
        encode_semi_constrained_number(stream, value, 0)
    }
}

/// Decode a normally small non-negative whole number (X.691 10.6)
pub fn decode_normally_small_number(stream: &mut BitInputStream<'_>) -> PerResult<u64> {
    if stream.read_bit()? {
        let value = decode_semi_constrained_number(stream, 0)?;
        Ok(value as u64)
    } else {
        stream.read_bits(6)
    }
}
