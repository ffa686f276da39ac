//! BIT STRING value type

use crate::error::{PerError, PerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arbitrary string of bits (zeros and ones). A bit string value can have any length including zero.
///
/// Bits are stored most-significant-bit first. The byte buffer always holds
/// exactly `ceil(num_bits / 8)` bytes and the unused low-order bits of the
/// last byte are zero, so two bit strings with the same bits compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitString {
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
    num_bits: usize,
}

impl BitString {
    /// Construct a new bit string object.
    ///
    /// # Arguments
    ///
    /// * `bit_string` - The bit string as a byte array
    /// * `num_bits` - The number of bits
    ///
    /// # Errors
    ///
    /// Returns an error if `num_bits > bit_string.len() * 8`.
    pub fn new(mut bit_string: Vec<u8>, num_bits: usize) -> PerResult<Self> {
        if num_bits > bit_string.len() * 8 {
            return Err(PerError::InvalidData(format!(
                "bit_string is too short to hold all bits. Need {} bytes for {} bits",
                num_bits.div_ceil(8),
                num_bits
            )));
        }

        bit_string.truncate(num_bits.div_ceil(8));
        let trailing = num_bits % 8;
        if trailing > 0 {
            if let Some(last) = bit_string.last_mut() {
                *last &= 0xFFu8 << (8 - trailing);
            }
        }

        Ok(Self {
            bytes: bit_string,
            num_bits,
        })
    }

    /// Get the bit string as byte array.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The number of bits in the byte array.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'")?;
        for index in 0..self.num_bits {
            let bit = (self.bytes[index / 8] >> (7 - index % 8)) & 1;
            write!(f, "{}", bit)?;
        }
        write!(f, "'B")
    }
}
