//! Bit input stream

use per_core::{PerError, PerResult};

/// Reads bits MSB-first from a byte slice
///
/// The position is tracked in bits. Reading past the end of the buffer is a
/// [`PerError::MalformedInput`] error.
pub struct BitInputStream<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BitInputStream<'a> {
    /// Create a new stream over `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Current position in bits
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bits left to read
    pub fn remaining_bits(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.position)
    }

    /// Whether the next bit starts a new octet
    pub fn is_aligned(&self) -> bool {
        self.position % 8 == 0
    }

    fn ensure(&self, bits: usize) -> PerResult<()> {
        if bits > self.remaining_bits() {
            return Err(PerError::MalformedInput(format!(
                "Unexpected end of stream: need {} bits, have {}",
                bits,
                self.remaining_bits()
            )));
        }
        Ok(())
    }

    /// Read a single bit
    pub fn read_bit(&mut self) -> PerResult<bool> {
        self.ensure(1)?;
        let byte = self.buffer[self.position / 8];
        let bit = (byte >> (7 - self.position % 8)) & 1 == 1;
        self.position += 1;
        Ok(bit)
    }

    /// Read a `width`-bit field, most significant bit first
    pub fn read_bits(&mut self, width: u32) -> PerResult<u64> {
        debug_assert!(width <= 64, "bit width must be 0..=64, got {width}");
        self.ensure(width as usize)?;
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Read one octet from the current bit position
    pub fn read_byte(&mut self) -> PerResult<u8> {
        if self.is_aligned() {
            self.ensure(8)?;
            let byte = self.buffer[self.position / 8];
            self.position += 8;
            Ok(byte)
        } else {
            Ok(self.read_bits(8)? as u8)
        }
    }

    /// Read `count` octets from the current bit position
    pub fn read_bytes(&mut self, count: usize) -> PerResult<Vec<u8>> {
        self.ensure(count.saturating_mul(8))?;
        if self.is_aligned() {
            let start = self.position / 8;
            self.position += count * 8;
            Ok(self.buffer[start..start + count].to_vec())
        } else {
            (0..count).map(|_| self.read_byte()).collect()
        }
    }

    /// Skip the unread bits of the current octet
    ///
    /// Does nothing when the stream is already aligned.
    pub fn align(&mut self) {
        let aligned = self.position.div_ceil(8) * 8;
        self.position = aligned.min(self.buffer.len() * 8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits() {
        let data = [0b1010_0000, 0xFF];
        let mut stream = BitInputStream::new(&data);
        assert!(stream.read_bit().unwrap());
        assert_eq!(stream.read_bits(3).unwrap(), 0b010);
        stream.align();
        assert_eq!(stream.position(), 8);
        assert_eq!(stream.read_byte().unwrap(), 0xFF);
        assert_eq!(stream.remaining_bits(), 0);
    }

    #[test]
    fn test_unaligned_bytes() {
        let data = [0xFF, 0x80];
        let mut stream = BitInputStream::new(&data);
        assert!(stream.read_bit().unwrap());
        assert_eq!(stream.read_bytes(1).unwrap(), vec![0xFF]);
        assert_eq!(stream.position(), 9);
    }

    #[test]
    fn test_read_past_end() {
        let data = [0x00];
        let mut stream = BitInputStream::new(&data);
        assert!(stream.read_bits(9).is_err());
        assert!(stream.read_bytes(2).is_err());
        assert_eq!(stream.read_bits(8).unwrap(), 0);
        assert!(matches!(stream.read_bit(), Err(PerError::MalformedInput(_))));
    }
}
