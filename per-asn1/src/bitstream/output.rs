//! Bit output stream

use bytes::{BufMut, Bytes, BytesMut};
use per_core::PerResult;
use std::io::Write;

/// Writes bits MSB-first into a growable buffer
///
/// Completed octets go straight to the `BytesMut` buffer; the partially
/// filled octet is kept in `current` until eight bits are collected or
/// [`align`](Self::align) pads it with zero bits.
pub struct BitOutputStream {
    buffer: BytesMut,
    current: u8,
    /// Number of bits already placed in `current` (0..8)
    bit_count: u8,
}

impl BitOutputStream {
    /// Create a new, empty stream
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            current: 0,
            bit_count: 0,
        }
    }

    /// Create a new stream with initial capacity in bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            current: 0,
            bit_count: 0,
        }
    }

    /// Write a single bit
    pub fn write_bit(&mut self, bit: bool) {
        if bit {
            self.current |= 0x80 >> self.bit_count;
        }
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.buffer.put_u8(self.current);
            self.current = 0;
            self.bit_count = 0;
        }
    }

    /// Write the low `width` bits of `value`, most significant first
    ///
    /// A width of 0 writes nothing.
    pub fn write_bits(&mut self, value: u64, width: u32) {
        debug_assert!(width <= 64, "bit width must be 0..=64, got {width}");
        for shift in (0..width).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
    }

    /// Write one octet at the current bit position
    pub fn write_byte(&mut self, byte: u8) {
        if self.bit_count == 0 {
            self.buffer.put_u8(byte);
        } else {
            self.write_bits(u64::from(byte), 8);
        }
    }

    /// Write a block of octets at the current bit position
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bit_count == 0 {
            self.buffer.put_slice(bytes);
        } else {
            for &byte in bytes {
                self.write_bits(u64::from(byte), 8);
            }
        }
    }

    /// Pad with zero bits up to the next octet boundary
    ///
    /// Does nothing when the stream is already aligned.
    pub fn align(&mut self) {
        if self.bit_count > 0 {
            self.buffer.put_u8(self.current);
            self.current = 0;
            self.bit_count = 0;
        }
    }

    /// Whether the next bit starts a new octet
    pub fn is_aligned(&self) -> bool {
        self.bit_count == 0
    }

    /// Number of bits written so far
    pub fn position(&self) -> usize {
        self.buffer.len() * 8 + usize::from(self.bit_count)
    }

    /// Align and return the encoded octets
    pub fn into_bytes(mut self) -> Bytes {
        self.align();
        self.buffer.freeze()
    }

    /// Align and copy the encoded octets into `out`
    ///
    /// # Returns
    /// Number of octets written
    pub fn write_to<W: Write>(self, out: &mut W) -> PerResult<usize> {
        let bytes = self.into_bytes();
        out.write_all(&bytes)?;
        Ok(bytes.len())
    }
}

impl Default for BitOutputStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits_msb_first() {
        let mut stream = BitOutputStream::new();
        stream.write_bit(true);
        stream.write_bits(0b010, 3);
        assert_eq!(stream.position(), 4);
        stream.align();
        assert_eq!(stream.into_bytes().as_ref(), &[0b1010_0000]);
    }

    #[test]
    fn test_unaligned_byte_write() {
        let mut stream = BitOutputStream::new();
        stream.write_bit(true);
        stream.write_byte(0xFF);
        assert_eq!(stream.position(), 9);
        assert_eq!(stream.into_bytes().as_ref(), &[0xFF, 0x80]);
    }

    #[test]
    fn test_align_is_idempotent() {
        let mut stream = BitOutputStream::new();
        stream.write_bytes(&[0x01, 0x02]);
        stream.align();
        stream.align();
        assert!(stream.is_aligned());
        assert_eq!(stream.position(), 16);
    }

    #[test]
    fn test_write_to_sink() {
        let mut stream = BitOutputStream::new();
        stream.write_bits(0x3, 2);
        let mut sink = Vec::new();
        let written = stream.write_to(&mut sink).unwrap();
        assert_eq!(written, 1);
        assert_eq!(sink, vec![0xC0]);
    }
}
