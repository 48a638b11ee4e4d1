//! Bit packing: sequences of single bits to bytes and back.
//!
//! Both directions operate MSB-first (most significant bit first), which is
//! the order in which prefix codes are concatenated into a payload.
//!
//! # Padding Rules
//! - `pack`/`BitWriter`: pad the final partial byte with trailing zeros
//! - `unpack`/`BitReader`: padding bits are indistinguishable from data; the
//!   caller must know how many symbols to decode
//!
//! # Example
//! ```
//! use huffarc_core::bitio::{pack, unpack};
//!
//! let bits = [true, false, true, true, true];
//! let bytes = pack(&bits);
//! assert_eq!(bytes, vec![0b1011_1000]);
//! assert_eq!(&unpack(&bytes)[..5], &bits);
//! ```

use crate::codebook::Code;
use crate::error::{BitIoError, Result};

/// Group bits into bytes MSB-first, right-padding the last byte with zeros.
///
/// Output length is `ceil(bits.len() / 8)`.
pub fn pack(bits: &[bool]) -> Vec<u8> {
    let mut writer = BitWriter::with_capacity(bits.len().div_ceil(8));
    for &bit in bits {
        writer.write_bit(bit);
    }
    writer.finish()
}

/// Expand each byte into 8 bits, MSB-first.
pub fn unpack(bytes: &[u8]) -> Vec<bool> {
    BitReader::new(bytes).collect()
}

/// Writes bits MSB-first into a byte buffer.
///
/// # Invariants
/// - `bit_count` is always < 8
/// - unused low bits of `bit_buffer` are zero
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    /// Completed bytes
    bytes: Vec<u8>,
    /// Accumulator for the current partial byte (MSB-aligned)
    bit_buffer: u8,
    /// Number of bits in bit_buffer (0-7)
    bit_count: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer expecting roughly `bytes` bytes of output.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// Append a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        if bit {
            self.bit_buffer |= 0x80 >> self.bit_count;
        }
        self.bit_count += 1;

        if self.bit_count == 8 {
            self.bytes.push(self.bit_buffer);
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
    }

    /// Append every bit of a prefix code, first bit first.
    pub fn write_code(&mut self, code: &Code) {
        for &bit in code.bits() {
            self.write_bit(bit);
        }
    }

    /// Finish writing and return the output bytes.
    ///
    /// Remaining bits are flushed as a final byte padded with zeros.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.bytes.push(self.bit_buffer);
        }
        self.bytes
    }

    /// Total number of bits written (including the partial byte).
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.bit_count as usize
    }
}

/// Reads bits MSB-first from a byte buffer.
///
/// # Invariants
/// - `bit_position` never exceeds `data.len() * 8`
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Current bit position (0 = MSB of first byte)
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    /// Read a single bit.
    ///
    /// # Errors
    /// `BitIoError::UnexpectedEof` once every bit has been consumed.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.is_empty() {
            return Err(BitIoError::UnexpectedEof {
                position: self.bit_position,
            }
            .into());
        }

        let byte = self.data[self.bit_position / 8];
        let bit = byte & (0x80 >> (self.bit_position % 8)) != 0;
        self.bit_position += 1;
        Ok(bit)
    }

    /// Return the number of bits remaining in the buffer.
    pub fn bits_remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_position
    }

    /// Return the current bit position.
    pub fn position(&self) -> usize {
        self.bit_position
    }

    /// Check if we're at the end of the buffer.
    pub fn is_empty(&self) -> bool {
        self.bit_position >= self.data.len() * 8
    }

    /// True when every unread bit is zero.
    ///
    /// Used after the last symbol to tell padding apart from leftover data.
    pub fn rest_is_zero(&self) -> bool {
        let mut probe = self.clone();
        while let Ok(bit) = probe.read_bit() {
            if bit {
                return false;
            }
        }
        true
    }
}

impl Iterator for BitReader<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        self.read_bit().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bits_remaining();
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_single_byte() {
        let bits = [true, false, true, true, false, false, true, true];
        assert_eq!(pack(&bits), vec![0b10110011]);
    }

    #[test]
    fn test_padding() {
        assert_eq!(pack(&[true]), vec![0b10000000]);
        assert_eq!(pack(&[true, false, true, true, true]), vec![0b10111000]);
    }

    #[test]
    fn test_output_length() {
        assert!(pack(&[]).is_empty());
        for n in [1usize, 7, 8, 9, 15, 16, 17, 100] {
            assert_eq!(pack(&vec![true; n]).len(), n.div_ceil(8));
        }
    }

    #[test]
    fn test_unpack_msb_first() {
        let bits = unpack(&[0b10100000, 0xFF]);
        assert_eq!(bits.len(), 16);
        assert_eq!(&bits[..4], &[true, false, true, false]);
        assert!(bits[8..].iter().all(|&b| b));
    }

    #[test]
    fn test_unpack_keeps_padding() {
        let bits = [false, true, true];
        let unpacked = unpack(&pack(&bits));
        assert_eq!(unpacked.len(), 8);
        assert_eq!(&unpacked[..3], &bits);
        assert!(unpacked[3..].iter().all(|&b| !b));
    }

    #[test]
    fn test_write_code() {
        let mut writer = BitWriter::new();
        writer.write_code(&"101".parse().unwrap());
        writer.write_code(&"11".parse().unwrap());
        assert_eq!(writer.bit_len(), 5);
        assert_eq!(writer.finish(), vec![0b10111000]);
    }

    #[test]
    fn test_read_past_end() {
        let data = [0b10101010];
        let mut reader = BitReader::new(&data);
        for _ in 0..8 {
            reader.read_bit().unwrap();
        }
        assert!(reader.is_empty());
        assert!(reader.read_bit().is_err());
    }

    #[test]
    fn test_bits_remaining() {
        let data = [0xFF, 0x00];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.bits_remaining(), 16);
        for _ in 0..5 {
            reader.read_bit().unwrap();
        }
        assert_eq!(reader.bits_remaining(), 11);
        assert_eq!(reader.position(), 5);
        assert!(!reader.rest_is_zero());
        for _ in 0..3 {
            reader.read_bit().unwrap();
        }
        assert!(reader.rest_is_zero());
    }
}
