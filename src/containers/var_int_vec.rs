//! Variable-width packed integer vector
//!
//! A raw bit stream addressed by absolute bit position. Each write may use
//! its own width; the caller is responsible for supplying matching widths
//! and positions on the read side.

use crate::error::Result;
use crate::io::{check_serial_version, DataInput, DataOutput};
use crate::succinct::bit_math::{high_mask, low_mask, min_bits};

const SERIAL_VERSION: u8 = 0;
const WORD_SIZE: u32 = 64;

/// A bit stream of heterogeneously sized integers packed into `u64` words
pub struct VarIntVec {
    data: Vec<u64>,
}

impl VarIntVec {
    /// Creates an empty vector holding `bits_size` raw bits.
    pub fn new(bits_size: u64) -> Self {
        let words = bits_size.div_ceil(64) as usize;
        Self { data: vec![0; words] }
    }

    /// Writes `value` at the absolute bit position `position` using `width`
    /// bits. Bits of `value` above `width` are masked off.
    pub fn set(&mut self, position: u64, value: u64, width: u32) {
        let word_index = (position >> 6) as usize;
        let offset = (position & 63) as u32;

        let value = value & low_mask(width);

        if offset + width < WORD_SIZE {
            self.data[word_index] &= high_mask(offset + width) | low_mask(offset);
            self.data[word_index] |= value << offset;
        } else {
            self.data[word_index] &= low_mask(offset);
            self.data[word_index] |= value << offset;
            let spill = (offset + width) & 63;
            if spill > 0 {
                self.data[word_index + 1] &= high_mask(spill);
                self.data[word_index + 1] |= value >> (width - spill);
            }
        }
    }

    /// Writes `value` at bit position `position` using the minimum number of
    /// bits that can represent it.
    ///
    /// Returns the width used, so the caller can advance its cursor.
    pub fn set_auto(&mut self, position: u64, value: u64) -> u32 {
        let width = min_bits(value);
        self.set(position, value, width);
        width
    }

    /// Reads `width` bits starting at the absolute bit position `position`.
    #[inline]
    pub fn get(&self, position: u64, width: u32) -> u64 {
        let word_index = (position >> 6) as usize;
        let offset = (position & 63) as u32;

        let low_part = self.data[word_index] >> offset;
        if offset + width > WORD_SIZE {
            let high_part =
                (self.data[word_index + 1] & low_mask((offset + width) & 63)) << (WORD_SIZE - offset);
            low_part | high_part
        } else {
            low_part & low_mask(width)
        }
    }

    /// Overwrites an entire 64-bit word at `word_index`.
    pub fn set_word(&mut self, word_index: usize, word: u64) {
        self.data[word_index] = word;
    }

    /// Returns the underlying word array.
    pub fn words(&self) -> &[u64] {
        &self.data
    }

    /// Returns the number of bytes used by the underlying word array.
    pub fn size_in_bytes(&self) -> usize {
        self.data.len() * 8
    }

    /// Serializes this vector to a [`DataOutput`].
    pub fn write<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_u8(SERIAL_VERSION)?;
        output.write_array_len(self.data.len())?;
        for &word in &self.data {
            output.write_u64(word)?;
        }
        Ok(())
    }

    /// Deserializes a vector from a [`DataInput`].
    pub fn read<R: DataInput>(input: &mut R) -> Result<Self> {
        check_serial_version(SERIAL_VERSION, input.read_u8()?)?;
        let words = input.read_array_len()?;
        let mut data = vec![0u64; words];
        for word in data.iter_mut() {
            *word = input.read_u64()?;
        }
        Ok(Self { data })
    }
}
