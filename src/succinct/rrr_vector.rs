//! Compressed bit vector with constant-time rank and access
//!
//! [`RrrVector`] freezes a bit sequence and answers `rank_ones`,
//! `rank_zeroes` and `access` in constant time: prefix ranks are sampled
//! every `sample_rate` bits into a packed vector, and the remainder of a
//! query is a handful of hardware popcounts over the raw words.

use crate::containers::FixedIntVec;
use crate::error::{Result, TextZipError};
use crate::io::{check_serial_version, DataInput, DataOutput};
use crate::succinct::bit_math::{high_mask, low_mask, min_bits};
use crate::succinct::BitVector;

const SERIAL_VERSION: u8 = 0;

/// Immutable bit vector with O(1) rank on ones and zeroes
pub struct RrrVector {
    length: usize,
    sample_rate: u32,
    raw: Vec<u64>,
    samples: FixedIntVec,
}

impl RrrVector {
    /// Freezes `bits` with prefix-rank samples every `sample_rate` bits.
    pub fn new(bits: &BitVector, sample_rate: u32) -> Self {
        Self::from_words(bits.blocks().to_vec(), bits.len(), sample_rate)
    }

    /// Builds from raw `u64` words holding `length` bits (LSB-first within
    /// each word).
    pub fn from_words(raw: Vec<u64>, length: usize, sample_rate: u32) -> Self {
        debug_assert!(sample_rate > 0);
        let sample_width = min_bits(length as u64);
        let num_samples = length / sample_rate as usize + 1;
        let mut samples = FixedIntVec::new(num_samples, sample_width);

        let mut running = 0u64;
        let mut next_boundary = 0usize;
        let mut sample_index = 0usize;
        for (word_index, &word) in raw.iter().enumerate() {
            let base = word_index * 64;
            if base >= length {
                break;
            }
            let valid = (length - base).min(64) as u32;
            while sample_index < num_samples && next_boundary <= base + valid as usize {
                let within = (next_boundary - base) as u32;
                let partial =
                    if within == 0 { 0 } else { (word & low_mask(within)).count_ones() as u64 };
                samples.set(sample_index, running + partial);
                sample_index += 1;
                next_boundary += sample_rate as usize;
            }
            running += (word & low_mask(valid)).count_ones() as u64;
        }
        while sample_index < num_samples {
            samples.set(sample_index, running);
            sample_index += 1;
        }

        Self { length, sample_rate, raw, samples }
    }

    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the vector holds no bits.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the sampling rate of the prefix-rank samples.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the bit at `index`, or `OutOfRange` when `index` is not in
    /// `[0, len)`.
    pub fn access(&self, index: usize) -> Result<bool> {
        if index >= self.length {
            return Err(TextZipError::out_of_range(index as i64, self.length as u64));
        }
        Ok((self.raw[index / 64] >> (index % 64)) & 1 == 1)
    }

    /// Counts the 1-bits strictly before `pos`. Positions beyond the end
    /// clamp to the total popcount.
    pub fn rank_ones(&self, pos: usize) -> usize {
        let pos = pos.min(self.length);
        let sample = pos / self.sample_rate as usize;
        let start = sample * self.sample_rate as usize;
        let mut rank = self.samples.get(sample, self.samples.width()) as usize;
        if start == pos {
            return rank;
        }

        let start_word = start / 64;
        let end_word = pos / 64;
        if start_word == end_word {
            let mask = low_mask((pos % 64) as u32) & high_mask((start % 64) as u32);
            rank += (self.raw[start_word] & mask).count_ones() as usize;
        } else {
            rank += (self.raw[start_word] >> (start % 64)).count_ones() as usize;
            for word in &self.raw[start_word + 1..end_word] {
                rank += word.count_ones() as usize;
            }
            if pos % 64 > 0 {
                rank += (self.raw[end_word] & low_mask((pos % 64) as u32)).count_ones() as usize;
            }
        }
        rank
    }

    /// Counts the 0-bits strictly before `pos`. Positions beyond the end
    /// clamp to the total zero count.
    pub fn rank_zeroes(&self, pos: usize) -> usize {
        let pos = pos.min(self.length);
        pos - self.rank_ones(pos)
    }

    /// Total number of 1-bits.
    pub fn count_ones(&self) -> usize {
        self.rank_ones(self.length)
    }

    /// Returns the bit at `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.length {
            return None;
        }
        Some((self.raw[index / 64] >> (index % 64)) & 1 == 1)
    }

    /// Bytes consumed by the raw bits plus the sample array. Used to compare
    /// candidate encodings when sizing wavelet-tree blocks.
    pub fn estimated_memory_usage(&self) -> usize {
        self.raw.len() * 8 + self.samples.size_in_bytes()
    }

    /// The [`estimated_memory_usage`](Self::estimated_memory_usage) a vector
    /// of `num_bits` bits would have at `sample_rate`, without building it.
    pub fn estimated_size_for(num_bits: usize, sample_rate: u32) -> usize {
        let words = (num_bits as u64).div_ceil(64) as usize;
        let num_samples = num_bits / sample_rate as usize + 1;
        let sample_bits = num_samples as u64 * min_bits(num_bits as u64) as u64;
        words * 8 + sample_bits.div_ceil(64) as usize * 8
    }

    /// Serializes this vector to a [`DataOutput`].
    pub fn write<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_u8(SERIAL_VERSION)?;
        output.write_u64(self.length as u64)?;
        output.write_u32(self.sample_rate)?;
        output.write_array_len(self.raw.len())?;
        for &word in &self.raw {
            output.write_u64(word)?;
        }
        self.samples.write(output)
    }

    /// Deserializes a vector from a [`DataInput`].
    pub fn read<R: DataInput>(input: &mut R) -> Result<Self> {
        check_serial_version(SERIAL_VERSION, input.read_u8()?)?;
        let length = input.read_u64()? as usize;
        let sample_rate = input.read_u32()?;
        let words = input.read_array_len()?;
        let mut raw = vec![0u64; words];
        for word in raw.iter_mut() {
            *word = input.read_u64()?;
        }
        let samples = FixedIntVec::read(input)?;
        Ok(Self { length, sample_rate, raw, samples })
    }
}
