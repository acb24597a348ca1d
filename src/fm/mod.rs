//! FM-Index: compressed full-text substring index
//!
//! An FM-Index couples the Burrows-Wheeler transform of the input with a
//! rank-enabled wavelet tree and sparsely sampled suffix-array positions.
//! It counts pattern occurrences, locates their offsets and extracts
//! arbitrary windows of the original text without decompressing the whole
//! input. Memory is sensitive to the alphabet size: fewer distinct symbols
//! mean a smaller index; space grows linearly with the input length.
//!
//! The `sample_rate` parameter trades space for locate/extract speed: one
//! extra position integer is stored for every `sample_rate`-th input symbol,
//! and a query walks at most `sample_rate` LF-mapping steps to reach one.
//!
//! An index is immutable after construction, so any number of threads may
//! query the same instance concurrently without synchronisation.

pub mod builder;

pub use builder::FmIndexBuilder;

use crate::algorithms::bwt::bwt_from_suffix_array;
use crate::algorithms::suffix_array::{SuffixArrayBuilder, SuffixArrayConfig};
use crate::containers::FixedIntVec;
use crate::error::{Result, TextZipError};
use crate::io::{check_serial_version, DataInput, DataOutput};
use crate::succinct::{min_bits, BitVector, RrrVector};
use crate::wavelet::FbbWavelet;
use std::collections::HashMap;
use std::fmt;

/// One unit of indexed text. Valid user symbols are `0 ..= MAX_SYMBOL`.
pub type Symbol = u16;

/// The largest supported symbol value (and the distinct-symbol limit).
pub const MAX_SYMBOL: u16 = 32_767;

const SERIAL_VERSION: u8 = 0;

/// Batch length of the rightward scan in the boundary extractions.
const RIGHT_SCAN_STEP: usize = 4;

/// Compressed, queryable index over a single immutable text
pub struct FmIndex {
    sample_rate: u32,
    enable_extract: bool,
    bit_width_suffixes: u32,
    bit_width_positions: u32,
    /// Mapped length: user length plus the appended sentinel
    length: usize,
    /// Code point to dense symbol id, in order of first appearance; id 0 is
    /// reserved for the sentinel (user NULs shift to id 1)
    symbol_map: HashMap<Symbol, u16>,
    /// `cumulative_counts[c]` counts the mapped symbols strictly smaller
    /// than `c` in the sentinel-terminated text
    cumulative_counts: Vec<u32>,
    /// Dense symbol id back to the original code point
    symbol_lookup: Vec<Symbol>,
    /// Sampled suffix-array values, indexed by sampled-bitmap rank
    suffixes: FixedIntVec,
    /// Inverse-suffix-array samples driving extraction; absent when
    /// extraction is disabled
    positions: Option<FixedIntVec>,
    /// Bit `i` set iff `SA[i]` is sampled
    sampled_suffixes: RrrVector,
    /// The BWT wrapped in a rank-enabled wavelet tree
    wavelet: FbbWavelet,
}

impl FmIndex {
    /// Builds an FM-Index over `text`.
    ///
    /// `sample_rate` controls the space/speed trade-off of locate and
    /// extract queries; `enable_extract` turns text recovery on (costing
    /// one extra packed position vector).
    ///
    /// Prefer [`FmIndexBuilder`] for the defaults.
    pub fn build(text: &[Symbol], sample_rate: u32, enable_extract: bool) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TextZipError::invalid_data("Sample rate must be positive"));
        }

        // Alphabet discovery in order of first appearance. Id 0 is the
        // sentinel; a text containing NUL shifts it (and everything after)
        // up by one so the sentinel stays unique.
        let mut symbol_map: HashMap<Symbol, u16> = HashMap::new();
        let mut symbol_lookup: Vec<Symbol> = vec![0];
        if text.contains(&0) {
            symbol_map.insert(0, 1);
            symbol_lookup.push(0);
        } else {
            symbol_map.insert(0, 0);
        }
        for &symbol in text {
            if !symbol_map.contains_key(&symbol) {
                symbol_map.insert(symbol, symbol_lookup.len() as u16);
                symbol_lookup.push(symbol);
            }
        }
        if symbol_map.len() > MAX_SYMBOL as usize {
            return Err(TextZipError::AlphabetTooLarge { limit: MAX_SYMBOL as usize });
        }
        let sigma = symbol_lookup.len();

        // Sentinel-terminated mapped sequence.
        let mut mapped: Vec<u16> = Vec::with_capacity(text.len() + 1);
        for &symbol in text {
            mapped.push(symbol_map.get(&symbol).copied().unwrap_or(0));
        }
        mapped.push(0);
        let length = mapped.len();

        // Cumulative counts: histogram shifted by one, then prefix sums.
        let mut cumulative_counts = vec![0u32; sigma + 1];
        for &id in &mapped {
            cumulative_counts[id as usize + 1] += 1;
        }
        for c in 1..=sigma {
            cumulative_counts[c] += cumulative_counts[c - 1];
        }

        let suffix_array =
            SuffixArrayBuilder::new(SuffixArrayConfig::default()).build(&mapped)?;

        // Sample the suffix array at text positions divisible by the rate.
        let rate = sample_rate as usize;
        let bit_width_suffixes = min_bits(length as u64);
        let mut suffixes = FixedIntVec::new(length / rate + 1, bit_width_suffixes);
        let mut sampled_bitmap = BitVector::zeroed(length);
        let mut slot = 0usize;
        for (i, &sa) in suffix_array.as_slice().iter().enumerate() {
            if sa as usize % rate == 0 {
                suffixes.set(slot, sa as u64);
                sampled_bitmap.set(i, true)?;
                slot += 1;
            }
        }
        let sampled_suffixes = RrrVector::new(&sampled_bitmap, sample_rate);

        // Inverse samples for extraction, with a wrap-around duplicate of
        // the first entry at the end.
        let (bit_width_positions, positions) = if enable_extract {
            let bit_width_positions = bit_width_suffixes;
            let mut positions = FixedIntVec::new(length / rate + 2, bit_width_positions);
            for (i, &sa) in suffix_array.as_slice().iter().enumerate() {
                if sa as usize % rate == 0 {
                    positions.set(sa as usize / rate, i as u64);
                }
            }
            let first = positions.get(0, bit_width_positions);
            positions.set((length - 1) / rate + 1, first);
            (bit_width_positions, Some(positions))
        } else {
            (0, None)
        };

        let bwt = bwt_from_suffix_array(&mapped, suffix_array.as_slice());
        drop(suffix_array);
        drop(mapped);
        let wavelet = FbbWavelet::with_sample_rate(&bwt, sample_rate)?;
        drop(bwt);

        Ok(Self {
            sample_rate,
            enable_extract,
            bit_width_suffixes,
            bit_width_positions,
            length,
            symbol_map,
            cumulative_counts,
            symbol_lookup,
            suffixes,
            positions,
            sampled_suffixes,
            wavelet,
        })
    }

    /// Returns the length of the indexed sequence including the sentinel.
    pub fn input_length(&self) -> u64 {
        self.length as u64
    }

    /// Returns the alphabet size, sentinel included.
    pub fn alphabet_size(&self) -> u32 {
        self.symbol_lookup.len() as u32
    }

    /// Returns the sample rate the index was built with.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns true when the index supports text recovery.
    pub fn is_extract_enabled(&self) -> bool {
        self.enable_extract
    }

    #[inline]
    fn map_symbol(&self, symbol: Symbol) -> u16 {
        self.symbol_map.get(&symbol).copied().unwrap_or(0)
    }

    /// Counts the occurrences of `pattern`. Patterns containing symbols
    /// outside the indexed alphabet occur zero times.
    pub fn count(&self, pattern: &[Symbol]) -> u64 {
        self.count_range(pattern, 0, pattern.len())
    }

    /// Counts the occurrences of `pattern[offset .. offset + len]` by
    /// backward search over the BWT interval.
    pub fn count_range(&self, pattern: &[Symbol], offset: usize, len: usize) -> u64 {
        match self.search_interval(pattern, offset, len) {
            Some((start, end)) => (end - start) as u64,
            None => 0,
        }
    }

    /// Backward search: the half-open BWT interval of suffixes prefixed by
    /// the pattern slice, or `None` when it cannot occur.
    fn search_interval(
        &self,
        pattern: &[Symbol],
        offset: usize,
        len: usize,
    ) -> Option<(usize, usize)> {
        if len == 0 || offset + len > pattern.len() {
            return None;
        }
        let mut i = offset + len - 1;
        let c = self.map_symbol(pattern[i]);
        if c == 0 {
            return None;
        }
        let mut start = self.cumulative_counts[c as usize] as usize;
        let mut end = self.cumulative_counts[c as usize + 1] as usize;

        while start < end && i >= offset + 1 {
            i -= 1;
            let c = self.map_symbol(pattern[i]);
            if c == 0 {
                return None;
            }
            let base = self.cumulative_counts[c as usize] as usize;
            start = base + self.wavelet.rank(start, c) as usize;
            end = base + self.wavelet.rank(end, c) as usize;
        }
        if start < end {
            Some((start, end))
        } else {
            None
        }
    }

    /// Locates all occurrences of `pattern`, writing text offsets into
    /// `dest`. See [`FmIndex::locate_range`].
    pub fn locate(&self, pattern: &[Symbol], dest: &mut [u32]) -> u32 {
        self.locate_range(pattern, 0, pattern.len(), dest, -1)
    }

    /// Locates occurrences of `pattern[offset .. offset + len]`.
    ///
    /// Writes at most `max_matches` text offsets into `dest` (negative
    /// means no cap beyond `dest.len()`) and returns the number written.
    /// The output order is BWT-interval order, not text order.
    pub fn locate_range(
        &self,
        pattern: &[Symbol],
        offset: usize,
        len: usize,
        dest: &mut [u32],
        max_matches: i32,
    ) -> u32 {
        let (start, end) = match self.search_interval(pattern, offset, len) {
            Some(interval) => interval,
            None => return 0,
        };

        let cap = if max_matches < 0 {
            dest.len()
        } else {
            (max_matches as usize).min(dest.len())
        };

        let mut written = 0usize;
        for j in (start + 1)..=end {
            if written == cap {
                break;
            }
            // LF-walk until a sampled BWT row, then add the walked distance.
            let mut k = j;
            let mut distance = 0u64;
            while let Some(false) = self.sampled_suffixes.get(k - 1) {
                let (_, c) = self.wavelet.inverse_select(k - 1);
                k = self.cumulative_counts[c as usize] as usize
                    + self.wavelet.rank(k, c) as usize;
                distance += 1;
            }
            let slot = self.sampled_suffixes.rank_ones(k) - 1;
            dest[written] = (self.suffixes.get(slot, self.bit_width_suffixes) + distance) as u32;
            written += 1;
        }
        written as u32
    }

    /// Extracts the original text in `[start, stop)` into
    /// `dest[dest_offset ..]`. Returns the number of symbols written.
    ///
    /// Fails when extraction was disabled at build time, when the range is
    /// invalid (`stop` must stay below the sentinel position), or when the
    /// destination cannot hold the result.
    pub fn extract(
        &self,
        start: usize,
        stop: usize,
        dest: &mut [Symbol],
        dest_offset: usize,
    ) -> Result<u32> {
        let positions = self.positions.as_ref().ok_or(TextZipError::ExtractNotEnabled)?;
        if start > stop || stop >= self.length {
            return Err(TextZipError::out_of_range(stop as i64, self.length as u64));
        }
        let range = stop - start;
        if dest.len().saturating_sub(dest_offset) < range {
            return Err(TextZipError::dest_too_small(range));
        }

        let rate = self.sample_rate as usize;
        let mut sample_position =
            positions.get(stop / rate + 1, self.bit_width_positions) as usize + 1;
        let mut skip_until_next_sampled = rate - stop % rate;
        if stop / rate == positions.len() - 2 {
            skip_until_next_sampled = self.length - stop;
        }

        let mut remaining = range;
        let mut distance = 0usize;
        while remaining > 0 {
            let (_, c) = self.wavelet.inverse_select(sample_position - 1);
            sample_position = self.cumulative_counts[c as usize] as usize
                + self.wavelet.rank(sample_position, c) as usize;
            if distance >= skip_until_next_sampled {
                dest[dest_offset + remaining - 1] = self.symbol_lookup[c as usize];
                remaining -= 1;
            }
            distance += 1;
        }
        Ok(range as u32)
    }

    /// Decodes the mapped symbol ids of text positions `[lo, hi)` into
    /// `out` via the same backward walk as [`FmIndex::extract`].
    fn decode_ids(&self, positions: &FixedIntVec, lo: usize, hi: usize, out: &mut [u16]) {
        debug_assert_eq!(out.len(), hi - lo);
        let rate = self.sample_rate as usize;
        let mut sample_position =
            positions.get(hi / rate + 1, self.bit_width_positions) as usize + 1;
        let mut skip_until_next_sampled = rate - hi % rate;
        if hi / rate == positions.len() - 2 {
            skip_until_next_sampled = self.length - hi;
        }

        let mut remaining = hi - lo;
        let mut distance = 0usize;
        while remaining > 0 {
            let (_, c) = self.wavelet.inverse_select(sample_position - 1);
            sample_position = self.cumulative_counts[c as usize] as usize
                + self.wavelet.rank(sample_position, c) as usize;
            if distance >= skip_until_next_sampled {
                out[remaining - 1] = c;
                remaining -= 1;
            }
            distance += 1;
        }
    }

    /// Leftward boundary scan: emits the symbols at `from`, `from - 1`, …
    /// until the boundary or the sentinel, writing them in text order at
    /// `dest[dest_offset ..]`. Returns the number of symbols written.
    fn scan_left_into(
        &self,
        positions: &FixedIntVec,
        from: usize,
        boundary_id: u16,
        dest: &mut [Symbol],
        dest_offset: usize,
    ) -> Result<usize> {
        let rate = self.sample_rate as usize;
        let stop = from + 1;
        let mut sample_position =
            positions.get(stop / rate + 1, self.bit_width_positions) as usize + 1;
        let mut skip_until_next_sampled = rate - stop % rate;
        if stop / rate == positions.len() - 2 {
            skip_until_next_sampled = self.length - stop;
        }

        // Fill from the back of the buffer, then shift into place.
        let mut down = dest.len();
        let mut distance = 0usize;
        loop {
            let (_, c) = self.wavelet.inverse_select(sample_position - 1);
            sample_position = self.cumulative_counts[c as usize] as usize
                + self.wavelet.rank(sample_position, c) as usize;
            if distance >= skip_until_next_sampled {
                if c == boundary_id || c == 0 {
                    break;
                }
                if down <= dest_offset {
                    return Err(TextZipError::dest_too_small(dest.len().saturating_sub(dest_offset)));
                }
                down -= 1;
                dest[down] = self.symbol_lookup[c as usize];
            }
            distance += 1;
        }

        let written = dest.len() - down;
        dest.copy_within(down.., dest_offset);
        Ok(written)
    }

    /// Rightward boundary scan in batches of [`RIGHT_SCAN_STEP`] positions:
    /// emits the symbols at `from + 1`, `from + 2`, … until the boundary or
    /// the sentinel, writing them at `dest[write_start ..]`.
    fn scan_right_into(
        &self,
        positions: &FixedIntVec,
        from: usize,
        boundary_id: u16,
        dest: &mut [Symbol],
        write_start: usize,
    ) -> Result<usize> {
        // user text ends at length - 2; length - 1 holds the sentinel
        let mut buffer = [0u16; RIGHT_SCAN_STEP];
        let mut position = from + 1;
        let mut written = 0usize;
        'scan: while position < self.length - 1 {
            let hi = (position + RIGHT_SCAN_STEP).min(self.length - 1);
            let window = &mut buffer[..hi - position];
            self.decode_ids(positions, position, hi, window);
            for &c in window.iter() {
                if c == boundary_id || c == 0 {
                    break 'scan;
                }
                if write_start + written >= dest.len() {
                    return Err(TextZipError::dest_too_small(write_start + written));
                }
                dest[write_start + written] = self.symbol_lookup[c as usize];
                written += 1;
            }
            position = hi;
        }
        Ok(written)
    }

    fn boundary_id(&self, boundary: Symbol) -> Result<u16> {
        let id = self.map_symbol(boundary);
        if id == 0 {
            return Err(TextZipError::BoundaryNotInAlphabet);
        }
        Ok(id)
    }

    fn check_extraction_bounds(&self, from: usize, dest: &[Symbol]) -> Result<&FixedIntVec> {
        let positions = self.positions.as_ref().ok_or(TextZipError::ExtractNotEnabled)?;
        if from >= self.length {
            return Err(TextZipError::out_of_range(from as i64, self.length as u64));
        }
        if dest.is_empty() {
            return Err(TextZipError::dest_too_small(0));
        }
        Ok(positions)
    }

    /// Extracts the maximal window around `from` that contains no
    /// `boundary` symbol, writing it at `dest[dest_offset ..]`. The
    /// boundary symbols themselves are not written; a side without a
    /// boundary ends at the text limit. Returns the number of symbols
    /// written (zero when `from` itself holds the boundary).
    pub fn extract_until_boundary(
        &self,
        from: usize,
        dest: &mut [Symbol],
        dest_offset: usize,
        boundary: Symbol,
    ) -> Result<u32> {
        let positions = self.check_extraction_bounds(from, dest)?;
        let boundary_id = self.boundary_id(boundary)?;
        if from == self.length - 1 {
            // the sentinel slot has an empty neighbourhood
            return Ok(0);
        }

        let mut at_from = [0u16; 1];
        self.decode_ids(positions, from, from + 1, &mut at_from);
        if at_from[0] == boundary_id {
            return Ok(0);
        }

        let left = self.scan_left_into(positions, from, boundary_id, dest, dest_offset)?;
        let right =
            self.scan_right_into(positions, from, boundary_id, dest, dest_offset + left)?;
        Ok((left + right) as u32)
    }

    /// Like [`FmIndex::extract_until_boundary`], emitting only the segment
    /// from the boundary on the left up to and including `from`.
    pub fn extract_until_boundary_left(
        &self,
        from: usize,
        dest: &mut [Symbol],
        dest_offset: usize,
        boundary: Symbol,
    ) -> Result<u32> {
        // the starting symbol itself is part of the left segment
        let positions = self.check_extraction_bounds(from + 1, dest)?;
        let boundary_id = self.boundary_id(boundary)?;
        let written = self.scan_left_into(positions, from, boundary_id, dest, dest_offset)?;
        Ok(written as u32)
    }

    /// Like [`FmIndex::extract_until_boundary`], emitting only the segment
    /// strictly after `from` up to the boundary on the right.
    pub fn extract_until_boundary_right(
        &self,
        from: usize,
        dest: &mut [Symbol],
        dest_offset: usize,
        boundary: Symbol,
    ) -> Result<u32> {
        let positions = self.check_extraction_bounds(from, dest)?;
        let boundary_id = self.boundary_id(boundary)?;
        if from == self.length - 1 {
            return Ok(0);
        }

        let mut at_from = [0u16; 1];
        self.decode_ids(positions, from, from + 1, &mut at_from);
        if at_from[0] == boundary_id {
            return Ok(0);
        }

        let written =
            self.scan_right_into(positions, from, boundary_id, dest, dest_offset)?;
        Ok(written as u32)
    }

    /// Serializes this index to a [`DataOutput`]. Alphabet-map entries are
    /// written in ascending code-point order so the output bytes are
    /// deterministic.
    pub fn write<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_u8(SERIAL_VERSION)?;
        output.write_u32(self.sample_rate)?;
        output.write_bool(self.enable_extract)?;
        output.write_u32(self.bit_width_suffixes)?;
        output.write_u32(self.bit_width_positions)?;
        output.write_u64(self.length as u64)?;

        let mut entries: Vec<(Symbol, u16)> =
            self.symbol_map.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_unstable();
        output.write_array_len(entries.len())?;
        for (code_point, id) in entries {
            output.write_u16(code_point)?;
            output.write_u16(id)?;
        }

        output.write_array_len(self.cumulative_counts.len())?;
        for &value in &self.cumulative_counts {
            output.write_u32(value)?;
        }
        output.write_array_len(self.symbol_lookup.len())?;
        for &value in &self.symbol_lookup {
            output.write_u16(value)?;
        }

        self.suffixes.write(output)?;
        if let Some(positions) = &self.positions {
            positions.write(output)?;
        }
        self.sampled_suffixes.write(output)?;
        self.wavelet.write(output)
    }

    /// Deserializes an index from a [`DataInput`].
    pub fn read<R: DataInput>(input: &mut R) -> Result<Self> {
        check_serial_version(SERIAL_VERSION, input.read_u8()?)?;
        let sample_rate = input.read_u32()?;
        let enable_extract = input.read_bool()?;
        let bit_width_suffixes = input.read_u32()?;
        let bit_width_positions = input.read_u32()?;
        let length = input.read_u64()? as usize;

        let num_entries = input.read_array_len()?;
        let mut symbol_map = HashMap::with_capacity(num_entries);
        for _ in 0..num_entries {
            let code_point = input.read_u16()?;
            let id = input.read_u16()?;
            symbol_map.insert(code_point, id);
        }

        let num_counts = input.read_array_len()?;
        let mut cumulative_counts = vec![0u32; num_counts];
        for value in cumulative_counts.iter_mut() {
            *value = input.read_u32()?;
        }
        let num_lookup = input.read_array_len()?;
        let mut symbol_lookup = vec![0u16; num_lookup];
        for value in symbol_lookup.iter_mut() {
            *value = input.read_u16()?;
        }

        let suffixes = FixedIntVec::read(input)?;
        let positions = if enable_extract { Some(FixedIntVec::read(input)?) } else { None };
        let sampled_suffixes = RrrVector::read(input)?;
        let wavelet = FbbWavelet::read(input)?;

        Ok(Self {
            sample_rate,
            enable_extract,
            bit_width_suffixes,
            bit_width_positions,
            length,
            symbol_map,
            cumulative_counts,
            symbol_lookup,
            suffixes,
            positions,
            sampled_suffixes,
            wavelet,
        })
    }
}

impl fmt::Display for FmIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FmIndex-sampleRate:{}-extract:{}", self.sample_rate, self.enable_extract)
    }
}

/// Decodes a UTF-8 byte string into symbols, failing with
/// `SymbolOverflow` when a code point exceeds [`MAX_SYMBOL`] and with an
/// invalid-data error for malformed UTF-8. Returns the number of symbols
/// written to `dest`.
pub fn convert_utf8_to_symbols(bytes: &[u8], dest: &mut [Symbol]) -> Result<u32> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| TextZipError::invalid_data(format!("Invalid UTF-8 pattern: {}", e)))?;
    let mut written = 0usize;
    for ch in text.chars() {
        let code_point = ch as u32;
        if code_point > MAX_SYMBOL as u32 {
            return Err(TextZipError::SymbolOverflow {
                limit: MAX_SYMBOL as u32,
                code_point,
            });
        }
        if written >= dest.len() {
            return Err(TextZipError::dest_too_small(written));
        }
        dest[written] = code_point as Symbol;
        written += 1;
    }
    Ok(written as u32)
}

/// Converts a string into a symbol sequence, failing with `SymbolOverflow`
/// when a code point exceeds [`MAX_SYMBOL`].
pub fn text_to_symbols(text: &str) -> Result<Vec<Symbol>> {
    text.chars()
        .map(|ch| {
            let code_point = ch as u32;
            if code_point > MAX_SYMBOL as u32 {
                return Err(TextZipError::SymbolOverflow { limit: MAX_SYMBOL as u32, code_point });
            }
            Ok(code_point as Symbol)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(text: &str, sample_rate: u32, enable_extract: bool) -> FmIndex {
        FmIndex::build(&text_to_symbols(text).unwrap(), sample_rate, enable_extract).unwrap()
    }

    fn naive_count(text: &str, pattern: &str) -> u64 {
        if pattern.is_empty() {
            return 0;
        }
        let text: Vec<char> = text.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        text.windows(pattern.len()).filter(|w| *w == &pattern[..]).count() as u64
    }

    #[test]
    fn test_count() {
        let text = "This is a long string";
        let fmi = index(text, 4, false);
        assert_eq!(fmi.count(&text_to_symbols("is").unwrap()), naive_count(text, "is"));
        assert_eq!(fmi.count(&text_to_symbols("string").unwrap()), 1);
        assert_eq!(fmi.count(&text_to_symbols("nope").unwrap()), 0);
        assert_eq!(fmi.count(&[]), 0);
    }

    #[test]
    fn test_count_with_multiple_sentinels() {
        let text = "This \0is a \0long string\0";
        let fmi = index(text, 4, true);
        assert_eq!(fmi.count(&text_to_symbols("is").unwrap()), 2);
        assert_eq!(fmi.count(&text_to_symbols("\0").unwrap()), 3);
    }

    #[test]
    fn test_count_range() {
        let text = "This is a long string";
        let fmi = index(text, 4, false);
        let pattern = text_to_symbols("is a long").unwrap();
        assert_eq!(fmi.count_range(&pattern, 0, 2), naive_count(text, "is"));
        assert_eq!(fmi.count_range(&pattern, 2, 1), naive_count(text, " "));
        // degenerate slices count zero
        assert_eq!(fmi.count_range(&pattern, 0, 0), 0);
        assert_eq!(fmi.count_range(&pattern, 5, 100), 0);
    }

    #[test]
    fn test_locate_simple() {
        let text = "abracadabra abracadabra";
        let fmi = index(text, 2, false);
        let pattern = text_to_symbols("abra").unwrap();
        let mut dest = [0u32; 16];
        let found = fmi.locate(&pattern, &mut dest);
        let mut offsets: Vec<u32> = dest[..found as usize].to_vec();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![0, 7, 12, 19]);
    }

    #[test]
    fn test_locate_cap_and_missing() {
        let text = "aaaaaaaaaa";
        let fmi = index(text, 1, false);
        let pattern = text_to_symbols("a").unwrap();
        let mut dest = [0u32; 4];
        assert_eq!(fmi.locate_range(&pattern, 0, 1, &mut dest, 3), 3);
        assert_eq!(fmi.locate_range(&pattern, 0, 1, &mut dest, -1), 4);
        let missing = text_to_symbols("b").unwrap();
        assert_eq!(fmi.locate(&missing, &mut dest), 0);
        let mut empty: [u32; 0] = [];
        assert_eq!(fmi.locate(&pattern, &mut empty), 0);
    }

    #[test]
    fn test_extract_round_trip() {
        let text = "What a string!\nNow this is long, indeed\nBut others could be longer.";
        let symbols = text_to_symbols(text).unwrap();
        for sample_rate in [1u32, 2, 4, 8, 32, 256] {
            let fmi = FmIndex::build(&symbols, sample_rate, true).unwrap();
            let mut dest = vec![0u16; text.chars().count()];
            let extracted = fmi.extract(0, symbols.len(), &mut dest, 0).unwrap();
            assert_eq!(extracted as usize, symbols.len());
            assert_eq!(dest, symbols, "rate {}", sample_rate);

            let extracted = fmi.extract(5, 19, &mut dest, 0).unwrap();
            assert_eq!(&dest[..extracted as usize], &symbols[5..19]);
        }
    }

    #[test]
    fn test_extract_errors() {
        let fmi = index("some text without recovery", 4, false);
        let mut dest = [0u16; 8];
        assert!(matches!(
            fmi.extract(0, 4, &mut dest, 0),
            Err(TextZipError::ExtractNotEnabled)
        ));
        assert!(matches!(
            fmi.extract_until_boundary(0, &mut dest, 0, b' ' as u16),
            Err(TextZipError::ExtractNotEnabled)
        ));

        let fmi = index("some text with recovery", 4, true);
        assert!(fmi.extract(0, 100, &mut dest, 0).is_err()); // stop past end
        assert!(fmi.extract(5, 2, &mut dest, 0).is_err()); // start > stop
        assert!(matches!(
            fmi.extract(0, 20, &mut dest, 0),
            Err(TextZipError::DestTooSmall { .. })
        ));
    }

    #[test]
    fn test_boundary_not_in_alphabet() {
        let fmi = index("line one\nline two", 4, true);
        let mut dest = [0u16; 32];
        assert!(matches!(
            fmi.extract_until_boundary(3, &mut dest, 0, '이' as u16),
            Err(TextZipError::BoundaryNotInAlphabet)
        ));
    }

    #[test]
    fn test_extract_until_boundary_variants() {
        let text = "What a string!\nNow this is long, indeed\nBut others could be longer.";
        let symbols = text_to_symbols(text).unwrap();
        let newline = b'\n' as u16;
        let chars: Vec<char> = text.chars().collect();

        let naive_until = |seed: usize| -> String {
            if chars[seed] == '\n' {
                return String::new();
            }
            let left = chars[..seed].iter().rposition(|&c| c == '\n').map_or(0, |p| p + 1);
            let right = chars[seed + 1..]
                .iter()
                .position(|&c| c == '\n')
                .map_or(chars.len(), |p| seed + 1 + p);
            chars[left..right].iter().collect()
        };

        for sample_rate in [1u32, 2, 4, 16, 64, 256] {
            let fmi = FmIndex::build(&symbols, sample_rate, true).unwrap();
            let mut dest = vec![0u16; 100];
            for seed in [0usize, 1, 14, 30, 40, 66] {
                let written =
                    fmi.extract_until_boundary(seed, &mut dest, 0, newline).unwrap() as usize;
                let actual: String =
                    dest[..written].iter().map(|&s| char::from_u32(s as u32).unwrap()).collect();
                assert_eq!(actual, naive_until(seed), "rate {} seed {}", sample_rate, seed);
            }
        }
    }

    #[test]
    fn test_extract_until_boundary_left_right() {
        let text = "key1=value1;key2=value2;key3=value3";
        let symbols = text_to_symbols(text).unwrap();
        let fmi = FmIndex::build(&symbols, 2, true).unwrap();
        let separator = b';' as u16;
        let mut dest = vec![0u16; 50];

        // position 14 is the 'y' of "key2"
        let written = fmi.extract_until_boundary_left(14, &mut dest, 0, separator).unwrap();
        let left: String =
            dest[..written as usize].iter().map(|&s| (s as u8) as char).collect();
        assert_eq!(left, "key");

        let written = fmi.extract_until_boundary_right(14, &mut dest, 0, separator).unwrap();
        let right: String =
            dest[..written as usize].iter().map(|&s| (s as u8) as char).collect();
        assert_eq!(right, "2=value2");

        // a seed sitting on the separator yields nothing
        let written = fmi.extract_until_boundary(11, &mut dest, 0, separator).unwrap();
        assert_eq!(written, 0);
    }

    #[test]
    fn test_convert_utf8() {
        let mut dest = [0u16; 8];
        let written = convert_utf8_to_symbols("ało".as_bytes(), &mut dest).unwrap();
        assert_eq!(written, 3);
        assert_eq!(&dest[..3], &['a' as u16, 'ł' as u16, 'o' as u16]);

        // a four-byte code point exceeds the symbol range
        let err = convert_utf8_to_symbols("😀".as_bytes(), &mut dest).unwrap_err();
        assert!(matches!(err, TextZipError::SymbolOverflow { .. }));

        let err = convert_utf8_to_symbols(&[0xFF, 0xFE], &mut dest).unwrap_err();
        assert_eq!(err.category(), "data");
    }

    #[test]
    fn test_alphabet_too_large() {
        let text: Vec<Symbol> = (0..=MAX_SYMBOL).collect();
        assert!(matches!(
            FmIndex::build(&text, 32, false),
            Err(TextZipError::AlphabetTooLarge { .. })
        ));
    }

    #[test]
    fn test_convenience_accessors() {
        let text = "abcabc";
        let fmi = index(text, 32, true);
        assert_eq!(fmi.input_length(), 7);
        assert_eq!(fmi.alphabet_size(), 4); // a, b, c + sentinel
        assert_eq!(fmi.sample_rate(), 32);
        assert!(fmi.is_extract_enabled());
        assert_eq!(format!("{}", fmi), "FmIndex-sampleRate:32-extract:true");
    }

    #[test]
    fn test_serialization_round_trip() {
        let text = "serialize me, then ask me everything again";
        let symbols = text_to_symbols(text).unwrap();
        let fmi = FmIndex::build(&symbols, 4, true).unwrap();

        let mut out = crate::io::VecDataOutput::new();
        fmi.write(&mut out).unwrap();
        let bytes = out.into_vec();

        let mut input = crate::io::SliceDataInput::new(&bytes);
        let restored = FmIndex::read(&mut input).unwrap();

        assert_eq!(restored.input_length(), fmi.input_length());
        assert_eq!(restored.alphabet_size(), fmi.alphabet_size());
        for pattern in ["me", "then", "xyz", "e"] {
            let pattern = text_to_symbols(pattern).unwrap();
            assert_eq!(restored.count(&pattern), fmi.count(&pattern));
        }
        let mut dest = vec![0u16; symbols.len()];
        restored.extract(0, symbols.len(), &mut dest, 0).unwrap();
        assert_eq!(dest, symbols);

        // deterministic bytes
        let mut out2 = crate::io::VecDataOutput::new();
        fmi.write(&mut out2).unwrap();
        assert_eq!(bytes, out2.into_vec());
    }

    #[test]
    fn test_serialization_version_mismatch() {
        let fmi = index("abc", 4, false);
        let mut out = crate::io::VecDataOutput::new();
        fmi.write(&mut out).unwrap();
        let mut bytes = out.into_vec();
        bytes[0] = 7;
        let mut input = crate::io::SliceDataInput::new(&bytes);
        assert!(matches!(
            FmIndex::read(&mut input),
            Err(TextZipError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_text() {
        let fmi = FmIndex::build(&[], 4, true).unwrap();
        assert_eq!(fmi.input_length(), 1);
        assert_eq!(fmi.count(&text_to_symbols("x").unwrap()), 0);
        let mut dest = [0u32; 4];
        assert_eq!(fmi.locate(&text_to_symbols("x").unwrap(), &mut dest), 0);
    }
}
