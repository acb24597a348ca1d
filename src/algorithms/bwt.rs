//! Burrows-Wheeler transform
//!
//! Derivation of the BWT from a suffix array (the FM-Index build path) and a
//! standalone transform over a sorted-order alphabet, plus the `n / r`
//! redundancy measure that quantifies how much more compressible the
//! transform made the text.

use crate::algorithms::suffix_array::SuffixArray;
use crate::error::{Result, TextZipError};
use crate::fm::MAX_SYMBOL;
use std::collections::BTreeSet;

/// Derives the BWT of `mapped` from its suffix array.
///
/// `mapped` must be sentinel-terminated; `bwt[i]` is the symbol preceding
/// the i-th smallest suffix, wrapping around at the start. The output is a
/// permutation of `mapped`.
pub fn bwt_from_suffix_array(mapped: &[u16], suffix_array: &[u32]) -> Vec<u16> {
    debug_assert_eq!(mapped.len(), suffix_array.len());
    let mut bwt = Vec::with_capacity(mapped.len());
    for &suffix in suffix_array {
        if suffix == 0 {
            bwt.push(mapped[mapped.len() - 1]);
        } else {
            bwt.push(mapped[suffix as usize - 1]);
        }
    }
    bwt
}

/// Computes the Burrows-Wheeler transform of `text` directly.
///
/// A sentinel `0` is appended and the alphabet is mapped in **sorted**
/// order, so the lexicographic order of the output matches the natural
/// order of the input symbols (`\0 < 'A' < 'B' < 'N'` gives
/// `"BANANA"` → `"ANNB\0AA"`). Symbols must not exceed [`MAX_SYMBOL`].
pub fn burrows_wheeler_transform(text: &[u16]) -> Result<Vec<u16>> {
    if text.is_empty() {
        return Err(TextZipError::EmptyInput);
    }

    let mut sentinel_terminated = Vec::with_capacity(text.len() + 1);
    sentinel_terminated.extend_from_slice(text);
    sentinel_terminated.push(0);

    let alphabet: BTreeSet<u16> = sentinel_terminated.iter().copied().collect();
    if alphabet.len() > MAX_SYMBOL as usize {
        return Err(TextZipError::AlphabetTooLarge { limit: MAX_SYMBOL as usize });
    }
    let sorted: Vec<u16> = alphabet.into_iter().collect();
    let max_symbol = sorted.last().copied().unwrap_or(0);
    let mut to_rank = vec![0u16; max_symbol as usize + 1];
    for (rank, &symbol) in sorted.iter().enumerate() {
        to_rank[symbol as usize] = rank as u16;
    }

    let mapped: Vec<u16> =
        sentinel_terminated.iter().map(|&symbol| to_rank[symbol as usize]).collect();
    let suffix_array = SuffixArray::new(&mapped)?;
    let bwt = bwt_from_suffix_array(&mapped, suffix_array.as_slice());

    Ok(bwt.into_iter().map(|rank| sorted[rank as usize]).collect())
}

/// Measures the redundancy of a symbol sequence as `n / r`, the length over
/// the number of equal-adjacent runs. Higher means more redundant.
pub fn redundancy(input: &[u16]) -> f64 {
    let mut runs = 1usize;
    for window in input.windows(2) {
        if window[0] != window[1] {
            runs += 1;
        }
    }
    input.len() as f64 / runs as f64
}
