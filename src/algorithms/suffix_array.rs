//! Suffix array construction
//!
//! Comparison-based suffix sorting over a sentinel-terminated symbol
//! sequence. The trailing sentinel is the unique smallest symbol, so all
//! suffixes are pairwise distinct and the sort is total. Large inputs sort
//! in parallel.

use crate::error::{Result, TextZipError};
use rayon::prelude::*;

/// Configuration for suffix array construction
#[derive(Debug, Clone)]
pub struct SuffixArrayConfig {
    /// Use parallel sorting for large inputs
    pub use_parallel: bool,
    /// Input length at which the parallel sort kicks in
    pub parallel_threshold: usize,
}

impl Default for SuffixArrayConfig {
    fn default() -> Self {
        Self { use_parallel: true, parallel_threshold: 100_000 }
    }
}

/// A suffix array over a symbol sequence
pub struct SuffixArray {
    sa: Vec<u32>,
}

impl SuffixArray {
    /// Builds the suffix array of `text` with the default configuration.
    pub fn new(text: &[u16]) -> Result<Self> {
        SuffixArrayBuilder::new(SuffixArrayConfig::default()).build(text)
    }

    /// Returns the suffix array: `sa[i]` is the start of the
    /// lexicographically i-th suffix.
    pub fn as_slice(&self) -> &[u32] {
        &self.sa
    }

    /// Returns the number of suffixes.
    pub fn len(&self) -> usize {
        self.sa.len()
    }

    /// Returns true for an empty text.
    pub fn is_empty(&self) -> bool {
        self.sa.is_empty()
    }
}

/// Builder for constructing suffix arrays
pub struct SuffixArrayBuilder {
    config: SuffixArrayConfig,
}

impl SuffixArrayBuilder {
    /// Create a new suffix array builder
    pub fn new(config: SuffixArrayConfig) -> Self {
        Self { config }
    }

    /// Builds a suffix array from the given text.
    ///
    /// The result is deterministic whether or not the parallel path is
    /// taken: suffixes of a sentinel-terminated text compare totally.
    pub fn build(&self, text: &[u16]) -> Result<SuffixArray> {
        if text.is_empty() {
            return Err(TextZipError::EmptyInput);
        }
        if text.len() > u32::MAX as usize {
            return Err(TextZipError::invalid_data(format!(
                "Input of {} symbols exceeds the addressable maximum",
                text.len()
            )));
        }

        let mut suffixes: Vec<u32> = (0..text.len() as u32).collect();
        if self.config.use_parallel && text.len() >= self.config.parallel_threshold {
            suffixes
                .par_sort_unstable_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));
        } else {
            suffixes.sort_unstable_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));
        }

        Ok(SuffixArray { sa: suffixes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(SuffixArray::new(&[]).is_err());
    }

    #[test]
    fn test_banana() {
        // "banana\0" mapped with sorted alphabet: \0=0 a=1 b=2 n=3
        let text: Vec<u16> = vec![2, 1, 3, 1, 3, 1, 0];
        let sa = SuffixArray::new(&text).unwrap();
        // suffixes sorted: \0, a\0, ana\0, anana\0, banana\0, na\0, nana\0
        assert_eq!(sa.as_slice(), &[6, 5, 3, 1, 0, 4, 2]);
    }

    #[test]
    fn test_is_sorted() {
        let text: Vec<u16> =
            "mississippi".bytes().map(u16::from).chain(std::iter::once(0)).collect();
        let sa = SuffixArray::new(&text).unwrap();
        assert_eq!(sa.len(), text.len());
        for window in sa.as_slice().windows(2) {
            assert!(text[window[0] as usize..] < text[window[1] as usize..]);
        }
    }

    #[test]
    fn test_is_permutation() {
        let text: Vec<u16> = (0..997u16).map(|i| (i * 31) % 11 + 1).chain([0]).collect();
        let sa = SuffixArray::new(&text).unwrap();
        let mut seen = vec![false; text.len()];
        for &position in sa.as_slice() {
            assert!(!seen[position as usize]);
            seen[position as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let text: Vec<u16> = (0..4096u16).map(|i| (i * 131) % 7 + 1).chain([0]).collect();
        let sequential = SuffixArrayBuilder::new(SuffixArrayConfig {
            use_parallel: false,
            parallel_threshold: usize::MAX,
        })
        .build(&text)
        .unwrap();
        let parallel = SuffixArrayBuilder::new(SuffixArrayConfig {
            use_parallel: true,
            parallel_threshold: 0,
        })
        .build(&text)
        .unwrap();
        assert_eq!(sequential.as_slice(), parallel.as_slice());
    }
}
