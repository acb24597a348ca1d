//! Construction-time algorithms
//!
//! Suffix-array construction over the mapped symbol sequence and the
//! Burrows-Wheeler transform derived from it.

pub mod bwt;
pub mod suffix_array;

pub use bwt::{burrows_wheeler_transform, bwt_from_suffix_array, redundancy};
pub use suffix_array::{SuffixArray, SuffixArrayBuilder, SuffixArrayConfig};
