//! Entropy coding
//!
//! Canonical Huffman code construction used by the wavelet tree to encode
//! each block with a code tuned to the block's own symbol distribution.

pub mod huffman;

pub use huffman::{assign_canonical_codes, compute_code_lengths, encoded_bit_length};
