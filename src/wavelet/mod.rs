//! Wavelet tree with fixed-block boosting
//!
//! Generalises rank and access from bits to arbitrary symbol sequences. The
//! only implementation is the fixed-block-boosting variant, which Huffman
//! codes each block with a code fitted to the block's own distribution.

pub mod fbb;

pub use fbb::FbbWavelet;
