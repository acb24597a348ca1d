//! Succinct data structures with constant-time rank support
//!
//! This module provides the bit-level primitives of the index: bit-width
//! math, a plain construction-time bit vector, and the frozen rank-enabled
//! [`RrrVector`].

pub mod bit_math;
pub mod bit_vector;
pub mod rrr_vector;

pub use bit_math::{floor_log2, high_mask, low_mask, min_bits};
pub use bit_vector::BitVector;
pub use rrr_vector::RrrVector;
