//! Serialization I/O
//!
//! This module provides the framing primitives for the versioned binary
//! format shared by every serializable structure in the crate: multi-byte
//! integers are big-endian and arrays are written as an `i32` length
//! followed by their elements.

pub mod data_input;
pub mod data_output;

// Re-export core types
pub use data_input::{DataInput, ReaderDataInput, SliceDataInput};
pub use data_output::{DataOutput, VecDataOutput, WriterDataOutput};

#[cfg(feature = "mmap")]
pub use data_input::MmapDataInput;

// Convenience functions
pub use data_input::from_slice;
pub use data_output::to_vec;

use crate::error::{Result, TextZipError};

/// Checks that a deserialized serial version matches the expected one.
#[inline]
pub fn check_serial_version(expected: u8, actual: u8) -> Result<()> {
    if expected != actual {
        return Err(TextZipError::version_mismatch(expected, actual));
    }
    Ok(())
}
