//! # TextZip: Compressed Full-Text Substring Indexing
//!
//! This crate builds a compressed, queryable index over a single immutable
//! text and answers substring queries without decompressing the whole
//! input. The index is an FM-Index: a Burrows-Wheeler transform of the
//! input coupled with a rank-enabled wavelet tree and sparsely sampled
//! suffix-array positions.
//!
//! ## Key Components
//!
//! - **FM-Index**: count pattern occurrences, locate their offsets, and
//!   extract arbitrary text windows, optionally bounded by a delimiter
//! - **Fixed-block-boosting wavelet tree**: rank and access over arbitrary
//!   symbol sequences, Huffman coded per block
//! - **Succinct bit vectors**: constant-time rank via sampled prefix counts
//! - **Packed integer vectors**: fixed- and variable-width bit packing
//! - **Versioned serialization**: a stable big-endian binary framing for
//!   every structure
//!
//! ## Quick Start
//!
//! ```rust
//! use textzip::{text_to_symbols, FmIndexBuilder};
//!
//! let text = text_to_symbols("how much wood would a woodchuck chuck")?;
//! let index = FmIndexBuilder::new().sample_rate(4).build(&text)?;
//!
//! let pattern = text_to_symbols("wood")?;
//! assert_eq!(index.count(&pattern), 2);
//!
//! let mut offsets = [0u32; 8];
//! let found = index.locate(&pattern, &mut offsets) as usize;
//! let mut found: Vec<u32> = offsets[..found].to_vec();
//! found.sort_unstable();
//! assert_eq!(found, vec![9, 22]);
//!
//! let mut window = [0u16; 4];
//! index.extract(9, 13, &mut window, 0)?;
//! assert_eq!(window.to_vec(), text[9..13].to_vec());
//! # Ok::<(), textzip::TextZipError>(())
//! ```
//!
//! An index is immutable after construction: queries are safe to run from
//! many threads concurrently with no external synchronisation.

#![warn(missing_docs)]

pub mod algorithms;
pub mod containers;
pub mod entropy;
pub mod error;
pub mod fm;
pub mod io;
pub mod succinct;
pub mod wavelet;

// Re-export core types
pub use containers::{FixedIntVec, VarIntVec};
pub use error::{Result, TextZipError};
pub use fm::{convert_utf8_to_symbols, text_to_symbols, FmIndex, FmIndexBuilder, Symbol, MAX_SYMBOL};
pub use succinct::{BitVector, RrrVector};
pub use wavelet::FbbWavelet;

pub use algorithms::{
    burrows_wheeler_transform, bwt_from_suffix_array, redundancy, SuffixArray,
    SuffixArrayBuilder, SuffixArrayConfig,
};
pub use io::{DataInput, DataOutput, SliceDataInput, VecDataOutput};

#[cfg(feature = "mmap")]
pub use io::MmapDataInput;
