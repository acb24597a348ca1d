//! Data input abstractions and implementations
//!
//! This module provides traits and implementations for reading structured
//! data from different sources including byte slices, readers and
//! memory-mapped regions. All multi-byte integers are big-endian.

use std::io::Read;

use crate::error::{Result, TextZipError};

#[cfg(feature = "mmap")]
use std::fs::File;
#[cfg(feature = "mmap")]
use std::path::Path;

/// Trait for reading structured data from various sources
pub trait DataInput {
    /// Read a single byte
    fn read_u8(&mut self) -> Result<u8>;

    /// Read a 16-bit unsigned integer in big-endian format
    fn read_u16(&mut self) -> Result<u16>;

    /// Read a 32-bit unsigned integer in big-endian format
    fn read_u32(&mut self) -> Result<u32>;

    /// Read a 64-bit unsigned integer in big-endian format
    fn read_u64(&mut self) -> Result<u64>;

    /// Read exact number of bytes into the provided buffer
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Read a 32-bit signed integer in big-endian format
    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a boolean encoded as a single byte
    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an array length written as a non-negative `i32`
    fn read_array_len(&mut self) -> Result<usize> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(TextZipError::invalid_data(format!("Negative array length: {}", len)));
        }
        Ok(len as usize)
    }

    /// Read a vector of bytes with the specified length
    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }
}

/// DataInput implementation for byte slices
pub struct SliceDataInput<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceDataInput<'a> {
    /// Create a new SliceDataInput from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the current position
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get the number of remaining bytes
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.position + n > self.data.len() {
            return Err(TextZipError::io_error("Unexpected end of data"));
        }
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }
}

impl<'a> DataInput for SliceDataInput<'a> {
    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let slice = self.take(buf.len())?;
        buf.copy_from_slice(slice);
        Ok(())
    }
}

/// DataInput implementation for `std::io::Read` types
pub struct ReaderDataInput<R> {
    reader: R,
    position: u64,
}

impl<R: Read> ReaderDataInput<R> {
    /// Create a new ReaderDataInput from a Read type
    pub fn new(reader: R) -> Self {
        Self { reader, position: 0 }
    }

    /// Get the current position
    pub fn pos(&self) -> u64 {
        self.position
    }

    /// Convert back to the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader
            .read_exact(buf)
            .map_err(|e| TextZipError::io_error(format!("Failed to read: {}", e)))?;
        self.position += buf.len() as u64;
        Ok(())
    }
}

impl<R: Read> DataInput for ReaderDataInput<R> {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.fill(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.fill(buf)
    }
}

/// DataInput over a memory-mapped file
#[cfg(feature = "mmap")]
pub struct MmapDataInput {
    mmap: memmap2::Mmap,
    position: usize,
}

#[cfg(feature = "mmap")]
impl MmapDataInput {
    /// Memory-map the file at `path` for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // The file is opened read-only and never mutated through the map.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(Self { mmap, position: 0 })
    }

    #[inline]
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.position + n > self.mmap.len() {
            return Err(TextZipError::io_error("Unexpected end of data"));
        }
        let slice = &self.mmap[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }
}

#[cfg(feature = "mmap")]
impl DataInput for MmapDataInput {
    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let slice = self.take(buf.len())?;
        buf.copy_from_slice(slice);
        Ok(())
    }
}

/// Create a DataInput from a byte slice
pub fn from_slice(data: &[u8]) -> SliceDataInput<'_> {
    SliceDataInput::new(data)
}
