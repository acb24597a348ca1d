//! Data output abstractions and implementations
//!
//! This module provides traits and implementations for writing structured
//! data to different destinations including byte vectors and writers. All
//! multi-byte integers are big-endian.

use std::io::Write;

use crate::error::{Result, TextZipError};

/// Trait for writing structured data to various destinations
pub trait DataOutput {
    /// Write a single byte
    fn write_u8(&mut self, value: u8) -> Result<()>;

    /// Write a 16-bit unsigned integer in big-endian format
    fn write_u16(&mut self, value: u16) -> Result<()>;

    /// Write a 32-bit unsigned integer in big-endian format
    fn write_u32(&mut self, value: u32) -> Result<()>;

    /// Write a 64-bit unsigned integer in big-endian format
    fn write_u64(&mut self, value: u64) -> Result<()>;

    /// Write bytes from the provided buffer
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Flush any buffered data to the underlying destination
    fn flush(&mut self) -> Result<()>;

    /// Write a 32-bit signed integer in big-endian format
    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32(value as u32)
    }

    /// Write a boolean as a single byte
    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    /// Write an array length as an `i32`
    fn write_array_len(&mut self, len: usize) -> Result<()> {
        if len > i32::MAX as usize {
            return Err(TextZipError::invalid_data(format!("Array too long to frame: {}", len)));
        }
        self.write_i32(len as i32)
    }
}

/// DataOutput implementation for `Vec<u8>`
pub struct VecDataOutput {
    data: Vec<u8>,
}

impl VecDataOutput {
    /// Create a new VecDataOutput
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a new VecDataOutput with the specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    /// Get the number of bytes written
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no bytes have been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying data
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Convert into the underlying `Vec<u8>`
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl Default for VecDataOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl DataOutput for VecDataOutput {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.data.push(value);
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.data.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.data.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.data.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// DataOutput implementation for `std::io::Write` types
pub struct WriterDataOutput<W> {
    writer: W,
    bytes_written: u64,
}

impl<W: Write> WriterDataOutput<W> {
    /// Create a new WriterDataOutput from a Write type
    pub fn new(writer: W) -> Self {
        Self { writer, bytes_written: 0 }
    }

    /// Get the number of bytes written
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Convert back to the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn put(&mut self, data: &[u8]) -> Result<()> {
        self.writer
            .write_all(data)
            .map_err(|e| TextZipError::io_error(format!("Failed to write: {}", e)))?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }
}

impl<W: Write> DataOutput for WriterDataOutput<W> {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put(&[value])
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.put(data)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| TextZipError::io_error(format!("Failed to flush: {}", e)))
    }
}

/// Create a DataOutput backed by a fresh `Vec<u8>`
pub fn to_vec() -> VecDataOutput {
    VecDataOutput::new()
}
