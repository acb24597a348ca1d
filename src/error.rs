//! Error handling for the textzip library
//!
//! This module provides the crate-wide error type with detailed error
//! information for index construction, queries and serialization.

use thiserror::Error;

/// Main error type for the textzip library
#[derive(Error, Debug)]
pub enum TextZipError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data format or corruption
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message describing the issue
        message: String,
    },

    /// A component received an empty input where it requires length > 0
    #[error("Input length must be > 0")]
    EmptyInput,

    /// The input text contains more distinct symbols than the index supports
    #[error("Input has more than {limit} different symbols")]
    AlphabetTooLarge {
        /// The maximum number of distinct symbols
        limit: usize,
    },

    /// A decoded code point does not fit into the symbol range
    #[error("Found a character that exceeds ({limit}): it was {code_point}")]
    SymbolOverflow {
        /// The maximum representable symbol value
        limit: u32,
        /// The offending code point
        code_point: u32,
    },

    /// A position argument is outside the component's valid range
    #[error("Out of range access. Requested {index} when range is [0, {size})")]
    OutOfRange {
        /// The requested index
        index: i64,
        /// The exclusive upper bound of the valid range
        size: u64,
    },

    /// Text recovery was requested but not enabled when the index was built
    #[error("Text recovery not enabled at build time")]
    ExtractNotEnabled,

    /// The caller-supplied output buffer cannot hold the result
    #[error("Extraction does not fit in the supplied destination. Currently extracted: {written}")]
    DestTooSmall {
        /// Number of symbols already placed (or required) when the overflow was detected
        written: usize,
    },

    /// The boundary symbol of an `extract_until_boundary` call is not indexed
    #[error("Boundary does not exist")]
    BoundaryNotInAlphabet,

    /// A serialized blob carries an incompatible serial version
    #[error("Incompatible serial versions! Expected version {expected} but was {actual}.")]
    VersionMismatch {
        /// The serial version this build understands
        expected: u8,
        /// The serial version found in the input
        actual: u8,
    },
}

impl TextZipError {
    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Create an out of range error
    pub fn out_of_range(index: i64, size: u64) -> Self {
        Self::OutOfRange { index, size }
    }

    /// Create a destination-too-small error
    pub fn dest_too_small(written: usize) -> Self {
        Self::DestTooSmall { written }
    }

    /// Create a version mismatch error
    pub fn version_mismatch(expected: u8, actual: u8) -> Self {
        Self::VersionMismatch { expected, actual }
    }

    /// Create an I/O error from a message
    pub fn io_error<S: Into<String>>(message: S) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::Other, message.into()))
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidData { .. } => "data",
            Self::EmptyInput => "build",
            Self::AlphabetTooLarge { .. } => "build",
            Self::SymbolOverflow { .. } => "encoding",
            Self::OutOfRange { .. } => "query",
            Self::ExtractNotEnabled => "extract",
            Self::DestTooSmall { .. } => "extract",
            Self::BoundaryNotInAlphabet => "extract",
            Self::VersionMismatch { .. } => "serde",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TextZipError>;

/// Assert that an index is within bounds
#[inline]
pub fn check_bounds(index: usize, size: usize) -> Result<()> {
    if index >= size {
        Err(TextZipError::out_of_range(index as i64, size as u64))
    } else {
        Ok(())
    }
}

/// Assert that a range is within bounds
#[inline]
pub fn check_range(start: usize, end: usize, size: usize) -> Result<()> {
    if start > end {
        return Err(TextZipError::invalid_data(format!(
            "Invalid range: start {} > end {}",
            start, end
        )));
    }
    if end > size {
        return Err(TextZipError::out_of_range(end as i64, size as u64));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TextZipError::invalid_data("test message");
        assert_eq!(err.category(), "data");

        let err = TextZipError::out_of_range(9999, 32);
        assert_eq!(err.category(), "query");
        assert_eq!(
            format!("{}", err),
            "Out of range access. Requested 9999 when range is [0, 32)"
        );
    }

    #[test]
    fn test_bounds_checking() {
        assert!(check_bounds(5, 10).is_ok());
        assert!(check_bounds(10, 10).is_err());
        assert!(check_bounds(15, 10).is_err());
    }

    #[test]
    fn test_range_checking() {
        assert!(check_range(2, 8, 10).is_ok());
        assert!(check_range(8, 2, 10).is_err()); // start > end
        assert!(check_range(2, 15, 10).is_err()); // end > size
        assert!(check_range(0, 0, 0).is_ok());
        assert!(check_range(5, 5, 5).is_ok());
    }

    #[test]
    fn test_version_mismatch_display() {
        let err = TextZipError::version_mismatch(0, 3);
        let display = format!("{}", err);
        assert!(display.contains("Expected version 0"));
        assert!(display.contains("was 3"));
        assert_eq!(err.category(), "serde");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: TextZipError = io_error.into();
        assert_eq!(err.category(), "io");
    }

    #[test]
    fn test_extract_errors() {
        assert_eq!(TextZipError::ExtractNotEnabled.category(), "extract");
        assert_eq!(
            format!("{}", TextZipError::dest_too_small(13)),
            "Extraction does not fit in the supplied destination. Currently extracted: 13"
        );
    }
}
