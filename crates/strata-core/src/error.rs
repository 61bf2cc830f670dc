//! Error types for the strata-core library.
//!
//! Truncated input is reported as [`Error::EndOfStream`], the single parse
//! failure of the deserializer. The remaining variants cover the byte source
//! boundary (opening, reading, seeking) and text-level conversions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for strata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all strata operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The data ended before a read obtained the bytes its format requires
    #[error("unexpected end of stream at offset {offset}")]
    EndOfStream {
        /// Absolute stream position where the data ran out
        offset: u64,
    },

    /// Failed to open a file-backed byte source
    #[error("failed to open file '{path}': {source}")]
    FileOpen {
        /// Path to the file that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The byte source failed while reading
    #[error("failed to read from byte source at offset {offset}: {source}")]
    SourceRead {
        /// Absolute stream position of the failed read
        offset: u64,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The byte source failed to reposition
    #[error("failed to seek byte source to offset {offset}: {source}")]
    SourceSeek {
        /// Requested absolute offset
        offset: u64,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A string requested as text is not valid UTF-8
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 {
        /// Absolute stream position where the string started
        offset: u64,
    },

    /// A textual field layout could not be parsed
    #[error("invalid field layout: {0}")]
    InvalidLayout(String),
}

impl Error {
    /// Creates a new end-of-stream error
    pub fn end_of_stream(offset: u64) -> Self {
        Self::EndOfStream { offset }
    }

    /// Creates a new file open error
    pub fn file_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Creates a new source read error
    pub fn source_read(offset: u64, source: std::io::Error) -> Self {
        Self::SourceRead { offset, source }
    }

    /// Creates a new source seek error
    pub fn source_seek(offset: u64, source: std::io::Error) -> Self {
        Self::SourceSeek { offset, source }
    }

    /// Creates a new layout error
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    /// Returns true if the error reports truncated input
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream { .. })
    }
}
