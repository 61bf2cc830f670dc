//! Pull-based binary deserializer.
//!
//! A [`Deserializer`] reads from a window `[cursor, limit)` over either a
//! fixed memory range or the latest chunk pulled from a [`ByteSource`].
//! Typed reads consume the window and refill it from the source when it runs
//! dry, so callers never see chunk boundaries.
//!
//! ## Modes
//!
//! - **Memory**: constructed with [`Deserializer::from_slice`] or
//!   [`Deserializer::from_bytes`]. Reads are zero-copy and
//!   [`fetch`](Deserializer::fetch) never yields more data.
//! - **Streaming**: constructed with [`Deserializer::from_source`]. The
//!   deserializer owns the source and closes it once, explicitly or on drop.
//!
//! ## Example
//!
//! ```
//! use strata_core::{Deserializer, Encoding};
//!
//! let data = b"\x00\x00\x00\x02ab\0cd\0";
//! let mut de = Deserializer::from_slice(data, Encoding::FixedBigEndian);
//! assert_eq!(de.read_string_vec()?, vec!["ab".to_string(), "cd".to_string()]);
//! # Ok::<(), strata_core::Error>(())
//! ```

mod extract;
mod record;

use crate::error::{Error, Result};
use crate::source::ByteSource;
use bytes::Bytes;
use tracing::{debug, trace, warn};

pub use extract::{Extract, RawRead, Scalar};
pub use record::{Frame, LengthPrefixed, RecordFraming, Records, Terminated};

/// Default refill size for streaming deserializers
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Numeric encoding used for unsigned 32-bit values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Four bytes, big-endian
    #[default]
    FixedBigEndian,
    /// Variable-length 7-bit groups
    Varint,
}

/// Configuration for streaming deserializers
#[derive(Debug, Clone)]
pub struct DeserializerConfig {
    /// Encoding of unsigned 32-bit values and collection counts
    pub encoding: Encoding,
    /// Number of bytes requested from the source per refill
    pub chunk_size: usize,
}

impl Default for DeserializerConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl DeserializerConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the numeric encoding
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the refill size (clamped to at least one byte)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}

/// Fixed memory range, either borrowed or reference counted
#[derive(Debug)]
enum Memory<'a> {
    Borrowed(&'a [u8]),
    Shared(Bytes),
}

impl Memory<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Memory::Borrowed(data) => data,
            Memory::Shared(bytes) => bytes,
        }
    }
}

/// Streaming state: the owned source plus the chunk buffer the window
/// points into
struct Stream<'a> {
    source: Option<Box<dyn ByteSource + 'a>>,
    buffer: Vec<u8>,
    /// Absolute offset of `buffer[0]`
    window_offset: u64,
}

enum Origin<'a> {
    Memory(Memory<'a>),
    Stream(Stream<'a>),
}

/// Pull-based reader decoding typed values from a byte window
pub struct Deserializer<'a> {
    origin: Origin<'a>,
    cursor: usize,
    limit: usize,
    encoding: Encoding,
}

impl std::fmt::Debug for Deserializer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deserializer")
            .field("streaming", &self.is_streaming())
            .field("position", &self.position())
            .field("avail", &self.avail())
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl<'a> Deserializer<'a> {
    /// Creates a zero-copy deserializer over a borrowed range
    pub fn from_slice(data: &'a [u8], encoding: Encoding) -> Self {
        Self::from_memory(Memory::Borrowed(data), encoding)
    }

    /// Creates a deserializer over a shared buffer
    pub fn from_bytes(data: Bytes, encoding: Encoding) -> Self {
        Self::from_memory(Memory::Shared(data), encoding)
    }

    fn from_memory(memory: Memory<'a>, encoding: Encoding) -> Self {
        let limit = memory.as_slice().len();
        Self {
            origin: Origin::Memory(memory),
            cursor: 0,
            limit,
            encoding,
        }
    }

    /// Creates a streaming deserializer that owns `source`
    pub fn from_source<S: ByteSource + 'a>(source: S, config: DeserializerConfig) -> Self {
        let stream = Stream {
            source: Some(Box::new(source)),
            buffer: vec![0u8; config.chunk_size.max(1)],
            window_offset: 0,
        };
        Self {
            origin: Origin::Stream(stream),
            cursor: 0,
            limit: 0,
            encoding: config.encoding,
        }
    }

    /// Returns the numeric encoding fixed at construction
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Returns true when reading from a byte source
    pub fn is_streaming(&self) -> bool {
        matches!(self.origin, Origin::Stream(_))
    }

    /// Number of bytes consumable without a refill
    pub fn avail(&self) -> usize {
        self.limit - self.cursor
    }

    /// The bytes currently in the window
    pub fn data(&self) -> &[u8] {
        match &self.origin {
            Origin::Memory(memory) => &memory.as_slice()[self.cursor..self.limit],
            Origin::Stream(stream) => &stream.buffer[self.cursor..self.limit],
        }
    }

    /// Absolute offset of the cursor from the start of the origin
    pub fn position(&self) -> u64 {
        match &self.origin {
            Origin::Memory(_) => self.cursor as u64,
            Origin::Stream(stream) => stream.window_offset + self.cursor as u64,
        }
    }

    /// Refills an exhausted window from the source.
    ///
    /// Returns whether data is available afterwards. A window that still
    /// holds bytes is left untouched. Memory origins never refill.
    pub fn fetch(&mut self) -> Result<bool> {
        if self.cursor < self.limit {
            return Ok(true);
        }
        let Origin::Stream(stream) = &mut self.origin else {
            return Ok(false);
        };

        stream.window_offset += self.limit as u64;
        self.cursor = 0;
        self.limit = 0;

        let Some(source) = stream.source.as_mut() else {
            return Ok(false);
        };
        let n = source.read_raw(&mut stream.buffer)?;
        trace!("Refilled {} bytes at offset {}", n, stream.window_offset);
        self.limit = n;
        Ok(n > 0)
    }

    /// Returns true if at least one more byte can be read
    pub fn has_remaining(&mut self) -> Result<bool> {
        self.fetch()
    }

    fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.avail());
        self.cursor += n;
    }

    fn end_of_stream(&self) -> Error {
        Error::end_of_stream(self.position())
    }

    /// Returns to offset 0 of the origin
    pub fn rewind(&mut self) -> Result<()> {
        debug!("Rewinding from offset {}", self.position());
        self.seek(0).map(|_| ())
    }

    /// Repositions to the absolute offset `pos`.
    ///
    /// Streaming deserializers forward the seek to the source and drop the
    /// window. Memory deserializers clamp `pos` to the end of the range.
    pub fn seek(&mut self, pos: u64) -> Result<&mut Self> {
        match &mut self.origin {
            Origin::Memory(memory) => {
                let len = memory.as_slice().len();
                self.cursor = usize::try_from(pos).map_or(len, |pos| pos.min(len));
            }
            Origin::Stream(stream) => {
                if let Some(source) = stream.source.as_mut() {
                    source.seek(pos)?;
                }
                stream.window_offset = pos;
                self.cursor = 0;
                self.limit = 0;
            }
        }
        debug!("Seeked to offset {}", self.position());
        Ok(self)
    }

    /// Skips `n` bytes, refilling as needed.
    ///
    /// Fails with [`Error::EndOfStream`] if the data ends first; the cursor
    /// is then left at the end of the data.
    pub fn seek_forward(&mut self, n: usize) -> Result<()> {
        let mut remaining = n;
        loop {
            let step = remaining.min(self.avail());
            self.advance(step);
            remaining -= step;
            if remaining == 0 {
                return Ok(());
            }
            if !self.fetch()? {
                return Err(self.end_of_stream());
            }
        }
    }

    /// Skips through the next occurrence of `delimiter`.
    ///
    /// Returns `false` after consuming all remaining data when the delimiter
    /// never appears.
    pub fn seek_forward_to(&mut self, delimiter: u8) -> Result<bool> {
        loop {
            if let Some(i) = self.data().iter().position(|&b| b == delimiter) {
                self.advance(i + 1);
                return Ok(true);
            }
            self.advance(self.avail());
            if !self.fetch()? {
                return Ok(false);
            }
        }
    }

    /// Appends bytes up to `delimiter` to `dst` and consumes the delimiter.
    ///
    /// Returns `false` when the data ends first. `dst` then holds everything
    /// that was left, which is an incomplete value.
    pub fn read_to(&mut self, dst: &mut Vec<u8>, delimiter: u8) -> Result<bool> {
        loop {
            let window = self.data();
            if let Some(i) = window.iter().position(|&b| b == delimiter) {
                dst.extend_from_slice(&window[..i]);
                self.advance(i + 1);
                return Ok(true);
            }
            dst.extend_from_slice(window);
            self.advance(self.avail());
            if !self.fetch()? {
                return Ok(false);
            }
        }
    }

    /// Copies up to `buf.len()` bytes, refilling as often as possible.
    ///
    /// A short count means the data is permanently exhausted. This never
    /// fails with [`Error::EndOfStream`].
    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut copied = 0;
        while copied < buf.len() {
            let window = self.data();
            let n = window.len().min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&window[..n]);
            self.advance(n);
            copied += n;
            if copied < buf.len() && !self.fetch()? {
                break;
            }
        }
        Ok(copied)
    }

    /// Reads exactly `N` bytes, taking the window fast path when possible
    fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut raw = [0u8; N];
        let window = self.data();
        if window.len() >= N {
            raw.copy_from_slice(&window[..N]);
            self.advance(N);
            return Ok(raw);
        }
        if self.read_raw(&mut raw)? != N {
            return Err(self.end_of_stream());
        }
        Ok(raw)
    }

    /// Releases the byte source. Repeated calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if let Origin::Stream(stream) = &mut self.origin {
            if let Some(mut source) = stream.source.take() {
                stream.window_offset += self.cursor as u64;
                self.cursor = 0;
                self.limit = 0;
                debug!("Closing byte source at offset {}", stream.window_offset);
                source.close()?;
            }
        }
        Ok(())
    }
}

impl Drop for Deserializer<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close byte source: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ReaderSource;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn streaming(data: &[u8], chunk_size: usize) -> Deserializer<'static> {
        let config = DeserializerConfig::new().chunk_size(chunk_size);
        Deserializer::from_source(ReaderSource::new(Cursor::new(data.to_vec())), config)
    }

    #[test]
    fn test_config_builder() {
        let config = DeserializerConfig::new()
            .encoding(Encoding::Varint)
            .chunk_size(0);
        assert_eq!(config.encoding, Encoding::Varint);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(DeserializerConfig::default().chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_memory_window() {
        let mut de = Deserializer::from_slice(b"abcdef", Encoding::FixedBigEndian);
        assert_eq!(de.avail(), 6);
        assert!(!de.is_streaming());
        de.seek_forward(2).unwrap();
        assert_eq!(de.data(), b"cdef");
        assert_eq!(de.position(), 2);
        de.advance(de.avail());
        assert!(!de.fetch().unwrap());
    }

    #[test]
    fn test_streaming_fetch() {
        let mut de = streaming(b"abcde", 2);
        assert_eq!(de.avail(), 0);
        assert!(de.fetch().unwrap());
        assert_eq!(de.data(), b"ab");
        de.advance(2);
        assert!(de.fetch().unwrap());
        assert_eq!(de.data(), b"cd");
        assert_eq!(de.position(), 2);
        de.advance(2);
        assert!(de.fetch().unwrap());
        assert_eq!(de.data(), b"e");
        de.advance(1);
        assert!(!de.fetch().unwrap());
        assert_eq!(de.position(), 5);
    }

    #[test]
    fn test_memory_seek_clamps() {
        let mut de = Deserializer::from_slice(b"abc", Encoding::FixedBigEndian);
        de.seek(10).unwrap();
        assert_eq!(de.avail(), 0);
        assert_eq!(de.position(), 3);
        de.seek(1).unwrap();
        assert_eq!(de.data(), b"bc");
    }

    #[test]
    fn test_streaming_seek() {
        let mut de = streaming(b"0123456789", 3);
        de.seek(7).unwrap();
        assert_eq!(de.avail(), 0);
        assert_eq!(de.position(), 7);
        let mut buf = [0u8; 3];
        assert_eq!(de.read_raw(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"789");
    }

    #[test]
    fn test_seek_forward_past_end() {
        let mut de = streaming(b"abcd", 3);
        let err = de.seek_forward(5).unwrap_err();
        assert!(matches!(err, Error::EndOfStream { offset: 4 }));
    }

    #[test]
    fn test_read_to_across_chunks() {
        let mut de = streaming(b"hello world|rest", 4);
        let mut out = Vec::new();
        assert!(de.read_to(&mut out, b'|').unwrap());
        assert_eq!(out, b"hello world");
        assert_eq!(de.position(), 12);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut de = streaming(b"abcd", 2);
        assert!(de.fetch().unwrap());
        de.advance(1);
        de.close().unwrap();
        de.close().unwrap();
        assert_eq!(de.position(), 1);
        assert!(!de.fetch().unwrap());
    }

    #[test]
    fn test_read_raw_empty_buffer() {
        let mut de = streaming(b"abcd", 2);
        let mut buf = [0u8; 0];
        assert_eq!(de.read_raw(&mut buf).unwrap(), 0);
        assert_eq!(de.position(), 0);
    }
}
