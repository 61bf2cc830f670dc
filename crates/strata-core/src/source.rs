//! Pull-based byte sources.
//!
//! A [`ByteSource`] hands out bytes on demand, can jump to an absolute
//! offset, and can be closed. The deserializer owns its source in streaming
//! mode and closes it exactly once.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

/// Capability supplying raw bytes to a [`Deserializer`](crate::Deserializer).
///
/// # Contract
///
/// - [`read_raw`](ByteSource::read_raw) returns `0` only at permanent
///   exhaustion, and fewer than `buf.len()` bytes only at end of data.
/// - [`seek`](ByteSource::seek) makes subsequent reads resume at `offset`.
/// - [`close`](ByteSource::close) releases resources and may be called
///   repeatedly.
pub trait ByteSource: Send {
    /// Fill `buf` with the next bytes, returning how many were written
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reposition to the absolute `offset`
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Release the underlying resources
    fn close(&mut self) -> Result<()>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_raw(buf)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        (**self).seek(offset)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Adapts any seekable reader into a [`ByteSource`].
///
/// Short reads from the inner reader are retried until the buffer is full or
/// the reader reports end of data, so callers only ever see a short count at
/// the end.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: Option<R>,
    offset: u64,
}

/// A byte source streaming from a file on disk
pub type FileSource = ReaderSource<File>;

impl<R: Read + Seek + Send> ReaderSource<R> {
    /// Creates a new source reading from the reader's start
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            offset: 0,
        }
    }

    /// Returns true once the source has been closed
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Returns the offset the next read starts at
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl ReaderSource<File> {
    /// Opens the file at `path` for streaming
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::file_open(path, e))?;
        debug!("Opened byte source {}", path.display());
        Ok(Self::new(file))
    }
}

impl<R: Read + Seek + Send> ByteSource for ReaderSource<R> {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };

        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::source_read(self.offset + filled as u64, e)),
            }
        }

        trace!("Read {} bytes at offset {}", filled, self.offset);
        self.offset += filled as u64;
        Ok(filled)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        if let Some(reader) = self.reader.as_mut() {
            reader
                .seek(SeekFrom::Start(offset))
                .map_err(|e| Error::source_seek(offset, e))?;
        }
        self.offset = offset;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.reader.take().is_some() {
            debug!("Closed byte source at offset {}", self.offset);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_reads_until_exhausted() {
        let mut source = ReaderSource::new(Cursor::new(b"hello".to_vec()));
        let mut buf = [0u8; 8];
        assert_eq!(source.read_raw(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(source.read_raw(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_seek_and_close() {
        let mut source = ReaderSource::new(Cursor::new(b"abcdef".to_vec()));
        source.seek(4).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(source.read_raw(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");

        source.close().unwrap();
        source.close().unwrap();
        assert!(source.is_closed());
        assert_eq!(source.read_raw(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x00\x01\x02").unwrap();

        let mut source = FileSource::open(file.path()).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(source.read_raw(&mut buf).unwrap(), 3);
        assert_eq!(buf, [0, 1, 2]);
        assert_eq!(source.offset(), 3);
    }

    #[test]
    fn test_missing_file() {
        let err = FileSource::open("/definitely/not/here.bin").unwrap_err();
        assert!(matches!(err, Error::FileOpen { .. }));
    }
}
