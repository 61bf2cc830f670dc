//! Bounded sub-readers over externally framed records.
//!
//! How a record ends is a property of the file format, not of the
//! deserializer. A [`RecordFraming`] strategy reads whatever header the
//! format uses and reports the body's boundary as a [`Frame`]; the
//! deserializer then carves the body out and hands it back as an independent
//! [`Deserializer`].

use super::{Deserializer, Memory, Origin, DEFAULT_CHUNK_SIZE};
use crate::error::Result;
use bytes::{Bytes, BytesMut};
use tracing::debug;

/// Boundary of the next record body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The body is the next `n` bytes
    Length(usize),
    /// The body runs up to the next occurrence of the byte, which is consumed
    Delimited(u8),
    /// No more records
    End,
}

/// Strategy locating record boundaries in a stream
pub trait RecordFraming {
    /// Consumes any framing header and describes the next body
    fn next_frame(&self, de: &mut Deserializer<'_>) -> Result<Frame>;
}

impl<F> RecordFraming for F
where
    F: Fn(&mut Deserializer<'_>) -> Result<Frame>,
{
    fn next_frame(&self, de: &mut Deserializer<'_>) -> Result<Frame> {
        self(de)
    }
}

/// Records prefixed by a 32-bit length in the deserializer's encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthPrefixed;

impl RecordFraming for LengthPrefixed {
    fn next_frame(&self, de: &mut Deserializer<'_>) -> Result<Frame> {
        if !de.has_remaining()? {
            return Ok(Frame::End);
        }
        Ok(Frame::Length(de.read_u32()? as usize))
    }
}

/// Records ended by a terminator byte
#[derive(Debug, Clone, Copy)]
pub struct Terminated(pub u8);

impl RecordFraming for Terminated {
    fn next_frame(&self, de: &mut Deserializer<'_>) -> Result<Frame> {
        if !de.has_remaining()? {
            return Ok(Frame::End);
        }
        Ok(Frame::Delimited(self.0))
    }
}

impl<'a> Deserializer<'a> {
    /// Carves the next record out of the stream.
    ///
    /// Returns `None` once the framing reports the end. The sub-reader shares
    /// this deserializer's encoding and never sees bytes past the record.
    /// Memory origins hand out zero-copy views; streams copy the body.
    pub fn read_record<F>(&mut self, framing: &F) -> Result<Option<Deserializer<'a>>>
    where
        F: RecordFraming + ?Sized,
    {
        let start = self.position();
        let body = match framing.next_frame(self)? {
            Frame::End => return Ok(None),
            Frame::Length(n) => self.take_exact(n)?,
            Frame::Delimited(delimiter) => self.take_until(delimiter)?,
        };
        debug!(
            "Read record at offset {} ({} body bytes)",
            start,
            body.as_slice().len()
        );
        Ok(Some(Deserializer::from_memory(body, self.encoding)))
    }

    /// Iterates over the remaining records
    pub fn records<'d, F>(&'d mut self, framing: &'d F) -> Records<'d, 'a, F>
    where
        F: RecordFraming + ?Sized,
    {
        Records {
            de: self,
            framing,
            done: false,
        }
    }

    /// Zero-copy view of the next `n` bytes of a memory origin
    fn memory_view(&self, n: usize) -> Option<Memory<'a>> {
        let range = self.cursor..self.cursor + n;
        match &self.origin {
            Origin::Memory(Memory::Borrowed(data)) => {
                let data: &'a [u8] = *data;
                Some(Memory::Borrowed(&data[range]))
            }
            Origin::Memory(Memory::Shared(bytes)) => Some(Memory::Shared(bytes.slice(range))),
            Origin::Stream(_) => None,
        }
    }

    fn take_exact(&mut self, n: usize) -> Result<Memory<'a>> {
        if !self.is_streaming() && self.avail() < n {
            self.advance(self.avail());
            return Err(self.end_of_stream());
        }
        if let Some(view) = self.memory_view(n) {
            self.advance(n);
            return Ok(view);
        }

        let mut body = BytesMut::with_capacity(n.min(DEFAULT_CHUNK_SIZE));
        let mut remaining = n;
        while remaining > 0 {
            if !self.fetch()? {
                return Err(self.end_of_stream());
            }
            let step = remaining.min(self.avail());
            body.extend_from_slice(&self.data()[..step]);
            self.advance(step);
            remaining -= step;
        }
        Ok(Memory::Shared(body.freeze()))
    }

    fn take_until(&mut self, delimiter: u8) -> Result<Memory<'a>> {
        if !self.is_streaming() {
            let Some(n) = self.data().iter().position(|&b| b == delimiter) else {
                self.advance(self.avail());
                return Err(self.end_of_stream());
            };
            if let Some(view) = self.memory_view(n) {
                self.advance(n + 1);
                return Ok(view);
            }
        }

        let mut body = Vec::new();
        if !self.read_to(&mut body, delimiter)? {
            return Err(self.end_of_stream());
        }
        Ok(Memory::Shared(Bytes::from(body)))
    }
}

/// Iterator over sub-readers, see [`Deserializer::records`]
pub struct Records<'d, 'a, F: ?Sized> {
    de: &'d mut Deserializer<'a>,
    framing: &'d F,
    done: bool,
}

impl<'a, F> Iterator for Records<'_, 'a, F>
where
    F: RecordFraming + ?Sized,
{
    type Item = Result<Deserializer<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.de.read_record(self.framing) {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
