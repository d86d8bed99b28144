//! Pull-style byte sources for the event parser.
//!
//! The parser only needs a handful of capabilities from its input: find the
//! next line terminator, read a run of bytes as text, skip, and peek one byte
//! ahead. [`ByteSource`] names exactly those, and [`BufferedSource`] provides
//! them over any [`std::io::Read`].

use bytes::{Buf, BytesMut};
use eventline_types::SourceError;
use std::io::{self, Read};

/// Number of bytes requested from the reader per fill.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Largest chunk requested in one read. Every fill reserves a full chunk.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A buffered, pull-style source of bytes.
///
/// Offsets are always relative to the current read position.
pub trait ByteSource {
    /// Offset of the first byte equal to any of `targets`, reading more input
    /// as needed. Returns `None` once the input is exhausted without a match.
    fn index_of_element(&mut self, targets: &[u8]) -> Result<Option<usize>, SourceError>;

    /// Offset of `byte` within `[from, to)`.
    fn index_of(&mut self, byte: u8, from: usize, to: usize) -> Result<Option<usize>, SourceError>;

    /// Consume `byte_count` bytes and decode them as UTF-8.
    ///
    /// Malformed sequences are replaced with U+FFFD rather than rejected.
    fn read_utf8(&mut self, byte_count: usize) -> Result<String, SourceError>;

    /// Discard `byte_count` bytes.
    fn skip(&mut self, byte_count: usize) -> Result<(), SourceError>;

    /// The next byte without consuming it, or `None` at end of input.
    fn peek(&mut self) -> Result<Option<u8>, SourceError>;

    /// Whether no more bytes can be read.
    fn exhausted(&mut self) -> Result<bool, SourceError> {
        Ok(self.peek()?.is_none())
    }

    /// Consume and return one byte.
    fn read_byte(&mut self) -> Result<u8, SourceError> {
        match self.peek()? {
            Some(byte) => {
                self.skip(1)?;
                Ok(byte)
            }
            None => Err(SourceError::UnexpectedEof {
                needed: 1,
                available: 0,
            }),
        }
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn index_of_element(&mut self, targets: &[u8]) -> Result<Option<usize>, SourceError> {
        (**self).index_of_element(targets)
    }

    fn index_of(&mut self, byte: u8, from: usize, to: usize) -> Result<Option<usize>, SourceError> {
        (**self).index_of(byte, from, to)
    }

    fn read_utf8(&mut self, byte_count: usize) -> Result<String, SourceError> {
        (**self).read_utf8(byte_count)
    }

    fn skip(&mut self, byte_count: usize) -> Result<(), SourceError> {
        (**self).skip(byte_count)
    }

    fn peek(&mut self) -> Result<Option<u8>, SourceError> {
        (**self).peek()
    }
}

/// A [`ByteSource`] over any [`Read`], buffering in chunks.
pub struct BufferedSource<R> {
    reader: R,
    buffer: BytesMut,
    chunk_size: usize,
}

impl BufferedSource<io::Empty> {
    /// An in-memory source holding `text`. More text can be appended with
    /// [`BufferedSource::write_str`].
    pub fn from_text(text: &str) -> Self {
        let mut source = Self::new(io::empty());
        source.write_str(text);
        source
    }
}

impl From<&str> for BufferedSource<io::Empty> {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl<R: Read> BufferedSource<R> {
    /// A source reading [`DEFAULT_CHUNK_SIZE`] bytes at a time from `reader`.
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buffer: BytesMut::new(),
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
        }
    }

    /// The underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Unwrap the reader. Buffered but unconsumed bytes are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Bytes read from the reader but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Append text after everything already buffered.
    pub fn write_str(&mut self, text: &str) {
        self.buffer.extend_from_slice(text.as_bytes());
    }

    /// Consume a leading UTF-8 byte-order mark, if there is one.
    pub fn skip_byte_order_mark(&mut self) -> Result<bool, SourceError> {
        self.request(UTF8_BOM.len())?;
        if self.buffer.starts_with(UTF8_BOM) {
            self.buffer.advance(UTF8_BOM.len());
            tracing::debug!("Skipped UTF-8 byte-order mark");
            return Ok(true);
        }
        Ok(false)
    }

    /// Read one more chunk into the buffer. Returns 0 at end of input.
    fn fill(&mut self) -> Result<usize, SourceError> {
        let start = self.buffer.len();
        self.buffer.resize(start + self.chunk_size, 0);
        loop {
            match self.reader.read(&mut self.buffer[start..]) {
                Ok(n) => {
                    self.buffer.truncate(start + n);
                    tracing::debug!(bytes = n, buffered = self.buffer.len(), "Source read");
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e.into());
                }
            }
        }
    }

    /// Buffer at least `byte_count` bytes if the input allows it.
    fn request(&mut self, byte_count: usize) -> Result<bool, SourceError> {
        while self.buffer.len() < byte_count {
            if self.fill()? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn require(&mut self, byte_count: usize) -> Result<(), SourceError> {
        if self.request(byte_count)? {
            Ok(())
        } else {
            Err(SourceError::UnexpectedEof {
                needed: byte_count,
                available: self.buffer.len(),
            })
        }
    }
}

impl<R: Read> ByteSource for BufferedSource<R> {
    fn index_of_element(&mut self, targets: &[u8]) -> Result<Option<usize>, SourceError> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = self.buffer[scanned..]
                .iter()
                .position(|b| targets.contains(b))
            {
                return Ok(Some(scanned + pos));
            }
            scanned = self.buffer.len();
            if self.fill()? == 0 {
                return Ok(None);
            }
        }
    }

    fn index_of(&mut self, byte: u8, from: usize, to: usize) -> Result<Option<usize>, SourceError> {
        self.request(to)?;
        let end = to.min(self.buffer.len());
        if from >= end {
            return Ok(None);
        }
        Ok(self.buffer[from..end]
            .iter()
            .position(|&b| b == byte)
            .map(|pos| from + pos))
    }

    fn read_utf8(&mut self, byte_count: usize) -> Result<String, SourceError> {
        self.require(byte_count)?;
        let bytes = self.buffer.split_to(byte_count);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn skip(&mut self, byte_count: usize) -> Result<(), SourceError> {
        self.require(byte_count)?;
        self.buffer.advance(byte_count);
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>, SourceError> {
        if self.request(1)? {
            Ok(Some(self.buffer[0]))
        } else {
            Ok(None)
        }
    }
}
