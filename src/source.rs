//! Random-access byte sources the bitmap decoder reads from.
//!
//! Two kinds exist: a seekable stream (a file on the image partition) and a
//! fixed byte array compiled into the binary. The decoder only ever asks for
//! "these bytes at this absolute offset", so both behave identically.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Error;

/// Absolute-offset reads over an image container.
pub trait ByteSource {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    /// [`Error::Io`] when the range cannot be read in full.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Error>;

    /// Total number of bytes available.
    ///
    /// # Errors
    /// [`Error::Io`] if the length cannot be determined.
    fn byte_len(&mut self) -> Result<u64, Error>;

    fn read_u16_le(&mut self, offset: u64) -> Result<u16, Error> {
        let mut b = [0u8; 2];
        self.read_at(offset, &mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    fn read_u32_le(&mut self, offset: u64) -> Result<u32, Error> {
        let mut b = [0u8; 4];
        self.read_at(offset, &mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_i32_le(&mut self, offset: u64) -> Result<i32, Error> {
        let mut b = [0u8; 4];
        self.read_at(offset, &mut b)?;
        Ok(i32::from_le_bytes(b))
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
        (**self).read_at(offset, buf)
    }

    fn byte_len(&mut self) -> Result<u64, Error> {
        (**self).byte_len()
    }
}

/// Seek-then-read over any `Read + Seek` stream.
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
}

impl<R: Read + Seek> StreamSource<R> {
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl StreamSource<BufReader<File>> {
    /// Open a file for decoding.
    ///
    /// # Errors
    /// [`Error::Io`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> ByteSource for StreamSource<R> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)?;
        Ok(())
    }

    fn byte_len(&mut self) -> Result<u64, Error> {
        // Every read seeks to an absolute offset, so the position can be left at the end.
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }
}

/// A fixed in-memory image addressed by absolute offset.
#[derive(Debug, Clone, Copy)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
}

impl<'a> SliceSource<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The byte at `offset`, if present.
    #[must_use]
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }
}

impl ByteSource for SliceSource<'_> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
        let start = usize::try_from(offset).map_err(|_| eof(offset, buf.len()))?;
        let range = start
            .checked_add(buf.len())
            .and_then(|end| self.bytes.get(start..end))
            .ok_or_else(|| eof(offset, buf.len()))?;
        buf.copy_from_slice(range);
        Ok(())
    }

    fn byte_len(&mut self) -> Result<u64, Error> {
        Ok(self.bytes.len() as u64)
    }
}

impl ByteSource for &[u8] {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
        SliceSource::new(self).read_at(offset, buf)
    }

    fn byte_len(&mut self) -> Result<u64, Error> {
        Ok(self.len() as u64)
    }
}

fn eof(offset: u64, len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("read of {len} bytes at offset {offset} past end of image"),
    )
}
