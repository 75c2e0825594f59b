//! Readable byte sources consumed by the digest engine.
//!
//! The digest engine only ever sees a [`ByteSource`]. Whether the bytes live
//! in memory or arrive from a reader is decided by the adapter.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A finite sequence of bytes, read front to back exactly once.
pub trait ByteSource {
    /// Fill `buf` with the next bytes of the source.
    ///
    /// Returns the number of bytes written; `0` means the source is exhausted.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Byte source over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct BufferSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferSource<'a> {
    /// Wrap a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for BufferSource<'_> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Byte source over any [`Read`] implementation.
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
}

impl<R: Read> StreamSource<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Streams a file from disk, opening it on first read.
///
/// Opening lazily means a missing file surfaces as a read error from the
/// digest engine, the same way a stream failing midway does.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: Option<StreamSource<File>>,
}

impl FileSource {
    /// Create a source for the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Path this source reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.file.is_none() {
            self.file = Some(StreamSource::new(File::open(&self.path)?));
        }
        match self.file.as_mut() {
            Some(stream) => stream.read_chunk(buf),
            None => Ok(0),
        }
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_chunk(buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_chunk(buf)
    }
}
