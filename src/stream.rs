//! The seekable byte source the container reader is generic over (§4.1).
//!
//! Any type implementing [`Stream`] can back a [`crate::container::ContainerReader`].
//! The trait is deliberately two methods wide so it can be implemented over a
//! raw host filesystem handle with no `std::io` dependency on the no_std
//! side of the `std` feature gate.

use crate::error::ReaderError;

/// A seekable byte source.
///
/// Implementations translate backend-specific failures into
/// [`ReaderError::Io`]; a seek position outside the addressable range of the
/// backing store maps to [`ReaderError::Io`] as well, since only
/// [`Stream::seek`]'s own `SeekTooLarge`-shaped failure is distinguished at
/// the pipeline layer (see [`crate::error::PipelineError::SeekTooLarge`]),
/// where the absolute position is checked against a known file length before
/// the call reaches here.
pub trait Stream {
    /// Set the absolute byte position for the next [`Stream::read`].
    fn seek(&mut self, pos: u64) -> Result<(), ReaderError>;

    /// Read up to `buf.len()` bytes, returning the number actually read.
    /// Returns `0` at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReaderError>;

    /// Read exactly `buf.len()` bytes, failing with
    /// [`ReaderError::EndOfStream`] if the stream runs dry first.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ReaderError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(ReaderError::EndOfStream);
            }
            filled += n;
        }
        Ok(())
    }
}

/// An in-memory [`Stream`] over a borrowed byte slice.
///
/// Used by tests and by any host binding that maps a whole book into linear
/// memory up front rather than streaming it through a handle.
#[derive(Debug, Clone, Copy)]
pub struct SliceStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Stream for SliceStream<'_> {
    fn seek(&mut self, pos: u64) -> Result<(), ReaderError> {
        let pos = usize::try_from(pos).map_err(|_| ReaderError::Io)?;
        if pos > self.data.len() {
            return Err(ReaderError::Io);
        }
        self.pos = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReaderError> {
        let available = self.data.len().saturating_sub(self.pos);
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// A [`Stream`] over any `std::io::{Read, Seek}` backend (e.g. `std::fs::File`).
///
/// Present only under the `std` feature: bare-metal targets provide their
/// own host-filesystem-backed [`Stream`] implementation instead.
#[cfg(feature = "std")]
pub struct IoStream<T> {
    inner: T,
}

#[cfg(feature = "std")]
impl<T> IoStream<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<T: std::io::Read + std::io::Seek> Stream for IoStream<T> {
    fn seek(&mut self, pos: u64) -> Result<(), ReaderError> {
        self.inner
            .seek(std::io::SeekFrom::Start(pos))
            .map(|_| ())
            .map_err(|_| ReaderError::Io)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReaderError> {
        self.inner.read(buf).map_err(|_| ReaderError::Io)
    }
}
