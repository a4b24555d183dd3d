//! Error taxonomies for the container reader and the render pipeline.
//!
//! Both enums are hand-rolled: a plain `enum`, a `core::fmt::Display` impl,
//! and, behind `std`, a `std::error::Error` impl. There is no dependency on
//! `thiserror`; the error sets are small, fixed, and do not need derive
//! machinery to stay readable.

use core::fmt;

/// Errors raised by [`crate::stream::Stream`] and [`crate::container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReaderError {
    /// A read returned fewer bytes than requested before the expected
    /// amount of data had been delivered.
    EndOfStream,
    /// The underlying stream reported a backend failure.
    Io,
    /// The 4-byte magic at offset 0 was neither `XTC` nor `XTCH`.
    InvalidMagic,
    /// `(version_major, version_minor)` was not a tolerated pair.
    InvalidVersion,
    /// A header invariant (`page_count > 0`, `page_table_offset != 0`, …)
    /// was violated.
    CorruptedHeader,
    /// A page index was `>= page_count`.
    PageOutOfRange,
    /// The per-page header magic did not match the container's bit depth.
    InvalidPageMagic,
    /// The per-page header's `compression` field was nonzero.
    UnsupportedCompression,
    /// The per-page header's `color_mode` field was nonzero.
    UnsupportedColorMode,
    /// The caller-supplied buffer was smaller than the computed payload size.
    BufferTooSmall,
    /// A computed size exceeded the native word size.
    TooLarge,
}

impl ReaderError {
    const fn reason(self) -> &'static str {
        match self {
            Self::EndOfStream => "end of stream",
            Self::Io => "I/O error",
            Self::InvalidMagic => "invalid magic",
            Self::InvalidVersion => "invalid version",
            Self::CorruptedHeader => "corrupted header",
            Self::PageOutOfRange => "page out of range",
            Self::InvalidPageMagic => "invalid page magic",
            Self::UnsupportedCompression => "unsupported compression",
            Self::UnsupportedColorMode => "unsupported color mode",
            Self::BufferTooSmall => "buffer too small",
            Self::TooLarge => "value too large",
        }
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ReaderError {}

/// Errors raised by [`crate::pipeline::render_page`] and its helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PipelineError {
    /// A container or page-level read failed.
    Reader(ReaderError),
    /// A path exceeded a fixed on-disk buffer's capacity.
    PathTooLong,
    /// A read ended before the expected number of bytes arrived.
    UnexpectedEof,
    /// A requested seek position exceeded the target's addressable range.
    SeekTooLarge,
    /// A computed size exceeded the native word size.
    TooLarge,
    /// A per-page header failed validation against container expectations.
    InvalidPageHeader,
    /// The page's color mode / bit depth combination is not supported.
    UnsupportedFormat,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader(err) => write!(f, "reader: {err}"),
            Self::PathTooLong => f.write_str("path too long"),
            Self::UnexpectedEof => f.write_str("unexpected end of file"),
            Self::SeekTooLarge => f.write_str("seek position too large"),
            Self::TooLarge => f.write_str("value too large"),
            Self::InvalidPageHeader => f.write_str("invalid page header"),
            Self::UnsupportedFormat => f.write_str("unsupported format"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PipelineError {}

impl From<ReaderError> for PipelineError {
    fn from(err: ReaderError) -> Self {
        Self::Reader(err)
    }
}

/// Errors raised by [`crate::catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    /// Fewer bytes than the fixed header size were supplied.
    TooShort,
    /// The `"XCAT"` magic did not match.
    BadMagic,
    /// The version field was not `1`.
    BadVersion,
    /// `count` exceeded the 4096-record cap.
    TooManyBooks,
    /// The trailing bytes did not divide evenly by the fixed record size.
    MisalignedSize,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::TooShort => "too short",
            Self::BadMagic => "bad magic",
            Self::BadVersion => "bad version",
            Self::TooManyBooks => "too many books",
            Self::MisalignedSize => "misaligned size",
        };
        f.write_str(reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CatalogError {}

/// Errors raised by [`crate::library`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LibraryError {
    /// The books directory or catalog path could not be found.
    NotFound,
    /// The filesystem capability reported a backend failure.
    Io,
    /// The fixed-capacity entry list overflowed (§3 caps it at 128).
    TooManyBooks,
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotFound => "not found",
            Self::Io => "I/O error",
            Self::TooManyBooks => "too many books",
        };
        f.write_str(reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LibraryError {}
