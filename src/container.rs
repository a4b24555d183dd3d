//! The XTC/XTCH container reader (§3, §4.3).
//!
//! # On-disk layout
//!
//! ```text
//! offset  size  field
//! 0x00    4     magic            "XTC\0" (0x00435458, 1bpp) or "XTCH" (0x48435458, 2bpp)
//! 0x04    1     version_major
//! 0x05    1     version_minor
//! 0x06    2     page_count       u16 LE
//! 0x08    1     read_direction
//! 0x09    1     has_metadata     bool
//! 0x0A    1     has_thumbnails   bool
//! 0x0B    1     has_chapters     bool
//! 0x0C    4     current_page_1based  u32 LE
//! 0x10    8     metadata_offset  u64 LE
//! 0x18    8     page_table_offset u64 LE
//! 0x20    8     data_offset      u64 LE
//! 0x28    8     thumb_offset     u64 LE
//! 0x30    4     chapter_offset   u32 LE
//! 0x34    4     padding
//! ------  56 bytes total
//! ```
//!
//! The page table, metadata block and chapter table are never loaded as
//! arrays: the header only records their offsets, and every other accessor
//! on [`ContainerReader`] seeks to a computed position and reads exactly the
//! bytes it needs for the entry requested.
//!
//! Each page-table entry, at `page_table_offset + i * 16`, is:
//!
//! ```text
//! offset  size  field
//! 0x00    8     data_offset  u64 LE
//! 0x08    4     data_size    u32 LE
//! 0x0C    2     width        u16 LE
//! 0x0E    2     height       u16 LE
//! ------  16 bytes total
//! ```
//!
//! and the 22-byte header at the start of each page blob is:
//!
//! ```text
//! offset  size  field
//! 0x00    4     magic        u32 LE ("XTG\0"=0x00475458 for 1bpp, "XTH\0"=0x00485458 for 2bpp)
//! 0x04    2     width        u16 LE
//! 0x06    2     height       u16 LE
//! 0x08    1     color_mode   must be 0
//! 0x09    1     compression  must be 0
//! 0x0A    4     data_size    u32 LE (advisory only, not used for bounds)
//! 0x0E    8     md5_8        u64 LE
//! ------  22 bytes total
//! ```

use crate::bounded::BoundedBytes;
use crate::error::ReaderError;
use crate::stream::Stream;

const HEADER_SIZE: usize = 56;
const PAGE_TABLE_ENTRY_SIZE: usize = 16;
const PAGE_HEADER_SIZE: usize = 22;
const CHAPTER_RECORD_SIZE: usize = 96;
const CHAPTER_NAME_SIZE: usize = 80;

const XTC_MAGIC: u32 = 0x0043_5458;
const XTCH_MAGIC: u32 = 0x4843_5458;
const XTG_PAGE_MAGIC: u32 = 0x0047_5458;
const XTH_PAGE_MAGIC: u32 = 0x0048_5458;

pub const METADATA_TITLE_OFFSET: u64 = 0x38;
pub const METADATA_AUTHOR_OFFSET: u64 = 0xB8;
const METADATA_TITLE_SIZE: usize = 128;
const METADATA_AUTHOR_SIZE: usize = 64;

/// Container bit depth, derived from the magic at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// `XTC`: 1 bit per pixel, pages are XTG bitmaps.
    One,
    /// `XTCH`: 2 bits per pixel, pages are precomputed XTH grayscale blobs.
    Two,
}

impl BitDepth {
    pub const fn bits(self) -> u32 {
        match self {
            BitDepth::One => 1,
            BitDepth::Two => 2,
        }
    }
}

/// Toggle the historical `(0, 1)` version tolerance (§9 open question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderLimits {
    /// When `true`, only `(1, 0)` is accepted; the historical `(0, 1)`
    /// compatibility pair is rejected with [`ReaderError::InvalidVersion`].
    pub strict_version: bool,
}

impl Default for ReaderLimits {
    fn default() -> Self {
        Self {
            strict_version: false,
        }
    }
}

impl ReaderLimits {
    /// Reject the historical `(0, 1)` compatibility pair.
    pub const fn strict() -> Self {
        Self {
            strict_version: true,
        }
    }
}

/// The parsed 56-byte container header (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub bit_depth: BitDepth,
    pub version_major: u8,
    pub version_minor: u8,
    pub page_count: u16,
    pub read_direction: u8,
    pub has_metadata: bool,
    pub has_thumbnails: bool,
    pub has_chapters: bool,
    pub current_page_1based: u32,
    pub metadata_offset: u64,
    pub page_table_offset: u64,
    pub data_offset: u64,
    pub thumb_offset: u64,
    pub chapter_offset: u32,
}

/// A single page-table entry (§3), read on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    pub data_offset: u64,
    /// Advisory; the reader recomputes the authoritative payload size from
    /// `width`/`height`/bit depth instead of trusting this field.
    pub data_size: u32,
    pub width: u16,
    pub height: u16,
}

/// Book-level metadata (§3), present only when `has_metadata` is set.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: BoundedBytes<128>,
    pub author: BoundedBytes<64>,
}

/// A single chapter (table-of-contents) entry, 0-based page indices.
///
/// `name` borrows from a stack buffer owned by the [`ContainerReader::for_each_chapter`]
/// call and is only valid for the duration of the callback invocation.
#[derive(Debug, Clone, Copy)]
pub struct ChapterEntry<'a> {
    pub name: &'a [u8],
    pub start: usize,
    pub end: usize,
}

/// The validated per-page header plus the authoritative (recomputed)
/// payload size, with the stream left positioned at the start of the
/// payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PreparedPage {
    pub color_mode: u8,
    pub compression: u8,
    pub width: u16,
    pub height: u16,
    /// The page-table entry's own declared dimensions, kept alongside the
    /// per-page header's so callers can cross-check the two (§4.6 point 3).
    pub entry_width: u16,
    pub entry_height: u16,
    pub payload_size: u64,
}

fn payload_size_for(bit_depth: BitDepth, width: u16, height: u16) -> Result<u64, ReaderError> {
    let w = width as u64;
    let h = height as u64;
    let size = match bit_depth {
        BitDepth::One => {
            let row_bytes = (w + 7) / 8;
            row_bytes.checked_mul(h).ok_or(ReaderError::TooLarge)?
        }
        BitDepth::Two => {
            // Two bitplanes, each `ceil(w*h / 8)` bytes — the plane is a flat
            // bitstream over the whole pixel count, not a per-row packing.
            let pixels = w.checked_mul(h).ok_or(ReaderError::TooLarge)?;
            let plane_bytes = (pixels + 7) / 8;
            plane_bytes.checked_mul(2).ok_or(ReaderError::TooLarge)?
        }
    };
    if size > usize::MAX as u64 {
        return Err(ReaderError::TooLarge);
    }
    Ok(size)
}

/// A generic-over-stream reader for the XTC/XTCH container format.
///
/// Borrows a [`Stream`] for its whole lifetime and never loads the page
/// table, metadata, or chapter table as in-memory arrays: every accessor
/// seeks to a computed offset and reads exactly the bytes it needs.
pub struct ContainerReader<'s, S: Stream> {
    stream: &'s mut S,
    header: ContainerHeader,
}

impl<'s, S: Stream> ContainerReader<'s, S> {
    /// Parse the 56-byte header and validate its invariants (§4.3 construction).
    pub fn open(stream: &'s mut S) -> Result<Self, ReaderError> {
        Self::open_with_limits(stream, ReaderLimits::default())
    }

    /// As [`ContainerReader::open`], with explicit [`ReaderLimits`].
    pub fn open_with_limits(stream: &'s mut S, limits: ReaderLimits) -> Result<Self, ReaderError> {
        stream.seek(0)?;
        let mut buf = [0u8; HEADER_SIZE];
        stream.read_exact(&mut buf)?;

        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let bit_depth = match magic {
            XTC_MAGIC => BitDepth::One,
            XTCH_MAGIC => BitDepth::Two,
            _ => {
                #[cfg(feature = "std")]
                log::warn!("container: unrecognized magic {magic:#010x}");
                return Err(ReaderError::InvalidMagic);
            }
        };

        let version_major = buf[4];
        let version_minor = buf[5];
        let version_ok = if limits.strict_version {
            (version_major, version_minor) == (1, 0)
        } else {
            matches!((version_major, version_minor), (1, 0) | (0, 1))
        };
        if !version_ok {
            #[cfg(feature = "std")]
            log::warn!("container: unsupported version {version_major}.{version_minor}");
            return Err(ReaderError::InvalidVersion);
        }

        let page_count = u16::from_le_bytes(buf[6..8].try_into().unwrap());
        let read_direction = buf[8];
        let has_metadata = buf[9] != 0;
        let has_thumbnails = buf[10] != 0;
        let has_chapters = buf[11] != 0;
        let current_page_1based = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        let metadata_offset = u64::from_le_bytes(buf[16..24].try_into().unwrap());
        let page_table_offset = u64::from_le_bytes(buf[24..32].try_into().unwrap());
        let data_offset = u64::from_le_bytes(buf[32..40].try_into().unwrap());
        let thumb_offset = u64::from_le_bytes(buf[40..48].try_into().unwrap());
        let chapter_offset = u32::from_le_bytes(buf[48..52].try_into().unwrap());
        // buf[52..56] is padding, intentionally unread.

        if page_count == 0 || page_table_offset == 0 {
            return Err(ReaderError::CorruptedHeader);
        }

        let header = ContainerHeader {
            bit_depth,
            version_major,
            version_minor,
            page_count,
            read_direction,
            has_metadata,
            has_thumbnails,
            has_chapters,
            current_page_1based,
            metadata_offset,
            page_table_offset,
            data_offset,
            thumb_offset,
            chapter_offset,
        };

        Ok(Self { stream, header })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn page_count(&self) -> u16 {
        self.header.page_count
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.header.bit_depth
    }

    /// Read book-level metadata (§4.3). Returns an empty [`Metadata`] when
    /// `has_metadata` is unset, without touching the stream.
    pub fn read_metadata(&mut self) -> Result<Metadata, ReaderError> {
        if !self.header.has_metadata {
            return Ok(Metadata::default());
        }
        let mut title_buf = [0u8; METADATA_TITLE_SIZE];
        self.stream.seek(METADATA_TITLE_OFFSET)?;
        self.stream.read_exact(&mut title_buf)?;

        let mut author_buf = [0u8; METADATA_AUTHOR_SIZE];
        self.stream.seek(METADATA_AUTHOR_OFFSET)?;
        self.stream.read_exact(&mut author_buf)?;

        Ok(Metadata {
            title: BoundedBytes::from_nul_padded(&title_buf),
            author: BoundedBytes::from_nul_padded(&author_buf),
        })
    }

    /// Read a single page-table entry on demand (§4.3).
    pub fn read_page_entry(&mut self, i: u16) -> Result<PageTableEntry, ReaderError> {
        if i >= self.header.page_count {
            return Err(ReaderError::PageOutOfRange);
        }
        let offset = self
            .header
            .page_table_offset
            .checked_add(i as u64 * PAGE_TABLE_ENTRY_SIZE as u64)
            .ok_or(ReaderError::TooLarge)?;
        self.stream.seek(offset)?;
        let mut buf = [0u8; PAGE_TABLE_ENTRY_SIZE];
        self.stream.read_exact(&mut buf)?;
        Ok(PageTableEntry {
            data_offset: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            data_size: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            width: u16::from_le_bytes(buf[12..14].try_into().unwrap()),
            height: u16::from_le_bytes(buf[14..16].try_into().unwrap()),
        })
    }

    /// Validate the per-page header at `entry.data_offset` and compute the
    /// authoritative payload size, leaving the stream positioned at the
    /// start of the payload (§4.3 point 4, "prepare_page_read").
    pub(crate) fn prepare_page_read(&mut self, i: u16) -> Result<PreparedPage, ReaderError> {
        let entry = self.read_page_entry(i)?;
        self.stream.seek(entry.data_offset)?;
        let mut buf = [0u8; PAGE_HEADER_SIZE];
        self.stream.read_exact(&mut buf)?;

        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let expected_magic = match self.header.bit_depth {
            BitDepth::One => XTG_PAGE_MAGIC,
            BitDepth::Two => XTH_PAGE_MAGIC,
        };
        if magic != expected_magic {
            return Err(ReaderError::InvalidPageMagic);
        }

        let width = u16::from_le_bytes(buf[4..6].try_into().unwrap());
        let height = u16::from_le_bytes(buf[6..8].try_into().unwrap());
        let color_mode = buf[8];
        let compression = buf[9];
        // buf[10..14] is the advisory data_size; the reader recomputes the
        // payload size below instead of trusting it (§3, §9).

        if color_mode != 0 {
            return Err(ReaderError::UnsupportedColorMode);
        }
        if compression != 0 {
            return Err(ReaderError::UnsupportedCompression);
        }

        let payload_size = payload_size_for(self.header.bit_depth, width, height)?;

        Ok(PreparedPage {
            color_mode,
            compression,
            width,
            height,
            entry_width: entry.width,
            entry_height: entry.height,
            payload_size,
        })
    }

    /// Read a whole page's bitmap payload into `out_buf` (§4.3).
    ///
    /// Fails with [`ReaderError::BufferTooSmall`] if `out_buf` is shorter
    /// than the computed payload size.
    pub fn load_page(&mut self, i: u16, out_buf: &mut [u8]) -> Result<usize, ReaderError> {
        let prepared = self.prepare_page_read(i)?;
        let size = prepared.payload_size as usize;
        if out_buf.len() < size {
            return Err(ReaderError::BufferTooSmall);
        }
        self.stream.read_exact(&mut out_buf[..size])?;
        Ok(size)
    }

    /// Stream a page's bitmap payload through `scratch` in caller-sized
    /// chunks, invoking `callback(chunk, payload_offset_before_chunk)` for
    /// each one (§4.3).
    ///
    /// `scratch` must be non-empty; this is a programming-error precondition,
    /// not a data error, since it is never derived from container bytes.
    pub fn stream_page<F>(
        &mut self,
        i: u16,
        scratch: &mut [u8],
        mut callback: F,
    ) -> Result<(), ReaderError>
    where
        F: FnMut(&[u8], u64),
    {
        assert!(!scratch.is_empty(), "stream_page scratch must be non-empty");
        let prepared = self.prepare_page_read(i)?;
        let mut payload_offset = 0u64;
        while payload_offset < prepared.payload_size {
            let remaining = prepared.payload_size - payload_offset;
            let chunk_len = (scratch.len() as u64).min(remaining) as usize;
            self.stream.read_exact(&mut scratch[..chunk_len])?;
            callback(&scratch[..chunk_len], payload_offset);
            payload_offset += chunk_len as u64;
        }
        Ok(())
    }

    /// Iterate the chapter table (§4.3), skipping invalid records and
    /// stopping at the area's natural end. No-op if `has_chapters` is unset
    /// or `chapter_offset` is zero.
    pub fn for_each_chapter<F>(&mut self, mut callback: F) -> Result<(), ReaderError>
    where
        F: FnMut(ChapterEntry<'_>),
    {
        if !self.header.has_chapters || self.header.chapter_offset == 0 {
            return Ok(());
        }

        let chapter_offset = self.header.chapter_offset as u64;
        let area_end = [
            self.header.page_table_offset,
            self.header.data_offset,
            self.header.thumb_offset,
        ]
        .into_iter()
        .filter(|&o| o > chapter_offset)
        .min();

        self.stream.seek(chapter_offset)?;
        let page_count = self.header.page_count as usize;
        let mut pos = chapter_offset;

        loop {
            if let Some(end) = area_end {
                if pos + CHAPTER_RECORD_SIZE as u64 > end {
                    break;
                }
            }

            let mut buf = [0u8; CHAPTER_RECORD_SIZE];
            let mut filled = 0usize;
            loop {
                let n = self.stream.read(&mut buf[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
                if filled == CHAPTER_RECORD_SIZE {
                    break;
                }
            }
            if filled < CHAPTER_RECORD_SIZE {
                // Short read at a record boundary: terminate iteration.
                break;
            }

            let name_len = buf[..CHAPTER_NAME_SIZE]
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(CHAPTER_NAME_SIZE);
            let start_1based = u16::from_le_bytes(buf[0x50..0x52].try_into().unwrap());
            let end_1based = u16::from_le_bytes(buf[0x52..0x54].try_into().unwrap());

            if name_len == 0 && start_1based == 0 && end_1based == 0 {
                break;
            }

            pos += CHAPTER_RECORD_SIZE as u64;

            if start_1based == 0 || start_1based as usize > page_count {
                continue;
            }
            let start0 = (start_1based - 1) as usize;
            let end0 = if (end_1based as usize) > page_count {
                page_count - 1
            } else {
                end_1based.saturating_sub(1) as usize
            };
            if start0 > end0 {
                continue;
            }

            callback(ChapterEntry {
                name: &buf[..name_len],
                start: start0,
                end: end0,
            });
        }

        Ok(())
    }
}
