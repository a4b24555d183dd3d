//! Fixed-record binary library catalog codec (§3, §4.4).
//!
//! The catalog is a flat file: a small header followed by `count` fixed-size
//! records. Every string field is a length-prefixed slot — one byte for the
//! payload length, followed by `slot_size - 1` payload bytes — so the whole
//! catalog can be read back without any parsing beyond slicing.
//!
//! ```text
//! header (8 bytes)
//! offset  size  field
//! 0x00    4     magic    "XCAT" (0x54_41_43_58 as bytes, matched literally)
//! 0x04    2     version  u16 LE, must be 1
//! 0x06    2     count    u16 LE, must be <= 4096
//!
//! record (676 bytes), repeated `count` times
//! offset  size  field
//! 0x000   96    title slot    (1-byte len + 95 payload)
//! 0x060   64    author slot   (1-byte len + 63 payload)
//! 0x0A0   2     page_count    u16 LE
//! 0x0A2   1     progress      u8, 0..=100
//! 0x0A3   1     tag_count     u8, 0..=8
//! 0x0A4   256   eight 32-byte tag slots (1-byte len + 31 payload each)
//! 0x1A4   256   filename slot (1-byte len + 255 payload)
//! ------  676 bytes total (0x1A4 + 256 = 0x2A4 = 676)
//! ```

use alloc::vec;
use alloc::vec::Vec;

use crate::bounded::BoundedBytes;
use crate::error::CatalogError;

const MAGIC: &[u8; 4] = b"XCAT";
const VERSION: u16 = 1;
const MAX_RECORDS: u16 = 4096;

const TITLE_SLOT: usize = 96;
const AUTHOR_SLOT: usize = 64;
const TAG_SLOT: usize = 32;
const TAG_COUNT: usize = 8;
const FILENAME_SLOT: usize = 256;

const HEADER_SIZE: usize = 8;

/// One catalog entry. String fields store at most `SLOT - 1` bytes of
/// payload; longer input is truncated when encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub title: BoundedBytes<{ TITLE_SLOT - 1 }>,
    pub author: BoundedBytes<{ AUTHOR_SLOT - 1 }>,
    pub page_count: u16,
    /// `0..=100`.
    pub progress: u8,
    /// Number of populated entries in `tags`, `0..=8`.
    pub tag_count: u8,
    pub tags: [BoundedBytes<{ TAG_SLOT - 1 }>; TAG_COUNT],
    pub filename: BoundedBytes<{ FILENAME_SLOT - 1 }>,
}

impl Default for CatalogRecord {
    fn default() -> Self {
        Self {
            title: BoundedBytes::default(),
            author: BoundedBytes::default(),
            page_count: 0,
            progress: 0,
            tag_count: 0,
            tags: [BoundedBytes::default(); TAG_COUNT],
            filename: BoundedBytes::default(),
        }
    }
}

impl CatalogRecord {
    pub const ENCODED_SIZE: usize =
        TITLE_SLOT + AUTHOR_SLOT + 2 + 1 + 1 + TAG_SLOT * TAG_COUNT + FILENAME_SLOT;

    fn encode_into(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), Self::ENCODED_SIZE);
        let mut offset = 0;

        encode_slot(&mut out[offset..offset + TITLE_SLOT], self.title.as_bytes());
        offset += TITLE_SLOT;

        encode_slot(&mut out[offset..offset + AUTHOR_SLOT], self.author.as_bytes());
        offset += AUTHOR_SLOT;

        out[offset..offset + 2].copy_from_slice(&self.page_count.to_le_bytes());
        offset += 2;

        out[offset] = self.progress;
        offset += 1;

        out[offset] = self.tag_count;
        offset += 1;

        for tag in &self.tags {
            encode_slot(&mut out[offset..offset + TAG_SLOT], tag.as_bytes());
            offset += TAG_SLOT;
        }

        encode_slot(&mut out[offset..offset + FILENAME_SLOT], self.filename.as_bytes());
    }

    fn decode_from(bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), Self::ENCODED_SIZE);
        let mut offset = 0;

        let title = decode_slot(&bytes[offset..offset + TITLE_SLOT]);
        offset += TITLE_SLOT;

        let author = decode_slot(&bytes[offset..offset + AUTHOR_SLOT]);
        offset += AUTHOR_SLOT;

        let page_count = u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap());
        offset += 2;

        let progress = bytes[offset];
        offset += 1;

        let tag_count = bytes[offset];
        offset += 1;

        let mut tags = [BoundedBytes::default(); TAG_COUNT];
        for tag in tags.iter_mut() {
            *tag = decode_slot(&bytes[offset..offset + TAG_SLOT]);
            offset += TAG_SLOT;
        }

        let filename = decode_slot(&bytes[offset..offset + FILENAME_SLOT]);

        Self {
            title,
            author,
            page_count,
            progress,
            tag_count,
            tags,
            filename,
        }
    }
}

/// Write a length-prefixed slot: 1-byte length (clamped to `slot.len() - 1`)
/// followed by that many payload bytes. Any remaining bytes are left zeroed.
fn encode_slot(slot: &mut [u8], payload: &[u8]) {
    let cap = slot.len() - 1;
    let n = payload.len().min(cap).min(u8::MAX as usize);
    slot[0] = n as u8;
    slot[1..1 + n].copy_from_slice(&payload[..n]);
    for b in &mut slot[1 + n..] {
        *b = 0;
    }
}

/// Read a length-prefixed slot back. An on-disk length exceeding the slot's
/// payload capacity is clamped rather than treated as an error (§4.7 "clamp
/// lengths to on-disk limits").
fn decode_slot<const CAP: usize>(slot: &[u8]) -> BoundedBytes<CAP> {
    let declared = slot[0] as usize;
    let cap = slot.len() - 1;
    let n = declared.min(cap);
    BoundedBytes::from_slice(&slot[1..1 + n])
}

/// Encode `records` into a freshly-allocated buffer, preceded by the header.
///
/// Fails with [`CatalogError::TooManyBooks`] if `records.len() > 4096`.
pub fn encode(records: &[CatalogRecord]) -> Result<Vec<u8>, CatalogError> {
    if records.len() > MAX_RECORDS as usize {
        return Err(CatalogError::TooManyBooks);
    }
    let mut out = Vec::with_capacity(HEADER_SIZE + records.len() * CatalogRecord::ENCODED_SIZE);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(records.len() as u16).to_le_bytes());
    for record in records {
        let mut buf = vec![0u8; CatalogRecord::ENCODED_SIZE];
        record.encode_into(&mut buf);
        out.extend_from_slice(&buf);
    }
    Ok(out)
}

/// Decode a catalog blob into its header-declared version and records.
///
/// The returned version is whatever the header declared (currently always
/// `1`, since [`VERSION`] is the only accepted value) so callers that later
/// add a second version have somewhere to branch from without re-parsing the
/// header themselves.
pub fn decode(bytes: &[u8]) -> Result<(u16, heapless::Vec<CatalogRecord, 4096>), CatalogError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CatalogError::TooShort);
    }
    if &bytes[0..4] != MAGIC {
        return Err(CatalogError::BadMagic);
    }
    let version = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
    if version != VERSION {
        return Err(CatalogError::BadVersion);
    }
    let count = u16::from_le_bytes(bytes[6..8].try_into().unwrap());
    if count > MAX_RECORDS {
        return Err(CatalogError::TooManyBooks);
    }

    let body = &bytes[HEADER_SIZE..];
    let expected_len = count as usize * CatalogRecord::ENCODED_SIZE;
    if body.len() < expected_len {
        return Err(CatalogError::MisalignedSize);
    }

    let mut records = heapless::Vec::new();
    for i in 0..count as usize {
        let start = i * CatalogRecord::ENCODED_SIZE;
        let record = CatalogRecord::decode_from(&body[start..start + CatalogRecord::ENCODED_SIZE]);
        // `count <= MAX_RECORDS` is checked above, so this never overflows
        // the fixed-capacity vec.
        let _ = records.push(record);
    }

    Ok((version, records))
}
