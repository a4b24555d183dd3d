//! Book library: load the on-device catalog (scanning and rebuilding it if
//! necessary), compute reading progress, and sort entries for display (§4.7).

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;

use heapless::Vec as HVec;

use crate::bounded::BoundedBytes;
use crate::catalog::{self, CatalogRecord};
use crate::container::ContainerReader;
use crate::error::LibraryError;
use crate::position_store::ReadingPositionStore;
use crate::sdk::{Filesystem, KeyValueStore};
use crate::stream::Stream;

const BOOKS_DIR: &str = "/sdcard/books";
const CATALOG_PATH: &str = "/sdcard/books/.catalog.bin";

/// Upper bound on a catalog file's byte length: the 8-byte header plus the
/// largest catalog the format allows (4096 records of 676 bytes each). A
/// file beyond this is treated as unreadable rather than read without bound.
const MAX_CATALOG_BYTES: usize = 8 + 4096 * 676;

/// Caps on how many books / catalog records the library will ever hold in
/// memory at once, mirroring the catalog format's own 4096-record cap while
/// keeping the in-memory working set far smaller (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryLimits {
    pub max_entries: usize,
    pub max_catalog_records: usize,
}

impl Default for LibraryLimits {
    fn default() -> Self {
        Self {
            max_entries: 128,
            max_catalog_records: 4096,
        }
    }
}

/// How [`load_books`] orders the returned entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently opened first (highest progress ratio among in-progress
    /// books), unstarted and finished books last, tied on title.
    RecentlyRead,
    /// Ascending, ASCII case-insensitive by `(author, title, filename)`.
    CatalogOrder,
    /// Lexicographic by title.
    Title,
}

/// A book entry ready for display: bounded strings plus computed progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub title: BoundedBytes<95>,
    pub author: BoundedBytes<63>,
    pub filename: BoundedBytes<255>,
    pub page_count: u16,
    pub progress: u8,
}

impl LibraryEntry {
    /// Progress as a percentage in `0..=100`, already clamped at load time.
    pub fn progress_percent(&self) -> u8 {
        self.progress
    }

    fn from_record(record: &CatalogRecord, progress: u8) -> Self {
        Self {
            title: BoundedBytes::from_slice(record.title.as_bytes()),
            author: BoundedBytes::from_slice(record.author.as_bytes()),
            filename: BoundedBytes::from_slice(record.filename.as_bytes()),
            page_count: record.page_count,
            progress,
        }
    }
}

/// The percentage of `page_count` that `saved` (a 0-based page index)
/// represents, such that landing on the last page reads as exactly 100%
/// (§4.7). Books shorter than 2 pages always read as 0%.
fn compute_progress(saved: Option<u32>, page_count: u16) -> u8 {
    let Some(saved) = saved else { return 0 };
    if page_count < 2 {
        return 0;
    }
    let denom = (page_count - 1) as u64;
    let ratio = (saved.min(page_count as u32 - 1) as u64 * 100) / denom;
    ratio.min(100) as u8
}

/// Load the library, preferring the persisted catalog and falling back to a
/// full scan of [`BOOKS_DIR`] when the catalog is missing or unreadable
/// (§4.7).
pub fn load_books<F: Filesystem, K: KeyValueStore>(
    fs: &mut F,
    kv: &mut K,
    limits: LibraryLimits,
    order: SortOrder,
) -> Result<HVec<LibraryEntry, 128>, LibraryError> {
    if !fs.is_mounted() && !fs.mount() {
        return Err(LibraryError::Io);
    }

    let mut entries = match load_from_catalog(fs, kv, limits) {
        Some(entries) => entries,
        None => scan_books(fs, kv, limits)?,
    };

    sort_entries(&mut entries, order);
    Ok(entries)
}

/// Force a fresh scan, discarding any persisted catalog (§4.7).
pub fn refresh_books<F: Filesystem, K: KeyValueStore>(
    fs: &mut F,
    kv: &mut K,
    limits: LibraryLimits,
    order: SortOrder,
) -> Result<HVec<LibraryEntry, 128>, LibraryError> {
    if !fs.is_mounted() && !fs.mount() {
        return Err(LibraryError::Io);
    }
    fs.remove(CATALOG_PATH);
    let mut entries = scan_books(fs, kv, limits)?;
    sort_entries(&mut entries, order);
    Ok(entries)
}

fn load_from_catalog<F: Filesystem, K: KeyValueStore>(
    fs: &mut F,
    kv: &mut K,
    limits: LibraryLimits,
) -> Option<HVec<LibraryEntry, 128>> {
    let mut stream = fs.open(CATALOG_PATH)?;
    let bytes = read_all(&mut stream)?;
    let (_, records) = catalog::decode(&bytes)
        .map_err(|err| {
            #[cfg(feature = "std")]
            log::warn!("library: catalog decode failed: {err}");
            #[cfg(not(feature = "std"))]
            let _ = err;
        })
        .ok()?;

    let mut position_store = ReadingPositionStore::new(kv);
    let mut entries: HVec<LibraryEntry, 128> = HVec::new();
    for record in records.iter().take(limits.max_entries.min(128)) {
        let saved = position_store.load(record.filename.as_bytes());
        let progress = compute_progress(saved, record.page_count);
        if entries.push(LibraryEntry::from_record(record, progress)).is_err() {
            break;
        }
    }
    Some(entries)
}

fn read_all<S: Stream>(stream: &mut S) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_CATALOG_BYTES {
            return None;
        }
    }
    Some(buf)
}

/// Walk [`BOOKS_DIR`], probing every `.xtc`/`.xtch` file for its page count
/// and title/author, then best-effort rewrite the catalog so the next load
/// can skip straight to [`load_from_catalog`] (§4.7).
fn scan_books<F: Filesystem, K: KeyValueStore>(
    fs: &mut F,
    kv: &mut K,
    limits: LibraryLimits,
) -> Result<HVec<LibraryEntry, 128>, LibraryError> {
    let dir = fs.list_dir(BOOKS_DIR).ok_or(LibraryError::NotFound)?;

    let mut entries: HVec<LibraryEntry, 128> = HVec::new();
    let mut records: Vec<CatalogRecord> = Vec::new();
    let mut position_store = ReadingPositionStore::new(kv);
    let max_entries = limits.max_entries.min(128);
    let max_records = limits.max_catalog_records.min(4096);

    for file in dir {
        if entries.len() >= max_entries {
            break;
        }
        if file.is_dir {
            continue;
        }
        let Some(name) = file.name.as_str() else {
            continue;
        };
        if name.starts_with('.') || !has_xtc_suffix(name.as_bytes()) {
            continue;
        }

        let path = join_path(BOOKS_DIR, name);
        let Some(mut stream) = fs.open(&path) else {
            continue;
        };
        let Ok(mut reader) = ContainerReader::open(&mut stream) else {
            continue;
        };

        let page_count = reader.page_count();
        let metadata = reader.read_metadata().unwrap_or_default();
        let title = if metadata.title.is_empty() {
            BoundedBytes::from_slice(name.as_bytes())
        } else {
            BoundedBytes::from_slice(metadata.title.as_bytes())
        };
        let author = BoundedBytes::from_slice(metadata.author.as_bytes());
        let filename = BoundedBytes::from_slice(name.as_bytes());

        let saved = position_store.load(name.as_bytes());
        let progress = compute_progress(saved, page_count);

        if records.len() < max_records {
            records.push(CatalogRecord {
                title: BoundedBytes::from_slice(title.as_bytes()),
                author: BoundedBytes::from_slice(author.as_bytes()),
                page_count,
                progress,
                tag_count: 0,
                tags: Default::default(),
                filename: BoundedBytes::from_slice(filename.as_bytes()),
            });
        }

        let _ = entries.push(LibraryEntry {
            title,
            author,
            filename,
            page_count,
            progress,
        });
    }
    drop(position_store);

    if let Ok(bytes) = catalog::encode(&records) {
        if !fs.write_file(CATALOG_PATH, &bytes) {
            #[cfg(feature = "std")]
            log::warn!("library: catalog rewrite failed");
        }
    }

    Ok(entries)
}

fn has_xtc_suffix(name: &[u8]) -> bool {
    ends_with_ci(name, b".xtc") || ends_with_ci(name, b".xtch")
}

fn ends_with_ci(name: &[u8], suffix: &[u8]) -> bool {
    if name.len() < suffix.len() {
        return false;
    }
    let tail = &name[name.len() - suffix.len()..];
    tail.iter().zip(suffix).all(|(a, b)| a.to_ascii_lowercase() == b.to_ascii_lowercase())
}

fn join_path(dir: &str, name: &str) -> String {
    let mut path = String::with_capacity(dir.len() + 1 + name.len());
    path.push_str(dir);
    path.push('/');
    path.push_str(name);
    path
}

fn ascii_ci_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.iter().map(|x| x.to_ascii_lowercase()).cmp(b.iter().map(|x| x.to_ascii_lowercase()))
}

fn sort_entries(entries: &mut HVec<LibraryEntry, 128>, order: SortOrder) {
    match order {
        SortOrder::CatalogOrder => {
            entries.sort_unstable_by(|a, b| {
                ascii_ci_cmp(a.author.as_bytes(), b.author.as_bytes())
                    .then_with(|| ascii_ci_cmp(a.title.as_bytes(), b.title.as_bytes()))
                    .then_with(|| ascii_ci_cmp(a.filename.as_bytes(), b.filename.as_bytes()))
            });
        }
        SortOrder::Title => {
            entries.sort_unstable_by(|a, b| a.title.as_bytes().cmp(b.title.as_bytes()));
        }
        SortOrder::RecentlyRead => {
            entries.sort_unstable_by(|a, b| {
                b.progress_percent()
                    .cmp(&a.progress_percent())
                    .then_with(|| a.title.as_bytes().cmp(b.title.as_bytes()))
            });
        }
    }
}
