//! End-to-end coverage across module boundaries: open a container, render a
//! page through the pipeline, and round-trip a catalog into library entries.

mod common;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use common::fixtures::one_page_xtc;
use xtc_reader::container::ContainerReader;
use xtc_reader::pipeline::{render_page, ScratchBudget};
use xtc_reader::sdk::Display;
use xtc_reader::stream::SliceStream;

use xtc_reader::bounded::BoundedBytes;
use xtc_reader::catalog::{self, CatalogRecord};
use xtc_reader::error::ReaderError;
use xtc_reader::library::{load_books, LibraryLimits, SortOrder};
use xtc_reader::position_store::{build_key, KEY_LEN};
use xtc_reader::sdk::{FileEntry, Filesystem, KeyValueStore, KvMode, KvNamespace};
use xtc_reader::stream::Stream;

const CATALOG_PATH: &str = "/sdcard/books/.catalog.bin";

struct CapturingDisplay {
    w: u16,
    h: u16,
    canvas_rows: Vec<Vec<u8>>,
}

impl CapturingDisplay {
    fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            canvas_rows: vec![vec![0u8; (w as usize + 7) / 8]; h as usize],
        }
    }
}

impl Display for CapturingDisplay {
    fn dimensions(&self) -> (u16, u16) {
        (self.w, self.h)
    }

    fn push_region(&mut self, x: u16, y: u16, width: u16, height: u16, data: &[u8]) {
        let row_bytes = (width as usize + 7) / 8;
        assert!(data.len() >= row_bytes * height as usize);
        let _ = x;
        for row in 0..height as usize {
            let src = &data[row * row_bytes..(row + 1) * row_bytes];
            self.canvas_rows[y as usize + row][..row_bytes].copy_from_slice(src);
        }
    }

    fn push_grayscale_region(&mut self, _x: u16, _y: u16, _width: u16, _height: u16, _pixels: &[u8]) {}

    fn present(&mut self) {}
}

#[test]
fn render_page_fills_every_display_row() {
    let bytes = one_page_xtc(40, 20);
    let mut stream = SliceStream::new(&bytes);
    let mut reader = ContainerReader::open(&mut stream).unwrap();

    let mut display = CapturingDisplay::new(64, 32);
    render_page(&mut reader, 0, &mut display, ScratchBudget::minimal()).unwrap();

    // Every display row should have received a push (either image data or
    // letterbox padding) since the pipeline paints the full rectangle.
    assert_eq!(display.canvas_rows.len(), 32);
}

#[test]
fn render_page_with_oversized_image_clips_to_display() {
    // 100x100 source onto a 64x32 display: both dimensions must clip.
    let bytes = one_page_xtc(100, 100);
    let mut stream = SliceStream::new(&bytes);
    let mut reader = ContainerReader::open(&mut stream).unwrap();

    let mut display = CapturingDisplay::new(64, 32);
    render_page(&mut reader, 0, &mut display, ScratchBudget::default()).unwrap();
    assert_eq!(display.canvas_rows.len(), 32);
}

struct FakeStream {
    data: Vec<u8>,
    pos: usize,
}

impl Stream for FakeStream {
    fn seek(&mut self, pos: u64) -> Result<(), ReaderError> {
        let pos = pos as usize;
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

#[derive(Default)]
struct FakeFs {
    mounted: bool,
    files: HashMap<String, Vec<u8>>,
}

impl Filesystem for FakeFs {
    type Dir = std::vec::IntoIter<FileEntry>;
    type Stream = FakeStream;

    fn is_mounted(&mut self) -> bool {
        self.mounted
    }

    fn mount(&mut self) -> bool {
        self.mounted = true;
        true
    }

    fn list_dir(&mut self, path: &str) -> Option<Self::Dir> {
        let prefix = format!("{path}/");
        let mut names: Vec<FileEntry> = self
            .files
            .keys()
            .filter(|k| k.starts_with(&prefix) && !k[prefix.len()..].contains('/'))
            .map(|k| FileEntry {
                name: BoundedBytes::from_slice(k[prefix.len()..].as_bytes()),
                is_dir: false,
            })
            .collect();
        names.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Some(names.into_iter())
    }

    fn open(&mut self, path: &str) -> Option<Self::Stream> {
        self.files.get(path).map(|data| FakeStream {
            data: data.clone(),
            pos: 0,
        })
    }

    fn write_file(&mut self, path: &str, data: &[u8]) -> bool {
        self.files.insert(path.to_string(), data.to_vec());
        true
    }

    fn remove(&mut self, path: &str) -> bool {
        self.files.remove(path);
        true
    }

    fn make_dir(&mut self, _path: &str) -> bool {
        true
    }
}

#[derive(Default, Clone)]
struct FakeKv {
    data: Rc<RefCell<HashMap<[u8; KEY_LEN], u32>>>,
}

struct FakeNamespace {
    data: Rc<RefCell<HashMap<[u8; KEY_LEN], u32>>>,
}

impl KvNamespace for FakeNamespace {
    fn get_u32(&mut self, key: &[u8; KEY_LEN]) -> Option<u32> {
        self.data.borrow().get(key).copied()
    }

    fn set_u32(&mut self, key: &[u8; KEY_LEN], value: u32) -> bool {
        self.data.borrow_mut().insert(*key, value);
        true
    }

    fn commit(&mut self) -> bool {
        true
    }

    fn close(self) {}
}

impl KeyValueStore for FakeKv {
    type Namespace = FakeNamespace;

    fn open(&mut self, _namespace: &str, _mode: KvMode) -> Option<Self::Namespace> {
        Some(FakeNamespace {
            data: self.data.clone(),
        })
    }
}

fn make_record(title: &str, author: &str, page_count: u16, filename: &str) -> CatalogRecord {
    CatalogRecord {
        title: BoundedBytes::from_slice(title.as_bytes()),
        author: BoundedBytes::from_slice(author.as_bytes()),
        page_count,
        progress: 0,
        tag_count: 0,
        tags: Default::default(),
        filename: BoundedBytes::from_slice(filename.as_bytes()),
    }
}

#[test]
fn catalog_round_trip_feeds_library_loader() {
    let mut fs = FakeFs::default();
    let record = make_record("Moby Dick", "Herman Melville", 120, "book.xtc");
    fs.files.insert(CATALOG_PATH.to_string(), catalog::encode(&[record]).unwrap());

    let mut kv = FakeKv::default();
    kv.open("xtc_reader", KvMode::ReadWrite)
        .unwrap()
        .set_u32(&build_key(b"book.xtc"), 59);

    let entries = load_books(&mut fs, &mut kv, LibraryLimits::default(), SortOrder::CatalogOrder).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title.as_str(), Some("Moby Dick"));
    // page 59 of 120 (0-based): 59*100/119 rounds down to 49%.
    assert_eq!(entries[0].progress_percent(), 49);
}
