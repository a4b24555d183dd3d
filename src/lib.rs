//! A memory-conservative reader for the XTC/XTCH e-book container format,
//! built for embedded e-paper readers.
//!
//! The crate is organized bottom-up:
//!
//! - [`stream`] — the seekable byte source the reader is generic over.
//! - [`bits`] / [`bounded`] — MSB-first bit-packing and fixed-capacity byte
//!   buffer primitives shared by every other module.
//! - [`container`] — parses the container header, page table, metadata and
//!   chapter table, and loads or streams individual page payloads.
//! - [`catalog`] — the on-device library catalog's binary codec.
//! - [`position_store`] — persists per-book reading positions.
//! - [`pipeline`] — crops, centres and pushes a decoded page to a display.
//! - [`library`] — turns a catalog blob into sorted, display-ready entries.
//! - [`sdk`] — the host capability traits (display, touch, filesystem, kv
//!   store) every other module above is generic over.
//! - [`shell`] — tap dispatch, redraw orchestration and the WASM host ABI.
//!
//! Builds `no_std` by default off; enable the `std` feature (on by default)
//! for [`log`]-backed diagnostics and [`std::io`]-backed streams. The crate
//! always depends on `alloc` for its `Vec`/`Box` usage in the catalog and
//! shell layers — there is no allocation-free build.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod bits;
pub mod bounded;
pub mod catalog;
pub mod container;
pub mod error;
pub mod library;
pub mod pipeline;
pub mod position_store;
pub mod sdk;
pub mod shell;
pub mod stream;

pub use container::{BitDepth, ChapterEntry, ContainerHeader, ContainerReader, Metadata, PageTableEntry, ReaderLimits};
pub use error::{CatalogError, LibraryError, PipelineError, ReaderError};
pub use pipeline::{render_page, ScratchBudget};
pub use stream::Stream;
