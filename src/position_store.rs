//! Reading-position persistence over an abstract key-value store (§4.5).
//!
//! Positions are keyed by a stable hash of the book's catalog filename, so
//! renaming a book's *title* never loses its reading position, and the key
//! itself is a small fixed-size ASCII string: `"p"` followed by eight lower-
//! case hex digits of a 32-bit Jenkins one-at-a-time hash, followed by a NUL.
//! All positions live in a single fixed namespace, opened fresh for each
//! call rather than held open across the shell's lifetime (§6).

use crate::sdk::{KeyValueStore, KvMode, KvNamespace};

/// `"p" + 8 hex digits + NUL`.
pub const KEY_LEN: usize = 10;

/// The key-value namespace every reading position lives under.
const NAMESPACE: &str = "xtc_reader";

/// Jenkins' one-at-a-time hash.
fn jenkins_one_at_a_time(data: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in data {
        hash = hash.wrapping_add(byte as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Build the fixed 10-byte key `"p" + 8 lowercase hex digits + NUL` used to
/// address a book's reading position in the key-value store.
pub fn build_key(name: &[u8]) -> [u8; KEY_LEN] {
    let hash = jenkins_one_at_a_time(name);
    let mut key = [0u8; KEY_LEN];
    key[0] = b'p';
    for i in 0..8 {
        let nibble = (hash >> (28 - i * 4)) & 0xF;
        key[1 + i] = HEX_DIGITS[nibble as usize];
    }
    key[9] = 0;
    key
}

/// Loads and stores a book's current 0-based page index keyed by filename,
/// over any [`KeyValueStore`] implementation.
pub struct ReadingPositionStore<'kv, K: KeyValueStore> {
    kv: &'kv mut K,
}

impl<'kv, K: KeyValueStore> ReadingPositionStore<'kv, K> {
    pub fn new(kv: &'kv mut K) -> Self {
        Self { kv }
    }

    /// Look up the stored page index for `filename`.
    ///
    /// Returns `None` for an empty filename, a namespace-open failure, or a
    /// missing key — all three are "no saved position", not distinct errors
    /// worth surfacing to the caller.
    pub fn load(&mut self, filename: &[u8]) -> Option<u32> {
        if filename.is_empty() {
            return None;
        }
        let key = build_key(filename);
        let mut ns = self.kv.open(NAMESPACE, KvMode::ReadOnly)?;
        let value = ns.get_u32(&key);
        ns.close();
        value
    }

    /// Persist `page_index` for `filename`.
    ///
    /// A no-op for an empty filename or a namespace-open failure. A write
    /// that fails partway (the `set_u32` itself, or the following commit) is
    /// logged but otherwise swallowed: a lost reading-position update is
    /// recoverable on the next successful store, not worth failing the
    /// caller's redraw over.
    pub fn store(&mut self, filename: &[u8], page_index: u32) {
        if filename.is_empty() {
            return;
        }
        let Some(mut ns) = self.kv.open(NAMESPACE, KvMode::ReadWrite) else {
            #[cfg(feature = "std")]
            log::warn!("position_store: failed to open namespace for write");
            return;
        };
        let key = build_key(filename);
        if ns.set_u32(&key, page_index) {
            if !ns.commit() {
                #[cfg(feature = "std")]
                log::warn!("position_store: commit failed");
            }
        } else {
            #[cfg(feature = "std")]
            log::warn!("position_store: set_u32 failed");
        }
        ns.close();
    }
}
