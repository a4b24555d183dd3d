//! Synthetic in-memory container fixtures for integration tests.
//!
//! There are no real `.xtc` files to ship as test fixtures, so these build
//! byte-exact containers from the on-disk layout documented in
//! `src/container.rs`.

pub const HEADER_SIZE: usize = 56;
pub const PAGE_TABLE_ENTRY_SIZE: usize = 16;
pub const PAGE_HEADER_SIZE: usize = 22;

pub const XTC_MAGIC: u32 = 0x0043_5458;
pub const XTG_PAGE_MAGIC: u32 = 0x0047_5458;

fn header(page_count: u16, page_table_offset: u64) -> Vec<u8> {
    let mut h = vec![0u8; HEADER_SIZE];
    h[0..4].copy_from_slice(&XTC_MAGIC.to_le_bytes());
    h[4] = 1;
    h[6..8].copy_from_slice(&page_count.to_le_bytes());
    h[24..32].copy_from_slice(&page_table_offset.to_le_bytes());
    h
}

fn page_table_entry(data_offset: u64, width: u16, height: u16) -> Vec<u8> {
    let mut e = vec![0u8; PAGE_TABLE_ENTRY_SIZE];
    e[0..8].copy_from_slice(&data_offset.to_le_bytes());
    e[12..14].copy_from_slice(&width.to_le_bytes());
    e[14..16].copy_from_slice(&height.to_le_bytes());
    e
}

fn page_header(width: u16, height: u16) -> Vec<u8> {
    let mut h = vec![0u8; PAGE_HEADER_SIZE];
    h[0..4].copy_from_slice(&XTG_PAGE_MAGIC.to_le_bytes());
    h[4..6].copy_from_slice(&width.to_le_bytes());
    h[6..8].copy_from_slice(&height.to_le_bytes());
    h
}

/// Build a minimal single-page 1bpp container with the given page
/// dimensions, filled with a repeating byte pattern.
pub fn one_page_xtc(width: u16, height: u16) -> Vec<u8> {
    let page_table_offset = HEADER_SIZE as u64;
    let data_offset = page_table_offset + PAGE_TABLE_ENTRY_SIZE as u64;
    let row_bytes = (width as usize + 7) / 8;
    let payload: Vec<u8> = (0..row_bytes * height as usize).map(|i| (i % 256) as u8).collect();

    let mut bytes = header(1, page_table_offset);
    bytes.extend(page_table_entry(data_offset, width, height));
    bytes.extend(page_header(width, height));
    bytes.extend(payload);
    bytes
}
