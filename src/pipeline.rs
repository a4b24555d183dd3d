//! The page render pipeline: validate, crop, centre and push a single page
//! to the display (§4.6).
//!
//! Two very different payload shapes reach this module depending on
//! [`BitDepth`]:
//!
//! - `BitDepth::One` (`XTG` pages) are raw MSB-first 1bpp bitmaps at the
//!   page's own width/height. When the whole image fills the display with
//!   no cropping and is byte-aligned, it is pushed straight through
//!   ("direct-push"); otherwise each visible row is cropped and centred into
//!   a byte-aligned main region plus a sub-byte tail region, each accumulated
//!   across every row and pushed exactly once ("stream-and-crop").
//! - `BitDepth::Two` (`XTH` pages) are two stacked 1bpp bitplanes that decode
//!   to 4-level grayscale; the whole payload is loaded, decoded pixel by
//!   pixel, and pushed as one grayscale region.
//!
//! Both paths paint the letterboxing bands (blank rows/columns around an
//! image smaller than the panel) explicitly, since [`Display::push_region`]
//! only touches the region it is given.
//!
//! Before dispatching on bit depth, the page-table entry's declared
//! `(width, height)` is cross-checked against the per-page header's own
//! `(width, height)`; a mismatch is a corrupted container, not something
//! either render path should silently paper over (§4.6 point 3).

use alloc::vec;
use alloc::vec::Vec;

use crate::bits::{bytes_for_bits, crop_row_1bpp_msb};
use crate::container::{BitDepth, ContainerReader};
use crate::error::PipelineError;
use crate::sdk::Display;
use crate::stream::Stream;

/// Bounds how many source rows are buffered in a single chunk while
/// streaming an `XTG` page, trading peak memory for call overhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchBudget {
    pub rows_per_chunk: usize,
}

impl Default for ScratchBudget {
    fn default() -> Self {
        Self { rows_per_chunk: 4 }
    }
}

impl ScratchBudget {
    /// A single source row at a time — the minimum possible peak memory.
    pub const fn minimal() -> Self {
        Self { rows_per_chunk: 1 }
    }

    /// A larger chunk for hosts with headroom to spare.
    pub const fn generous() -> Self {
        Self { rows_per_chunk: 16 }
    }
}

/// Where a cropped/centred image sits within the display's full rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    /// Visible width/height, clamped to the display's dimensions.
    visible_w: u16,
    visible_h: u16,
    /// Top-left offset of the visible area within the display.
    x_off: u16,
    y_off: u16,
    /// Top-left offset of the visible area within the source image.
    src_x_off: u16,
    src_y_off: u16,
}

fn compute_placement(src_w: u16, src_h: u16, display_w: u16, display_h: u16) -> Placement {
    let visible_w = src_w.min(display_w);
    let visible_h = src_h.min(display_h);
    let x_off = (display_w.saturating_sub(visible_w)) / 2;
    let y_off = (display_h.saturating_sub(visible_h)) / 2;
    let src_x_off = (src_w.saturating_sub(visible_w)) / 2;
    let src_y_off = (src_h.saturating_sub(visible_h)) / 2;
    Placement {
        visible_w,
        visible_h,
        x_off,
        y_off,
        src_x_off,
        src_y_off,
    }
}

/// Paint the blank bands above, below, left and right of the visible area;
/// an all-white row is a buffer of `0xFF` bytes at the display's row width.
fn paint_letterbox<D: Display>(display: &mut D, placement: &Placement, display_w: u16, display_h: u16) {
    if placement.y_off > 0 {
        paint_blank_band(display, 0, 0, display_w, placement.y_off);
    }
    let bottom = placement.y_off + placement.visible_h;
    if bottom < display_h {
        paint_blank_band(display, 0, bottom, display_w, display_h - bottom);
    }
    if placement.x_off > 0 {
        paint_blank_band(display, 0, placement.y_off, placement.x_off, placement.visible_h);
    }
    let right = placement.x_off + placement.visible_w;
    if right < display_w {
        paint_blank_band(
            display,
            right,
            placement.y_off,
            display_w - right,
            placement.visible_h,
        );
    }
}

fn paint_blank_band<D: Display>(display: &mut D, x: u16, y: u16, w: u16, h: u16) {
    if w == 0 || h == 0 {
        return;
    }
    let row_bytes = bytes_for_bits(w as usize);
    let mut row = [0u8; 64];
    if row_bytes <= row.len() {
        for b in &mut row[..row_bytes] {
            *b = 0xFF;
        }
        for r in 0..h {
            display.push_region(x, y + r, w, 1, &row[..row_bytes]);
        }
    } else {
        // Bands wider than the stack buffer are rare; fall back to pushing
        // in chunks bounded to the stack buffer's width.
        for r in 0..h {
            let mut remaining = w;
            let mut col = x;
            while remaining > 0 {
                let chunk_w = remaining.min((row.len() * 8) as u16);
                let chunk_bytes = bytes_for_bits(chunk_w as usize);
                for b in &mut row[..chunk_bytes] {
                    *b = 0xFF;
                }
                display.push_region(col, y + r, chunk_w, 1, &row[..chunk_bytes]);
                col += chunk_w;
                remaining -= chunk_w;
            }
        }
    }
}

/// Render page `index` from `container` onto `display` (§4.6).
pub fn render_page<S: Stream, D: Display>(
    container: &mut ContainerReader<'_, S>,
    index: u16,
    display: &mut D,
    scratch_budget: ScratchBudget,
) -> Result<(), PipelineError> {
    let bit_depth = container.bit_depth();
    let prepared = container.prepare_page_read(index)?;
    if prepared.width != prepared.entry_width || prepared.height != prepared.entry_height {
        #[cfg(feature = "std")]
        log::warn!(
            "render_page: page {index} header {}x{} disagrees with page table {}x{}",
            prepared.width,
            prepared.height,
            prepared.entry_width,
            prepared.entry_height
        );
        return Err(PipelineError::InvalidPageHeader);
    }
    let (display_w, display_h) = display.dimensions();
    let placement = compute_placement(prepared.width, prepared.height, display_w, display_h);

    #[cfg(feature = "std")]
    log::debug!(
        "render_page: page {index} {}x{} onto {display_w}x{display_h}",
        prepared.width,
        prepared.height
    );

    paint_letterbox(display, &placement, display_w, display_h);

    match bit_depth {
        BitDepth::One => {
            if use_direct_push(prepared.width, &placement) {
                render_xtg_direct_push(container, index, &placement, display)
            } else {
                render_xtg_stream_and_crop(container, index, prepared.width, &placement, display, scratch_budget)
            }
        }
        BitDepth::Two => render_xth_direct_submit(container, index, prepared.width, prepared.height, &placement, display),
    }
}

/// Whether the whole source image can be pushed straight through: no
/// cropping on any side, and a byte-aligned width (§4.6 point 5).
fn use_direct_push(src_width: u16, placement: &Placement) -> bool {
    src_width % 8 == 0
        && placement.visible_w == src_width
        && placement.src_x_off == 0
        && placement.src_y_off == 0
}

/// `XTG` pages that fill the display with no cropping: read the whole
/// byte-aligned payload and push it once.
fn render_xtg_direct_push<S: Stream, D: Display>(
    container: &mut ContainerReader<'_, S>,
    index: u16,
    placement: &Placement,
    display: &mut D,
) -> Result<(), PipelineError> {
    let row_bytes = bytes_for_bits(placement.visible_w as usize);
    if row_bytes == 0 || placement.visible_h == 0 {
        return Ok(());
    }
    let mut buf = vec![0u8; row_bytes * placement.visible_h as usize];
    container.load_page(index, &mut buf)?;
    display.push_region(placement.x_off, placement.y_off, placement.visible_w, placement.visible_h, &buf);
    Ok(())
}

/// `XTG` pages needing cropping: crop each visible source row, split it into
/// a byte-aligned main region and a sub-byte tail region, accumulate both
/// across every visible row, and push each region exactly once.
fn render_xtg_stream_and_crop<S: Stream, D: Display>(
    container: &mut ContainerReader<'_, S>,
    index: u16,
    src_width: u16,
    placement: &Placement,
    display: &mut D,
    scratch_budget: ScratchBudget,
) -> Result<(), PipelineError> {
    let src_row_bytes = bytes_for_bits(src_width as usize);
    if src_row_bytes == 0 || placement.visible_h == 0 {
        return Ok(());
    }
    let rows_per_chunk = scratch_budget.rows_per_chunk.max(1);

    let main_w = placement.visible_w & !7;
    let tail_w = placement.visible_w - main_w;
    let main_row_bytes = bytes_for_bits(main_w as usize);
    let visible_h = placement.visible_h as usize;

    let mut main_buf = vec![0xFFu8; main_row_bytes * visible_h];
    let mut tail_buf = vec![0xFFu8; visible_h];

    let cropped_row_bytes = bytes_for_bits(placement.visible_w as usize).max(1);
    let mut cropped = vec![0u8; cropped_row_bytes];
    let mut scratch = vec![0u8; src_row_bytes * rows_per_chunk];

    container.stream_page(index, &mut scratch, |chunk, payload_offset| {
        let first_row = (payload_offset / src_row_bytes as u64) as u16;
        let rows_in_chunk = chunk.len() / src_row_bytes;
        for r in 0..rows_in_chunk {
            let src_row = first_row + r as u16;
            if src_row < placement.src_y_off || src_row >= placement.src_y_off + placement.visible_h {
                continue;
            }
            let dst_row = (src_row - placement.src_y_off) as usize;
            let row_bytes = &chunk[r * src_row_bytes..(r + 1) * src_row_bytes];

            crop_row_1bpp_msb(
                &mut cropped,
                row_bytes,
                placement.src_x_off as usize,
                placement.visible_w as usize,
            );

            if main_w > 0 {
                let dst = &mut main_buf[dst_row * main_row_bytes..(dst_row + 1) * main_row_bytes];
                dst.copy_from_slice(&cropped[..main_row_bytes]);
            }
            if tail_w > 0 {
                // The tail is the final `tail_w` (< 8) bits of the cropped
                // row, packed MSB-first into the top bits of one byte.
                let mut tail_byte = 0xFFu8;
                for i in 0..tail_w as usize {
                    let bit = main_w as usize + i;
                    let src_byte = cropped[bit / 8];
                    let is_black = (src_byte >> (7 - (bit % 8))) & 1 == 0;
                    if is_black {
                        tail_byte &= !(0x80 >> i);
                    }
                }
                tail_buf[dst_row] = tail_byte;
            }
        }
    })?;

    if main_w > 0 {
        display.push_region(placement.x_off, placement.y_off, main_w, placement.visible_h, &main_buf);
    }
    if tail_w > 0 {
        let tail_x = placement.x_off + main_w;
        for row in 0..visible_h {
            display.push_region(tail_x, placement.y_off + row as u16, tail_w, 1, &tail_buf[row..row + 1]);
        }
    }

    Ok(())
}

/// Map a 2-bit grayscale sample to its display value (§8 scenario 5).
const fn gray_level(value: u8) -> u8 {
    match value {
        0 => 255,
        1 => 85,
        2 => 170,
        _ => 0,
    }
}

/// `XTH` pages: decode the two stacked 1bpp bitplanes into grayscale pixels
/// and push the visible region once.
fn render_xth_direct_submit<S: Stream, D: Display>(
    container: &mut ContainerReader<'_, S>,
    index: u16,
    src_width: u16,
    src_height: u16,
    placement: &Placement,
    display: &mut D,
) -> Result<(), PipelineError> {
    if placement.visible_w == 0 || placement.visible_h == 0 {
        return Ok(());
    }
    let w = src_width as usize;
    let h = src_height as usize;
    let plane_bytes = (w * h + 7) / 8;

    let mut payload = vec![0u8; plane_bytes * 2];
    container.load_page(index, &mut payload)?;
    let (plane_a, plane_b) = payload.split_at(plane_bytes);

    let bit_at = |plane: &[u8], bit: usize| -> u8 { (plane[bit / 8] >> (7 - (bit % 8))) & 1 };

    let mut pixels: Vec<u8> = Vec::with_capacity(placement.visible_w as usize * placement.visible_h as usize);
    for dy in 0..placement.visible_h {
        let src_y = placement.src_y_off + dy;
        for dx in 0..placement.visible_w {
            let src_x = placement.src_x_off + dx;
            let bit_linear = (w - 1 - src_x as usize) * h + src_y as usize;
            let b1 = bit_at(plane_a, bit_linear);
            let b0 = bit_at(plane_b, bit_linear);
            let value = (b1 << 1) | b0;
            pixels.push(gray_level(value));
        }
    }

    display.push_grayscale_region(placement.x_off, placement.y_off, placement.visible_w, placement.visible_h, &pixels);
    Ok(())
}
