//! Page layer: fixed-length record page format.
//!
//! Every data page of a record file has the same layout:
//! ```text
//! ┌──────────────┬──────────────────┬─────────┬─────────┬─────┬──────────┐
//! │ next free (4)│ bitmap (n/8 up)  │ slot 0  │ slot 1  │ ... │ slot n-1 │
//! └──────────────┴──────────────────┴─────────┴─────────┴─────┴──────────┘
//! ```
//! The link threads pages with free slots into the file's free-page list.
//! Bit `i` of the bitmap is set iff slot `i` holds a live record.

mod bitmap;
mod header;
mod record_page;

pub use bitmap::{Bitmap, BitmapMut};
pub use header::{DataPageHeader, LINK_SIZE};
pub use record_page::{RecordPage, RecordPageMut};

use crate::error::{Result, StorageError};
use crate::types::PAGE_SIZE;

/// A raw page buffer
#[derive(Clone)]
pub struct PageBuf {
    data: [u8; PAGE_SIZE],
}

impl PageBuf {
    /// Create a new zeroed page buffer
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Get a reference to the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the raw bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Default for PageBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for PageBuf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl std::ops::DerefMut for PageBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

/// Geometry of a data page for one record size.
///
/// Derived once when the file is created and re-derived (and checked against
/// the stored header) when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    record_size: usize,
    records_per_page: usize,
    bitmap_size: usize,
}

impl PageLayout {
    /// Largest record size that still fits one record per page
    pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - LINK_SIZE - 1;

    /// Compute the layout for `record_size`-byte records
    pub fn new(record_size: usize) -> Result<Self> {
        if record_size == 0 {
            return Err(StorageError::InvalidRecordSize(record_size));
        }
        if record_size > Self::MAX_RECORD_SIZE {
            return Err(StorageError::RecordTooLarge {
                size: record_size,
                max: Self::MAX_RECORD_SIZE,
            });
        }

        let records_per_page = Self::capacity_for(record_size);
        Ok(Self {
            record_size,
            records_per_page,
            bitmap_size: bitmap_bytes(records_per_page),
        })
    }

    /// Largest `n` with `header(n) + n * record_size <= PAGE_SIZE`
    fn capacity_for(record_size: usize) -> usize {
        let fits = |n: usize| LINK_SIZE + bitmap_bytes(n) + n * record_size <= PAGE_SIZE;

        // Ignoring bitmap rounding gives an estimate that is off by at most one
        let mut n = (PAGE_SIZE - LINK_SIZE) * 8 / (record_size * 8 + 1);
        while n > 0 && !fits(n) {
            n -= 1;
        }
        while fits(n + 1) {
            n += 1;
        }
        n
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn records_per_page(&self) -> usize {
        self.records_per_page
    }

    pub fn bitmap_size(&self) -> usize {
        self.bitmap_size
    }

    /// Offset of the occupancy bitmap within a page
    pub fn bitmap_offset(&self) -> usize {
        LINK_SIZE
    }

    /// Size of the per-page header (link plus bitmap)
    pub fn page_header_size(&self) -> usize {
        LINK_SIZE + self.bitmap_size
    }

    /// Byte offset of a slot within a page
    pub fn slot_offset(&self, slot: u32) -> usize {
        self.page_header_size() + slot as usize * self.record_size
    }
}

/// Bytes needed for a bitmap of `bits` bits
pub fn bitmap_bytes(bits: usize) -> usize {
    bits.div_ceil(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_fills_page() {
        for record_size in [1, 3, 4, 7, 8, 13, 64, 100, 500, 1000, 2045, 4091] {
            let layout = PageLayout::new(record_size).unwrap();
            let n = layout.records_per_page();
            assert!(n >= 1);
            assert!(layout.page_header_size() + n * record_size <= PAGE_SIZE);
            // One more record must not fit
            let grown = LINK_SIZE + bitmap_bytes(n + 1) + (n + 1) * record_size;
            assert!(grown > PAGE_SIZE, "record_size {}", record_size);
        }
    }

    #[test]
    fn test_layout_known_values() {
        let layout = PageLayout::new(1).unwrap();
        assert_eq!(layout.records_per_page(), 3637);
        assert_eq!(layout.bitmap_size(), 455);

        let layout = PageLayout::new(4091).unwrap();
        assert_eq!(layout.records_per_page(), 1);
        assert_eq!(layout.bitmap_size(), 1);
        assert_eq!(layout.slot_offset(0), 5);
    }

    #[test]
    fn test_layout_rejects_bad_sizes() {
        assert!(matches!(
            PageLayout::new(0),
            Err(StorageError::InvalidRecordSize(0))
        ));
        assert!(matches!(
            PageLayout::new(PageLayout::MAX_RECORD_SIZE + 1),
            Err(StorageError::RecordTooLarge { .. })
        ));
    }

    #[test]
    fn test_slot_offsets() {
        let layout = PageLayout::new(100).unwrap();
        let base = layout.page_header_size();
        assert_eq!(layout.slot_offset(0), base);
        assert_eq!(layout.slot_offset(3), base + 300);
    }
}
