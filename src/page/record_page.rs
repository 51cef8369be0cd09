//! Views of a pinned data page under a record layout.
//!
//! These views never own page memory; they borrow the bytes of a pinned
//! buffer frame for the duration of one operation.

use crate::page::{Bitmap, BitmapMut, DataPageHeader, PageLayout};
use crate::types::PageId;

/// Read-only view of a data page
pub struct RecordPage<'a> {
    data: &'a [u8],
    layout: PageLayout,
}

impl<'a> RecordPage<'a> {
    pub fn new(data: &'a [u8], layout: PageLayout) -> Self {
        Self { data, layout }
    }

    pub fn header(&self) -> DataPageHeader {
        DataPageHeader::read(self.data)
    }

    /// Next page on the free list
    pub fn next_free(&self) -> PageId {
        self.header().next_free
    }

    pub fn bitmap(&self) -> Bitmap<'a> {
        let start = self.layout.bitmap_offset();
        Bitmap::new(&self.data[start..start + self.layout.bitmap_size()])
    }

    /// Check whether `slot` is in range and holds a live record
    pub fn is_occupied(&self, slot: u32) -> bool {
        (slot as usize) < self.layout.records_per_page() && self.bitmap().is_set(slot as usize)
    }

    /// Bytes of the record in `slot`
    pub fn record(&self, slot: u32) -> &'a [u8] {
        let start = self.layout.slot_offset(slot);
        &self.data[start..start + self.layout.record_size()]
    }

    /// Whether every slot is occupied
    pub fn is_full(&self) -> bool {
        self.bitmap()
            .first_clear(self.layout.records_per_page())
            .is_none()
    }

    pub fn occupied_count(&self) -> usize {
        self.bitmap().count_set()
    }

    /// First occupied slot at or after `from`
    pub fn next_occupied(&self, from: u32) -> Option<u32> {
        self.bitmap()
            .next_set(from as usize, self.layout.records_per_page())
            .map(|slot| slot as u32)
    }
}

/// Mutable view of a data page
pub struct RecordPageMut<'a> {
    data: &'a mut [u8],
    layout: PageLayout,
}

impl<'a> RecordPageMut<'a> {
    pub fn new(data: &'a mut [u8], layout: PageLayout) -> Self {
        Self { data, layout }
    }

    pub fn view(&self) -> RecordPage<'_> {
        RecordPage::new(&*self.data, self.layout)
    }

    /// Format the page as empty and unlinked
    pub fn init(&mut self) {
        DataPageHeader::new().write(self.data);
        self.bitmap_mut().reset();
    }

    pub fn set_next_free(&mut self, next_free: PageId) {
        DataPageHeader { next_free }.write(self.data);
    }

    fn bitmap_mut(&mut self) -> BitmapMut<'_> {
        let start = self.layout.bitmap_offset();
        let end = start + self.layout.bitmap_size();
        BitmapMut::new(&mut self.data[start..end])
    }

    /// Claim the lowest free slot, or `None` if the page is full
    pub fn allocate_slot(&mut self) -> Option<u32> {
        let slot = self
            .view()
            .bitmap()
            .first_clear(self.layout.records_per_page())?;
        self.bitmap_mut().set(slot);
        Some(slot as u32)
    }

    /// Release `slot` and zero its bytes
    pub fn free_slot(&mut self, slot: u32) {
        self.bitmap_mut().clear(slot as usize);
        let start = self.layout.slot_offset(slot);
        self.data[start..start + self.layout.record_size()].fill(0);
    }

    /// Overwrite the bytes of `slot`
    pub fn write_record(&mut self, slot: u32, record: &[u8]) {
        let start = self.layout.slot_offset(slot);
        self.data[start..start + self.layout.record_size()].copy_from_slice(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageBuf;

    fn fresh_page(layout: PageLayout) -> PageBuf {
        let mut buf = PageBuf::new();
        RecordPageMut::new(&mut buf, layout).init();
        buf
    }

    #[test]
    fn test_init_is_empty_and_unlinked() {
        let layout = PageLayout::new(16).unwrap();
        let buf = fresh_page(layout);
        let page = RecordPage::new(&buf, layout);
        assert_eq!(page.next_free(), PageId::INVALID);
        assert_eq!(page.occupied_count(), 0);
        assert!(!page.is_full());
        assert_eq!(page.next_occupied(0), None);
    }

    #[test]
    fn test_allocate_fills_lowest_first() {
        let layout = PageLayout::new(16).unwrap();
        let mut buf = fresh_page(layout);
        let mut page = RecordPageMut::new(&mut buf, layout);

        assert_eq!(page.allocate_slot(), Some(0));
        assert_eq!(page.allocate_slot(), Some(1));
        assert_eq!(page.allocate_slot(), Some(2));
        page.free_slot(1);
        assert_eq!(page.allocate_slot(), Some(1));
        assert_eq!(page.allocate_slot(), Some(3));
    }

    #[test]
    fn test_fill_page_until_full() {
        let layout = PageLayout::new(500).unwrap();
        let mut buf = fresh_page(layout);
        let mut page = RecordPageMut::new(&mut buf, layout);

        for expected in 0..layout.records_per_page() as u32 {
            assert_eq!(page.allocate_slot(), Some(expected));
        }
        assert!(page.view().is_full());
        assert_eq!(page.allocate_slot(), None);
    }

    #[test]
    fn test_write_and_free_record() {
        let layout = PageLayout::new(4).unwrap();
        let mut buf = fresh_page(layout);
        {
            let mut page = RecordPageMut::new(&mut buf, layout);
            let slot = page.allocate_slot().unwrap();
            page.write_record(slot, b"abcd");
            page.set_next_free(PageId::new(9));
        }

        let page = RecordPage::new(&buf, layout);
        assert!(page.is_occupied(0));
        assert!(!page.is_occupied(1));
        assert!(!page.is_occupied(layout.records_per_page() as u32));
        assert_eq!(page.record(0), b"abcd");
        assert_eq!(page.next_free(), PageId::new(9));

        let mut page = RecordPageMut::new(&mut buf, layout);
        page.free_slot(0);
        assert!(!page.view().is_occupied(0));
        assert_eq!(page.view().record(0), &[0, 0, 0, 0]);
    }
}
