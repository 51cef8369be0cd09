//! Record file handle: record operations on one open record file.
//!
//! The file header is read when the handle is bound and kept in memory; its
//! page stays pinned until the handle is closed, when the header is written
//! back. Every data page access pins the page through a scoped guard, so pins
//! balance on every exit path.
//!
//! Free-space bookkeeping: each data page carries an occupancy bitmap and a
//! link to the next page with a free slot. The header holds the head of that
//! list. A page is on the list iff it has at least one clear bit.

use crate::buffer::{BufferPool, BufferPoolImpl, PageGuardMut};
use crate::error::{Result, StorageError};
use crate::page::{PageLayout, RecordPage, RecordPageMut};
use crate::record::Record;
use crate::storage::{PagedFile, RecordFileHeader};
use crate::types::{PageId, Rid};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Which pages [`RecordFileHandle::force_pages`] writes back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushScope {
    /// Every dirty page of the file, header included
    All,
    /// One page
    Page(PageId),
}

/// Summary of a record file, gathered by walking every data page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub record_size: usize,
    pub records_per_page: usize,
    /// Data pages (the header page is not counted)
    pub data_pages: u32,
    /// Data pages currently on the free list
    pub free_pages: u32,
    /// Live records
    pub records: u64,
}

/// State of a bound handle
pub(crate) struct OpenFile {
    file: PagedFile,
    header: RecordFileHeader,
    layout: PageLayout,
    /// Pin on page 0, held until close
    header_page: PageGuardMut,
    header_dirty: bool,
}

impl OpenFile {
    fn load(file: PagedFile) -> Result<Self> {
        match Self::read_header(&file) {
            Ok((header_page, header, layout)) => Ok(Self {
                file,
                header,
                layout,
                header_page,
                header_dirty: false,
            }),
            Err(e) => {
                let _ = file.close();
                Err(e)
            }
        }
    }

    fn read_header(file: &PagedFile) -> Result<(PageGuardMut, RecordFileHeader, PageLayout)> {
        let header_page = file.pool().fetch_page_mut(PageId::HEADER)?;
        let header = RecordFileHeader::read(&header_page.read())?;
        let layout = header.layout()?;

        let page_count = file.pool().page_count();
        if header.num_pages >= page_count {
            return Err(StorageError::invalid_db(format!(
                "header claims {} data pages but the file has {} pages",
                header.num_pages, page_count
            )));
        }

        Ok((header_page, header, layout))
    }

    pub(crate) fn pool(&self) -> &Arc<BufferPoolImpl> {
        self.file.pool()
    }

    pub(crate) fn layout(&self) -> PageLayout {
        self.layout
    }

    pub(crate) fn header(&self) -> &RecordFileHeader {
        &self.header
    }

    /// Copy the in-memory header into its pinned page
    fn sync_header(&mut self) {
        if self.header_dirty {
            self.header.write(&mut self.header_page.write());
            self.header_dirty = false;
        }
    }

    fn set_first_free(&mut self, page_id: PageId) {
        self.header.first_free_page = page_id;
        self.header_dirty = true;
    }

    fn check_data(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(StorageError::NullData);
        }
        if data.len() != self.layout.record_size() {
            return Err(StorageError::RecordSizeMismatch {
                expected: self.layout.record_size(),
                actual: data.len(),
            });
        }
        Ok(())
    }

    /// Reject RIDs that cannot name a slot, before any page is touched
    fn check_rid(&self, rid: Rid) -> Result<()> {
        if !self.header.is_data_page(rid.page)
            || rid.slot as usize >= self.layout.records_per_page()
        {
            return Err(StorageError::InvalidRid(rid));
        }
        Ok(())
    }

    /// Pin a data page for writing, after checking the slot is live
    fn fetch_live(&self, rid: Rid) -> Result<PageGuardMut> {
        self.check_rid(rid)?;
        let guard = self.pool().fetch_page_mut(rid.page)?;
        if !RecordPage::new(&guard.read(), self.layout).is_occupied(rid.slot) {
            return Err(StorageError::InvalidRid(rid));
        }
        Ok(guard)
    }

    /// Grow the file by one empty data page and make it the free-list head
    fn append_page(&mut self) -> Result<()> {
        let (page_id, guard) = self.pool().new_page()?;
        let expected = self.header.num_pages + 1;
        if page_id.value() != expected {
            return Err(StorageError::corruption(format!(
                "allocated page {} but the next data page should be {}",
                page_id, expected
            )));
        }
        RecordPageMut::new(&mut guard.write(), self.layout).init();
        drop(guard);

        self.header.num_pages = expected;
        self.set_first_free(page_id);
        debug!("allocated data page {}", page_id);
        Ok(())
    }

    fn insert(&mut self, data: &[u8]) -> Result<Rid> {
        self.check_data(data)?;
        if !self.header.first_free_page.is_valid() {
            self.append_page()?;
        }

        let page_id = self.header.first_free_page;
        if !self.header.is_data_page(page_id) {
            return Err(StorageError::corruption(format!(
                "free list head {} is not a data page",
                page_id
            )));
        }

        let guard = self.pool().fetch_page_mut(page_id)?;
        let (slot, unlinked) = {
            let mut page = guard.write();
            let mut view = RecordPageMut::new(&mut page, self.layout);
            let slot = view.allocate_slot().ok_or_else(|| {
                StorageError::corruption(format!("page {} is on the free list but full", page_id))
            })?;
            view.write_record(slot, data);

            let unlinked = if view.view().is_full() {
                let next = view.view().next_free();
                view.set_next_free(PageId::INVALID);
                Some(next)
            } else {
                None
            };
            (slot, unlinked)
        };
        drop(guard);

        trace!("inserted record at ({}, {})", page_id, slot);
        if let Some(next) = unlinked {
            trace!("page {} full, free list head now {}", page_id, next);
            self.set_first_free(next);
        }
        Ok(Rid::new(page_id, slot))
    }

    fn delete(&mut self, rid: Rid) -> Result<()> {
        let guard = self.fetch_live(rid)?;
        let relinked = {
            let mut page = guard.write();
            let mut view = RecordPageMut::new(&mut page, self.layout);
            let was_full = view.view().is_full();
            view.free_slot(rid.slot);
            if was_full {
                view.set_next_free(self.header.first_free_page);
            }
            was_full
        };
        drop(guard);

        trace!("deleted record {}", rid);
        if relinked {
            trace!("page {} has room again, pushed on the free list", rid.page);
            self.set_first_free(rid.page);
        }
        Ok(())
    }

    fn update(&self, record: &Record) -> Result<()> {
        self.check_data(record.data())?;
        let rid = record.rid();
        let guard = self.fetch_live(rid)?;
        RecordPageMut::new(&mut guard.write(), self.layout).write_record(rid.slot, record.data());
        Ok(())
    }

    fn get(&self, rid: Rid) -> Result<Record> {
        self.check_rid(rid)?;
        let guard = self.pool().fetch_page(rid.page)?;
        let page = guard.read();
        let view = RecordPage::new(&page, self.layout);
        if !view.is_occupied(rid.slot) {
            return Err(StorageError::InvalidRid(rid));
        }
        Ok(Record::new(rid, view.record(rid.slot).to_vec()))
    }

    fn stats(&self) -> Result<FileStats> {
        // Walk the free list, bounded by the page count to catch cycles
        let mut on_list = HashSet::new();
        let mut current = self.header.first_free_page;
        while current.is_valid() {
            if !self.header.is_data_page(current) || !on_list.insert(current) {
                return Err(StorageError::corruption(format!(
                    "free list is broken at page {}",
                    current
                )));
            }
            let guard = self.pool().fetch_page(current)?;
            current = RecordPage::new(&guard.read(), self.layout).next_free();
        }

        let mut records = 0u64;
        for n in 1..=self.header.num_pages {
            let page_id = PageId::new(n);
            let guard = self.pool().fetch_page(page_id)?;
            let page = guard.read();
            let view = RecordPage::new(&page, self.layout);
            if view.is_full() == on_list.contains(&page_id) {
                return Err(StorageError::corruption(format!(
                    "page {} free-list membership disagrees with its bitmap",
                    page_id
                )));
            }
            records += view.occupied_count() as u64;
        }

        Ok(FileStats {
            record_size: self.layout.record_size(),
            records_per_page: self.layout.records_per_page(),
            data_pages: self.header.num_pages,
            free_pages: on_list.len() as u32,
            records,
        })
    }

    fn force(&mut self, scope: FlushScope) -> Result<()> {
        match scope {
            FlushScope::All => {
                self.sync_header();
                self.pool().flush_all()
            }
            FlushScope::Page(page_id) => {
                if page_id == PageId::HEADER {
                    self.sync_header();
                }
                self.pool().flush_page(page_id)
            }
        }
    }

    fn close(mut self) -> Result<()> {
        self.sync_header();
        let Self {
            file, header_page, ..
        } = self;
        drop(header_page);
        file.close()
    }
}

/// Handle to an open record file
///
/// A handle starts unbound; [`RecordManager::open_file`](crate::RecordManager::open_file)
/// binds it and [`RecordManager::close_file`](crate::RecordManager::close_file)
/// releases it. Every record operation on an unbound handle fails with
/// [`StorageError::NotOpen`]. Dropping a bound handle closes it and discards
/// any error.
#[derive(Default)]
pub struct RecordFileHandle {
    open: Option<OpenFile>,
}

impl RecordFileHandle {
    /// Create an unbound handle
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Bind the handle to an open paged file holding a record file
    pub(crate) fn attach(&mut self, file: PagedFile) -> Result<()> {
        if self.open.is_some() {
            return Err(StorageError::AlreadyOpen);
        }
        let path = file.path().to_path_buf();
        let open = OpenFile::load(file)?;
        debug!(
            "opened record file {} (record size {}, {} data pages)",
            path.display(),
            open.layout.record_size(),
            open.header.num_pages
        );
        self.open = Some(open);
        Ok(())
    }

    /// Write back the header and close the paged file.
    ///
    /// The handle is unbound afterwards even if writing back fails.
    pub(crate) fn detach(&mut self) -> Result<()> {
        let open = self.open.take().ok_or(StorageError::NotOpen)?;
        debug!("closing record file {}", open.file.path().display());
        open.close()
    }

    pub(crate) fn inner(&self) -> Result<&OpenFile> {
        self.open.as_ref().ok_or(StorageError::NotOpen)
    }

    fn inner_mut(&mut self) -> Result<&mut OpenFile> {
        self.open.as_mut().ok_or(StorageError::NotOpen)
    }

    /// Copy out the record at `rid`
    pub fn get_rec(&self, rid: Rid) -> Result<Record> {
        self.inner()?.get(rid)
    }

    /// Store a record in the lowest free slot of the first page with room,
    /// growing the file by one page when no page has room
    pub fn insert_rec(&mut self, data: &[u8]) -> Result<Rid> {
        self.inner_mut()?.insert(data)
    }

    /// Free the slot at `rid`
    pub fn delete_rec(&mut self, rid: Rid) -> Result<()> {
        self.inner_mut()?.delete(rid)
    }

    /// Overwrite the live record at `record.rid()` with `record.data()`
    pub fn update_rec(&mut self, record: &Record) -> Result<()> {
        self.inner_mut()?.update(record)
    }

    /// Write dirty pages to disk
    pub fn force_pages(&mut self, scope: FlushScope) -> Result<()> {
        self.inner_mut()?.force(scope)
    }

    pub fn record_size(&self) -> Result<usize> {
        Ok(self.inner()?.layout.record_size())
    }

    pub fn records_per_page(&self) -> Result<usize> {
        Ok(self.inner()?.layout.records_per_page())
    }

    /// Number of data pages
    pub fn num_pages(&self) -> Result<u32> {
        Ok(self.inner()?.header.num_pages)
    }

    /// Walk the file, count its records and check the free list against the
    /// page bitmaps
    pub fn stats(&self) -> Result<FileStats> {
        self.inner()?.stats()
    }
}

impl Drop for RecordFileHandle {
    fn drop(&mut self) {
        if self.open.is_some() {
            let _ = self.detach();
        }
    }
}
