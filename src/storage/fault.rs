//! Disk manager wrapper that fails on demand.

use crate::error::Result;
use crate::page::PageBuf;
use crate::storage::DiskManager;
use crate::types::PageId;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Delegates to an inner disk manager until told to fail
pub(crate) struct FailingDisk<D> {
    inner: D,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl<D: DiskManager> FailingDisk<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected failure").into());
        }
        Ok(())
    }
}

impl<D: DiskManager> DiskManager for FailingDisk<D> {
    fn read_page(&self, page_id: PageId) -> Result<PageBuf> {
        Self::check(&self.fail_reads)?;
        self.inner.read_page(page_id)
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        Self::check(&self.fail_writes)?;
        self.inner.write_page(page_id, data)
    }

    fn allocate_page(&self) -> Result<PageId> {
        Self::check(&self.fail_writes)?;
        self.inner.allocate_page()
    }

    fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    fn sync(&self) -> Result<()> {
        Self::check(&self.fail_writes)?;
        self.inner.sync()
    }
}
