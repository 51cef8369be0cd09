//! Buffer pool implementation.
//!
//! The buffer pool manages a bounded number of in-memory page frames for one
//! open paged file, caching pages read from disk and writing dirty pages back.

use crate::buffer::lru::LruList;
use crate::error::{Result, StorageError};
use crate::page::PageBuf;
use crate::storage::DiskManager;
use crate::types::PageId;
use log::trace;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Trait for buffer pool operations
///
/// This is the page-level contract the record layer is written against.
pub trait BufferPool: Send + Sync {
    /// Pin a page for reading
    fn fetch_page(&self, page_id: PageId) -> Result<PageGuard>;

    /// Pin a page for writing
    fn fetch_page_mut(&self, page_id: PageId) -> Result<PageGuardMut>;

    /// Extend the file by one zeroed page and pin it
    fn new_page(&self) -> Result<(PageId, PageGuardMut)>;

    /// Write a specific page to disk if it is dirty
    fn flush_page(&self, page_id: PageId) -> Result<()>;

    /// Write all dirty pages to disk and sync the file
    fn flush_all(&self) -> Result<()>;

    /// First page of the file, if any
    fn first_page(&self) -> Option<PageId>;

    /// Page following `current` in page-number order, if any
    fn next_page(&self, current: PageId) -> Option<PageId>;

    /// Get the total number of pages in the file
    fn page_count(&self) -> u32;

    /// Number of resident pages with at least one pin
    fn pinned_count(&self) -> usize;
}

/// A frame in the buffer pool
struct BufferFrame {
    /// The page data
    page: RwLock<PageBuf>,
    /// Whether the page has been modified since it was last written
    dirty: AtomicBool,
    /// Pin count (number of live guards)
    pin_count: AtomicU32,
}

impl BufferFrame {
    /// A frame with one pin already taken
    fn pinned(page: PageBuf, dirty: bool) -> Self {
        Self {
            page: RwLock::new(page),
            dirty: AtomicBool::new(dirty),
            pin_count: AtomicU32::new(1),
        }
    }

    fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::AcqRel);
    }

    fn unpin(&self) {
        let _ = self
            .pin_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    fn is_pinned(&self) -> bool {
        self.pin_count.load(Ordering::Acquire) > 0
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

type FrameTable = HashMap<PageId, Arc<BufferFrame>>;

/// Buffer pool implementation
pub struct BufferPoolImpl {
    /// The disk manager for I/O
    disk_manager: Arc<dyn DiskManager>,
    /// Resident frames indexed by page ID
    frames: RwLock<FrameTable>,
    /// Access order for eviction
    lru: Mutex<LruList>,
    /// Maximum number of frames
    capacity: usize,
}

impl BufferPoolImpl {
    /// Create a new buffer pool
    pub fn new(disk_manager: Arc<dyn DiskManager>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            disk_manager,
            frames: RwLock::new(HashMap::with_capacity(capacity)),
            lru: Mutex::new(LruList::new()),
            capacity,
        }
    }

    /// Pin the frame for a page, loading it from disk if necessary
    fn pin_frame(&self, page_id: PageId) -> Result<Arc<BufferFrame>> {
        if let Some(frame) = self.pin_resident(&self.frames.read(), page_id) {
            return Ok(frame);
        }

        let mut frames = self.frames.write();
        // Another thread may have loaded it between the two locks
        if let Some(frame) = self.pin_resident(&frames, page_id) {
            return Ok(frame);
        }
        self.make_room(&mut frames)?;
        let page = self.disk_manager.read_page(page_id)?;
        Ok(self.install(&mut frames, page_id, page, false))
    }

    fn pin_resident(&self, frames: &FrameTable, page_id: PageId) -> Option<Arc<BufferFrame>> {
        let frame = frames.get(&page_id)?;
        frame.pin();
        self.lru.lock().touch(page_id);
        Some(Arc::clone(frame))
    }

    /// Insert a freshly pinned frame
    fn install(
        &self,
        frames: &mut FrameTable,
        page_id: PageId,
        page: PageBuf,
        dirty: bool,
    ) -> Arc<BufferFrame> {
        let frame = Arc::new(BufferFrame::pinned(page, dirty));
        frames.insert(page_id, Arc::clone(&frame));
        self.lru.lock().touch(page_id);
        frame
    }

    /// Evict one unpinned page if the pool is full
    fn make_room(&self, frames: &mut FrameTable) -> Result<()> {
        if frames.len() < self.capacity {
            return Ok(());
        }

        let mut lru = self.lru.lock();
        let victim = lru
            .iter()
            .find(|id| frames.get(id).map_or(true, |frame| !frame.is_pinned()))
            .ok_or(StorageError::BufferPoolExhausted)?;

        if let Some(frame) = frames.get(&victim) {
            self.write_back(victim, frame)?;
        }
        trace!("evicting page {}", victim);
        frames.remove(&victim);
        lru.remove(victim);
        Ok(())
    }

    /// Write a frame to disk if it is dirty
    fn write_back(&self, page_id: PageId, frame: &BufferFrame) -> Result<()> {
        if frame.dirty.load(Ordering::Acquire) {
            let page = frame.page.read();
            self.disk_manager.write_page(page_id, page.as_bytes())?;
            frame.dirty.store(false, Ordering::Release);
        }
        Ok(())
    }
}

impl BufferPool for BufferPoolImpl {
    fn fetch_page(&self, page_id: PageId) -> Result<PageGuard> {
        Ok(PageGuard {
            frame: self.pin_frame(page_id)?,
        })
    }

    fn fetch_page_mut(&self, page_id: PageId) -> Result<PageGuardMut> {
        Ok(PageGuardMut {
            frame: self.pin_frame(page_id)?,
        })
    }

    fn new_page(&self) -> Result<(PageId, PageGuardMut)> {
        // Make room before growing the file so a full pool cannot leave an
        // allocated page that nobody saw
        let mut frames = self.frames.write();
        self.make_room(&mut frames)?;
        let page_id = self.disk_manager.allocate_page()?;
        let frame = self.install(&mut frames, page_id, PageBuf::new(), true);
        Ok((page_id, PageGuardMut { frame }))
    }

    fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frames = self.frames.read();
        if let Some(frame) = frames.get(&page_id) {
            self.write_back(page_id, frame)?;
        }
        Ok(())
    }

    fn flush_all(&self) -> Result<()> {
        let frames = self.frames.read();
        let mut page_ids: Vec<PageId> = frames.keys().copied().collect();
        page_ids.sort();
        for page_id in page_ids {
            self.write_back(page_id, &frames[&page_id])?;
        }
        self.disk_manager.sync()?;
        Ok(())
    }

    fn first_page(&self) -> Option<PageId> {
        (self.page_count() > 0).then_some(PageId::HEADER)
    }

    fn next_page(&self, current: PageId) -> Option<PageId> {
        let next = current.next();
        (next.value() < self.page_count()).then_some(next)
    }

    fn page_count(&self) -> u32 {
        self.disk_manager.page_count()
    }

    fn pinned_count(&self) -> usize {
        self.frames
            .read()
            .values()
            .filter(|frame| frame.is_pinned())
            .count()
    }
}

/// RAII pin for read access to a page
pub struct PageGuard {
    frame: Arc<BufferFrame>,
}

impl PageGuard {
    /// Get a read lock on the page
    pub fn read(&self) -> PageRef<'_> {
        PageRef {
            guard: self.frame.page.read(),
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.frame.unpin();
    }
}

/// Reference to a page (through a read lock)
pub struct PageRef<'a> {
    guard: RwLockReadGuard<'a, PageBuf>,
}

impl<'a> std::ops::Deref for PageRef<'a> {
    type Target = PageBuf;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// RAII pin for write access to a page
pub struct PageGuardMut {
    frame: Arc<BufferFrame>,
}

impl PageGuardMut {
    /// Get a write lock on the page, marking it dirty
    pub fn write(&self) -> PageRefMut<'_> {
        self.frame.mark_dirty();
        PageRefMut {
            guard: self.frame.page.write(),
        }
    }

    /// Get a read lock on the page
    pub fn read(&self) -> PageRef<'_> {
        PageRef {
            guard: self.frame.page.read(),
        }
    }
}

impl Drop for PageGuardMut {
    fn drop(&mut self) {
        self.frame.unpin();
    }
}

/// Mutable reference to a page (through a write lock)
pub struct PageRefMut<'a> {
    guard: RwLockWriteGuard<'a, PageBuf>,
}

impl<'a> std::ops::Deref for PageRefMut<'a> {
    type Target = PageBuf;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<'a> std::ops::DerefMut for PageRefMut<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
