//! Page-granular file I/O.
//!
//! A paged file is a flat array of `PAGE_SIZE` pages: page `n` starts at byte
//! `n * PAGE_SIZE` and there is no framing of its own. Whatever metadata a
//! file needs (the record file header, for one) lives in its pages.

use crate::error::{Result, StorageError};
use crate::page::PageBuf;
use crate::types::{PageId, PAGE_SIZE};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Reads and writes whole pages of one file
///
/// The buffer pool talks to the disk only through this trait, so tests can
/// slot in a wrapper that fails on demand.
pub trait DiskManager: Send + Sync {
    /// Read page `page_id`; fails with `PageNotFound` past the end
    fn read_page(&self, page_id: PageId) -> Result<PageBuf>;

    /// Overwrite page `page_id` with exactly `PAGE_SIZE` bytes
    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()>;

    /// Append one zeroed page and return its number
    fn allocate_page(&self) -> Result<PageId>;

    /// Pages currently in the file
    fn page_count(&self) -> u32;

    /// Flush file contents and metadata to stable storage
    fn sync(&self) -> Result<()>;
}

/// [`DiskManager`] over a regular file
pub struct DiskManagerImpl {
    file: RwLock<File>,
    /// Guards growth; read before every access for the bounds check
    page_count: RwLock<u32>,
    /// `fdatasync` after every page write
    sync_on_write: bool,
}

impl DiskManagerImpl {
    /// Create an empty file. Fails with `FileExists` if the path is taken.
    pub fn create(path: &Path, sync_on_write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::FileExists(path.display().to_string()),
                _ => StorageError::Io(e),
            })?;

        Ok(Self::from_file(file, 0, sync_on_write))
    }

    /// Open an existing file. Its length must be a whole number of pages.
    pub fn open(path: &Path, sync_on_write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StorageError::FileNotFound(path.display().to_string()),
                _ => StorageError::Io(e),
            })?;

        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::invalid_db(format!(
                "{} is {} bytes, not a whole number of {}-byte pages",
                path.display(),
                len,
                PAGE_SIZE
            )));
        }
        let pages = u32::try_from(len / PAGE_SIZE as u64)
            .map_err(|_| StorageError::invalid_db(format!("{} has too many pages", path.display())))?;

        Ok(Self::from_file(file, pages, sync_on_write))
    }

    fn from_file(file: File, pages: u32, sync_on_write: bool) -> Self {
        Self {
            file: RwLock::new(file),
            page_count: RwLock::new(pages),
            sync_on_write,
        }
    }

    /// Lock the file positioned at the start of an existing page
    fn seek_page(&self, page_id: PageId) -> Result<RwLockWriteGuard<'_, File>> {
        if page_id.value() >= self.page_count() {
            return Err(StorageError::PageNotFound(page_id));
        }
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        Ok(file)
    }
}

impl DiskManager for DiskManagerImpl {
    fn read_page(&self, page_id: PageId) -> Result<PageBuf> {
        let mut buf = PageBuf::new();
        self.seek_page(page_id)?.read_exact(buf.as_bytes_mut())?;
        Ok(buf)
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() != PAGE_SIZE {
            return Err(StorageError::corruption(format!(
                "short page write to {}: {} of {} bytes",
                page_id,
                data.len(),
                PAGE_SIZE
            )));
        }

        let mut file = self.seek_page(page_id)?;
        file.write_all(data)?;
        if self.sync_on_write {
            file.sync_data()?;
        }
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId> {
        // Held across the write so concurrent callers get distinct pages
        let mut count = self.page_count.write();
        let page_id = PageId::new(*count);

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        file.write_all(PageBuf::new().as_bytes())?;

        *count += 1;
        Ok(page_id)
    }

    fn page_count(&self) -> u32 {
        *self.page_count.read()
    }

    fn sync(&self) -> Result<()> {
        self.file.write().sync_all()?;
        Ok(())
    }
}
