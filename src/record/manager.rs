//! Record manager: record file lifecycle.

use crate::buffer::BufferPool;
use crate::error::{Result, StorageError};
use crate::page::PageLayout;
use crate::record::RecordFileHandle;
use crate::storage::{PagedFileManager, RecordFileHeader};
use crate::types::PageId;
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// Creates, destroys, opens and closes record files
///
/// Holds only a reference to the paged file manager; there is no other
/// shared state.
pub struct RecordManager {
    pfm: Arc<PagedFileManager>,
}

impl RecordManager {
    pub fn new(pfm: Arc<PagedFileManager>) -> Self {
        Self { pfm }
    }

    /// Create a record file for `record_size`-byte records
    ///
    /// The new file holds only its header page. Fails with `RecordTooLarge`
    /// or `InvalidRecordSize` before touching the disk.
    pub fn create_file(&self, path: impl AsRef<Path>, record_size: usize) -> Result<()> {
        let path = path.as_ref();
        let layout = PageLayout::new(record_size)?;

        self.pfm.create_file(path)?;
        if let Err(e) = self.write_header(path, &layout) {
            let _ = self.pfm.destroy_file(path);
            return Err(e);
        }

        debug!(
            "created record file {} (record size {}, {} records per page)",
            path.display(),
            layout.record_size(),
            layout.records_per_page()
        );
        Ok(())
    }

    fn write_header(&self, path: &Path, layout: &PageLayout) -> Result<()> {
        let file = self.pfm.open_file(path)?;
        {
            let (page_id, guard) = file.pool().new_page()?;
            if page_id != PageId::HEADER {
                return Err(StorageError::corruption(format!(
                    "new file allocated page {} for its header",
                    page_id
                )));
            }
            RecordFileHeader::new(layout).write(&mut guard.write());
        }
        self.pfm.close_file(file)
    }

    /// Delete a record file. Fails with `FileOpen` while it is open.
    pub fn destroy_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.pfm.destroy_file(path.as_ref())
    }

    /// Open a record file into `handle`
    ///
    /// Fails with `AlreadyOpen` if `handle` is already bound.
    pub fn open_file(&self, path: impl AsRef<Path>, handle: &mut RecordFileHandle) -> Result<()> {
        if handle.is_open() {
            return Err(StorageError::AlreadyOpen);
        }
        let file = self.pfm.open_file(path.as_ref())?;
        handle.attach(file)
    }

    /// Open a record file into a fresh handle
    pub fn open(&self, path: impl AsRef<Path>) -> Result<RecordFileHandle> {
        let mut handle = RecordFileHandle::new();
        self.open_file(path, &mut handle)?;
        Ok(handle)
    }

    /// Write back the header and all dirty pages, then unbind `handle`
    pub fn close_file(&self, handle: &mut RecordFileHandle) -> Result<()> {
        handle.detach()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MAGIC;
    use crate::types::PAGE_SIZE;
    use crate::Config;
    use tempfile::tempdir;

    fn manager() -> RecordManager {
        let _ = env_logger::builder().is_test(true).try_init();
        RecordManager::new(Arc::new(PagedFileManager::default()))
    }

    #[test]
    fn test_create_writes_header_only() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.rm");
        let rm = manager();

        rm.create_file(&path, 40)?;
        let bytes = std::fs::read(&path)?;
        assert_eq!(bytes.len(), PAGE_SIZE);
        assert_eq!(&bytes[0..16], MAGIC);

        let header = RecordFileHeader::read(&bytes)?;
        assert_eq!(header.record_size, 40);
        assert_eq!(header.num_pages, 0);
        assert_eq!(header.first_free_page, PageId::INVALID);

        assert!(matches!(
            rm.create_file(&path, 40),
            Err(StorageError::FileExists(_))
        ));
        Ok(())
    }

    #[test]
    fn test_create_rejects_bad_sizes() {
        let dir = tempdir().unwrap();
        let rm = manager();

        let big = dir.path().join("big.rm");
        assert!(matches!(
            rm.create_file(&big, PAGE_SIZE),
            Err(StorageError::RecordTooLarge { .. })
        ));
        assert!(!big.exists());

        let zero = dir.path().join("zero.rm");
        assert!(matches!(
            rm.create_file(&zero, 0),
            Err(StorageError::InvalidRecordSize(0))
        ));
        assert!(!zero.exists());
    }

    #[test]
    fn test_single_frame_pool_is_refused() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.rm");
        let tiny = RecordManager::new(Arc::new(PagedFileManager::new(
            Config::new().buffer_pool_size(1),
        )));

        assert!(matches!(
            tiny.create_file(&path, 16),
            Err(StorageError::InvalidConfig(_))
        ));
        assert!(!path.exists());

        manager().create_file(&path, 16)?;
        let mut handle = RecordFileHandle::new();
        assert!(matches!(
            tiny.open_file(&path, &mut handle),
            Err(StorageError::InvalidConfig(_))
        ));
        assert!(!handle.is_open());
        Ok(())
    }

    #[test]
    fn test_largest_record_size() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.rm");
        let rm = manager();

        rm.create_file(&path, PageLayout::MAX_RECORD_SIZE)?;
        let mut fh = rm.open(&path)?;
        assert_eq!(fh.records_per_page()?, 1);
        let data = vec![0xAB; PageLayout::MAX_RECORD_SIZE];
        let a = fh.insert_rec(&data)?;
        let b = fh.insert_rec(&data)?;
        assert_ne!(a.page, b.page);
        rm.close_file(&mut fh)?;
        Ok(())
    }

    #[test]
    fn test_open_twice_into_same_handle() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.rm");
        let rm = manager();
        rm.create_file(&path, 8)?;

        let mut fh = RecordFileHandle::new();
        rm.open_file(&path, &mut fh)?;
        assert!(matches!(
            rm.open_file(&path, &mut fh),
            Err(StorageError::AlreadyOpen)
        ));
        rm.close_file(&mut fh)?;
        assert!(matches!(rm.close_file(&mut fh), Err(StorageError::NotOpen)));

        // A closed handle can be reused
        rm.open_file(&path, &mut fh)?;
        rm.close_file(&mut fh)?;
        Ok(())
    }

    #[test]
    fn test_destroy_lifecycle() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.rm");
        let rm = manager();
        rm.create_file(&path, 8)?;

        let mut fh = rm.open(&path)?;
        assert!(matches!(
            rm.destroy_file(&path),
            Err(StorageError::FileOpen(_))
        ));
        rm.close_file(&mut fh)?;

        rm.destroy_file(&path)?;
        assert!(matches!(
            rm.destroy_file(&path),
            Err(StorageError::FileNotFound(_))
        ));
        assert!(matches!(rm.open(&path), Err(StorageError::FileNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_open_rejects_foreign_file() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.rm");
        std::fs::write(&path, vec![7u8; PAGE_SIZE])?;
        let rm = manager();

        let mut fh = RecordFileHandle::new();
        assert!(matches!(
            rm.open_file(&path, &mut fh),
            Err(StorageError::InvalidDatabaseFile(_))
        ));
        assert!(!fh.is_open());

        // The failed open released the file
        rm.destroy_file(&path)?;
        Ok(())
    }

    #[test]
    fn test_open_rejects_truncated_file() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.rm");
        let rm = manager();
        rm.create_file(&path, 100)?;
        {
            let mut fh = rm.open(&path)?;
            fh.insert_rec(&[1u8; 100])?;
            rm.close_file(&mut fh)?;
        }

        // Drop the only data page; the header still counts it
        let bytes = std::fs::read(&path)?;
        std::fs::write(&path, &bytes[..PAGE_SIZE])?;
        assert!(matches!(
            rm.open(&path),
            Err(StorageError::InvalidDatabaseFile(_))
        ));
        Ok(())
    }

    #[test]
    fn test_multiple_handles_on_one_file() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.rm");
        let rm = manager();
        rm.create_file(&path, 4)?;

        let mut writer = rm.open(&path)?;
        let reader = rm.open(&path)?;
        let rid = writer.insert_rec(b"abcd")?;
        rm.close_file(&mut writer)?;

        // The reader opened before the insert and still sees the old header
        assert_eq!(reader.num_pages()?, 0);
        drop(reader);

        let reader = rm.open(&path)?;
        assert_eq!(reader.get_rec(rid)?.data(), b"abcd");
        Ok(())
    }
}
