//! Paged file manager.
//!
//! Creates, destroys, opens and closes paged files. Each open instance owns
//! its own buffer pool. The manager remembers how many instances of each file
//! are open so that a file cannot be destroyed underneath a reader.

use crate::buffer::{BufferPool, BufferPoolImpl};
use crate::error::{Result, StorageError};
use crate::storage::{DiskManager, DiskManagerImpl};
use crate::Config;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type OpenFiles = Arc<Mutex<HashMap<PathBuf, usize>>>;

/// Entry point to the paged-storage layer
pub struct PagedFileManager {
    config: Config,
    open_files: OpenFiles,
}

impl PagedFileManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            open_files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create an empty paged file. Fails with `FileExists` if it exists.
    pub fn create_file(&self, path: &Path) -> Result<()> {
        DiskManagerImpl::create(path, self.config.sync_on_write)?;
        debug!("created paged file {}", path.display());
        Ok(())
    }

    /// Delete a paged file. Fails with `FileOpen` while any instance is open.
    pub fn destroy_file(&self, path: &Path) -> Result<()> {
        let key = registry_key(path)?;
        let open_files = self.open_files.lock();
        if open_files.get(&key).copied().unwrap_or(0) > 0 {
            return Err(StorageError::FileOpen(path.display().to_string()));
        }
        fs::remove_file(&key)?;
        debug!("destroyed paged file {}", path.display());
        Ok(())
    }

    /// Open a new instance of an existing paged file
    pub fn open_file(&self, path: &Path) -> Result<PagedFile> {
        let disk = DiskManagerImpl::open(path, self.config.sync_on_write)?;
        self.open_with_disk(path, Arc::new(disk))
    }

    /// Open a file through a caller-supplied disk manager
    pub(crate) fn open_with_disk(
        &self,
        path: &Path,
        disk_manager: Arc<dyn DiskManager>,
    ) -> Result<PagedFile> {
        self.config.validate()?;
        let key = registry_key(path)?;
        let pool = Arc::new(BufferPoolImpl::new(
            disk_manager,
            self.config.buffer_pool_size,
        ));

        *self.open_files.lock().entry(key.clone()).or_insert(0) += 1;
        debug!(
            "opened paged file {} ({} pages)",
            path.display(),
            pool.page_count()
        );

        Ok(PagedFile {
            key,
            pool,
            open_files: Arc::clone(&self.open_files),
            closed: false,
        })
    }

    /// Close an open instance, writing back its dirty pages
    pub fn close_file(&self, file: PagedFile) -> Result<()> {
        file.close()
    }

    /// Number of open instances of a file
    pub fn open_count(&self, path: &Path) -> usize {
        match registry_key(path) {
            Ok(key) => self.open_files.lock().get(&key).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }
}

impl Default for PagedFileManager {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Canonical path of an existing file
fn registry_key(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StorageError::FileNotFound(path.display().to_string()),
        _ => StorageError::Io(e),
    })
}

/// One open instance of a paged file
///
/// Dropping the instance releases it; dirty pages are only guaranteed to
/// reach the disk through [`PagedFile::close`].
pub struct PagedFile {
    key: PathBuf,
    pool: Arc<BufferPoolImpl>,
    open_files: OpenFiles,
    closed: bool,
}

impl PagedFile {
    /// Canonical path of the file
    pub fn path(&self) -> &Path {
        &self.key
    }

    /// Buffer pool serving this instance
    pub fn pool(&self) -> &Arc<BufferPoolImpl> {
        &self.pool
    }

    /// Close the instance. The instance is released even if this fails.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;

        let pinned = self.pool.pinned_count();
        if pinned > 0 {
            return Err(StorageError::PagesPinned(pinned));
        }
        self.pool.flush_all()?;
        debug!("closed paged file {}", self.key.display());
        Ok(())
    }
}

impl Drop for PagedFile {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "paged file {} dropped without close; unflushed pages are lost",
                self.key.display()
            );
        }

        let mut open_files = self.open_files.lock();
        if let Some(count) = open_files.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                open_files.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageId;
    use tempfile::tempdir;

    #[test]
    fn test_create_open_close() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.pf");
        let pfm = PagedFileManager::default();

        pfm.create_file(&path)?;
        assert!(matches!(
            pfm.create_file(&path),
            Err(StorageError::FileExists(_))
        ));

        let file = pfm.open_file(&path)?;
        {
            let (page_id, guard) = file.pool().new_page()?;
            assert_eq!(page_id, PageId::new(0));
            guard.write()[0..3].copy_from_slice(b"abc");
        }
        pfm.close_file(file)?;

        let file = pfm.open_file(&path)?;
        assert_eq!(file.pool().page_count(), 1);
        assert_eq!(&file.pool().fetch_page(PageId::new(0))?.read()[0..3], b"abc");
        file.close()?;

        Ok(())
    }

    #[test]
    fn test_destroy_refused_while_open() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.pf");
        let pfm = PagedFileManager::default();
        pfm.create_file(&path)?;

        let first = pfm.open_file(&path)?;
        let second = pfm.open_file(&path)?;
        assert_eq!(pfm.open_count(&path), 2);

        first.close()?;
        assert!(matches!(
            pfm.destroy_file(&path),
            Err(StorageError::FileOpen(_))
        ));

        // A dropped instance is released too
        drop(second);
        assert_eq!(pfm.open_count(&path), 0);

        pfm.destroy_file(&path)?;
        assert!(!path.exists());
        assert!(matches!(
            pfm.destroy_file(&path),
            Err(StorageError::FileNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let pfm = PagedFileManager::default();
        assert!(matches!(
            pfm.open_file(&dir.path().join("nope.pf")),
            Err(StorageError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_open_needs_two_frames() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.pf");
        let pfm = PagedFileManager::new(Config::new().buffer_pool_size(1));
        pfm.create_file(&path)?;

        assert!(matches!(
            pfm.open_file(&path),
            Err(StorageError::InvalidConfig(_))
        ));
        assert_eq!(pfm.open_count(&path), 0);

        Ok(())
    }

    #[test]
    fn test_close_with_pinned_page() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.pf");
        let pfm = PagedFileManager::default();
        pfm.create_file(&path)?;

        let file = pfm.open_file(&path)?;
        let (_, guard) = file.pool().new_page()?;
        assert!(matches!(file.close(), Err(StorageError::PagesPinned(1))));
        drop(guard);

        // The failed close still released the instance
        assert_eq!(pfm.open_count(&path), 0);

        Ok(())
    }

    #[test]
    fn test_managers_do_not_share_registry() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.pf");
        let a = PagedFileManager::default();
        let b = PagedFileManager::default();
        a.create_file(&path)?;

        let file = a.open_file(&path)?;
        assert_eq!(a.open_count(&path), 1);
        assert_eq!(b.open_count(&path), 0);
        file.close()?;

        Ok(())
    }
}
