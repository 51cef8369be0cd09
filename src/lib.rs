//! # Record Manager
//!
//! A fixed-length record manager over disk-based paged files. Records of one
//! size per file are addressed by `(page, slot)` identifiers and can be
//! inserted, read, updated, deleted, and scanned with a single-attribute
//! predicate.
//!
//! ## Architecture
//!
//! The crate is composed of modular, swappable components:
//!
//! - **Page Layer** (`page`): data page format with occupancy bitmap and free-list link
//! - **Storage Layer** (`storage`): disk I/O abstraction, record file header, paged files
//! - **Buffer Pool** (`buffer`): LRU page cache with pinning and dirty tracking
//! - **Record Layer** (`record`): record file lifecycle, record operations and scans
//!
//! ## Usage
//!
//! ```rust,ignore
//! use record_manager::{AttrType, CompOp, Config, FileScan, PagedFileManager, RecordManager};
//! use std::sync::Arc;
//!
//! let pfm = Arc::new(PagedFileManager::new(Config::default()));
//! let rm = RecordManager::new(pfm);
//!
//! rm.create_file("people.rm", 16)?;
//! let mut handle = rm.open("people.rm")?;
//!
//! let rid = handle.insert_rec(&[0u8; 16])?;
//! let record = handle.get_rec(rid)?;
//!
//! let mut scan = FileScan::new();
//! scan.open_scan(&handle, AttrType::Int, 4, 0, CompOp::Eq, Some(&0i32.to_le_bytes()))?;
//! for record in &mut scan {
//!     println!("{}", record?.rid());
//! }
//! scan.close_scan()?;
//!
//! rm.close_file(&mut handle)?;
//! ```

pub mod buffer;
pub mod error;
pub mod page;
pub mod record;
pub mod storage;
pub mod types;

pub use error::{Result, StorageError};
pub use types::{AttrType, CompOp, PageId, Rid, PAGE_SIZE};

// Re-export main public API
pub use buffer::{BufferPool, BufferPoolImpl};
pub use record::{FileScan, FileStats, FlushScope, Record, RecordFileHandle, RecordManager};
pub use storage::{DiskManager, DiskManagerImpl, PagedFile, PagedFileManager};

use serde::{Deserialize, Serialize};

/// Smallest usable pool: the header page stays pinned while a file is open
pub const MIN_BUFFER_POOL_SIZE: usize = 2;

/// Paged file configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Buffer pool size per open file, in pages (default: 1000)
    pub buffer_pool_size: usize,
    /// Whether to sync writes immediately (default: false for performance)
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_pool_size: 1000,
            sync_on_write: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set buffer pool size
    pub fn buffer_pool_size(mut self, size: usize) -> Self {
        self.buffer_pool_size = size;
        self
    }

    /// Enable sync on write for durability
    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.sync_on_write = enabled;
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that files opened with this configuration can hold a data page
    pub fn validate(&self) -> Result<()> {
        if self.buffer_pool_size < MIN_BUFFER_POOL_SIZE {
            return Err(StorageError::InvalidConfig(format!(
                "buffer pool of {} page(s) is below the minimum of {}",
                self.buffer_pool_size, MIN_BUFFER_POOL_SIZE
            )));
        }
        Ok(())
    }
}
