//! Error types for the record manager.

use crate::types::{PageId, Rid};
use thiserror::Error;

/// Result type alias for storage and record operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the record manager and the paged file below it
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying file system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record size does not fit in a single page
    #[error("Record too large: {size} bytes (max: {max})")]
    RecordTooLarge { size: usize, max: usize },

    /// Record size is not usable (zero)
    #[error("Invalid record size: {0}")]
    InvalidRecordSize(usize),

    /// Record data does not match the file's record size
    #[error("Record size mismatch: expected {expected} bytes, got {actual}")]
    RecordSizeMismatch { expected: usize, actual: usize },

    /// Insert or update called without data
    #[error("Record data is empty")]
    NullData,

    /// Handle or scan is already bound to an open file
    #[error("Already open")]
    AlreadyOpen,

    /// Handle or scan is not open
    #[error("Not open")]
    NotOpen,

    /// RID does not address a live record
    #[error("Invalid RID {0}")]
    InvalidRid(Rid),

    /// Scan predicate does not fit the record layout
    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Attempt to create a file that already exists
    #[error("File already exists: {0}")]
    FileExists(String),

    /// Attempt to open or destroy a file that does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Attempt to destroy a file that is still open
    #[error("File is open: {0}")]
    FileOpen(String),

    /// Attempt to close a paged file while pages are pinned
    #[error("{0} page(s) still pinned")]
    PagesPinned(usize),

    /// Requested page was not found
    #[error("Page {0} not found")]
    PageNotFound(PageId),

    /// Buffer pool has no available frames
    #[error("Buffer pool exhausted: no available frames")]
    BufferPoolExhausted,

    /// Data corruption detected (e.g., checksum mismatch)
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Record file is corrupted or has invalid format
    #[error("Invalid record file: {0}")]
    InvalidDatabaseFile(String),

    /// Configuration could not be parsed or is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl StorageError {
    /// Create a corruption error with a message
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Create an invalid attribute error
    pub fn invalid_attribute(msg: impl Into<String>) -> Self {
        Self::InvalidAttribute(msg.into())
    }

    /// Create an invalid record file error
    pub fn invalid_db(msg: impl Into<String>) -> Self {
        Self::InvalidDatabaseFile(msg.into())
    }
}
