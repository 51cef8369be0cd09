//! Storage layer: disk I/O and paged files.
//!
//! This module provides abstractions for reading and writing pages to disk,
//! the record file header format, and the manager that opens, closes and
//! destroys paged files.

mod disk_manager;
#[cfg(test)]
pub(crate) mod fault;
mod file_header;
mod file_manager;

pub use disk_manager::{DiskManager, DiskManagerImpl};
pub use file_header::{RecordFileHeader, FILE_HEADER_SIZE, MAGIC};
pub use file_manager::{PagedFile, PagedFileManager};
