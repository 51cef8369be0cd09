//! Record layer: fixed-length records on top of paged files.
//!
//! A [`RecordManager`] creates and opens record files. An open
//! [`RecordFileHandle`] inserts, reads, updates and deletes records addressed
//! by [`Rid`](crate::types::Rid), and a [`FileScan`] walks the live records of
//! a handle in page-then-slot order, filtered by one attribute predicate.

mod file_handle;
mod manager;
mod record;
mod scan;

pub use file_handle::{FileStats, FlushScope, RecordFileHandle};
pub use manager::RecordManager;
pub use record::Record;
pub use scan::FileScan;
