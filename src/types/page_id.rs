//! Page numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a page within a paged file.
///
/// Page 0 of a record file holds the file header; data pages are numbered
/// from 1. Data pages link to each other by number, never by pointer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct PageId(pub u32);

impl PageId {
    /// "No page": ends the free-page list and marks unlinked pages
    pub const INVALID: PageId = PageId(u32::MAX);

    /// The record file header page
    pub const HEADER: PageId = PageId(0);

    pub const fn new(page_num: u32) -> Self {
        Self(page_num)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// False only for the sentinel
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// The page that follows this one
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Byte position of the page in its file
    pub const fn file_offset(self, page_size: usize) -> u64 {
        (self.0 as u64) * (page_size as u64)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => f.write_str("none"),
            Self(n) => write!(f, "{}", n),
        }
    }
}

impl From<u32> for PageId {
    fn from(page_num: u32) -> Self {
        Self(page_num)
    }
}

impl From<PageId> for u32 {
    fn from(page_id: PageId) -> Self {
        page_id.0
    }
}
