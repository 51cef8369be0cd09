//! Record identifier.

use super::PageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a record: the data page holding it and its slot on that page.
///
/// Ordering is page first, then slot, which is also the order a full file
/// scan visits records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub page: PageId,
    pub slot: u32,
}

impl Rid {
    pub fn new(page: PageId, slot: u32) -> Self {
        Self { page, slot }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page, self.slot)
    }
}
