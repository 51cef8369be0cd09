//! LRU (Least Recently Used) ordering of resident pages.
//!
//! Each access stamps the page with a monotonically increasing tick; the
//! oldest stamp is the least recently used page.

use crate::types::PageId;
use std::collections::{BTreeMap, HashMap};

/// Access order of the pages resident in a buffer pool
#[derive(Debug, Default)]
pub struct LruList {
    /// Next tick to hand out
    clock: u64,
    /// Latest tick per page
    stamps: HashMap<PageId, u64>,
    /// Pages by tick, oldest first
    order: BTreeMap<u64, PageId>,
}

impl LruList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access, making the page the most recently used
    pub fn touch(&mut self, page_id: PageId) {
        if let Some(old) = self.stamps.insert(page_id, self.clock) {
            self.order.remove(&old);
        }
        self.order.insert(self.clock, page_id);
        self.clock += 1;
    }

    /// Forget a page
    pub fn remove(&mut self, page_id: PageId) {
        if let Some(old) = self.stamps.remove(&page_id) {
            self.order.remove(&old);
        }
    }

    /// Pages from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = PageId> + '_ {
        self.order.values().copied()
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}
