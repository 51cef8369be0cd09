//! Buffer pool: in-memory page cache with pinning and LRU eviction.
//!
//! Every page access goes through a pin guard. The page stays resident while
//! any guard for it is alive; dropping the guard unpins it. Only unpinned
//! pages are eviction candidates, and dirty victims are written back first.

mod lru;
mod pool;

pub use pool::{BufferPool, BufferPoolImpl, PageGuard, PageGuardMut, PageRef, PageRefMut};
