//! Data page header structure.
//!
//! The header occupies the first bytes of each data page. Its fixed part is
//! the free-list link; the occupancy bitmap follows it and is sized by the
//! file's page layout.

use crate::types::PageId;

/// Size of the free-list link field
pub const LINK_SIZE: usize = 4;

/// Fixed part of a data page header
///
/// Layout:
/// ```text
/// Offset  Size  Description
/// 0       4     Next page on the free list (u32::MAX if none)
/// 4       n     Occupancy bitmap (see `PageLayout::bitmap_size`)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPageHeader {
    /// Next page with a free slot, or `PageId::INVALID` when this page is the
    /// list tail or is full and therefore unlinked
    pub next_free: PageId,
}

impl DataPageHeader {
    /// Header of a freshly allocated page: not linked anywhere yet
    pub fn new() -> Self {
        Self {
            next_free: PageId::INVALID,
        }
    }

    /// Read a page header from bytes
    pub fn read(bytes: &[u8]) -> Self {
        let next_free = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Self {
            next_free: PageId::new(next_free),
        }
    }

    /// Write this header to bytes
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0..LINK_SIZE].copy_from_slice(&self.next_free.value().to_be_bytes());
    }
}

impl Default for DataPageHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = DataPageHeader {
            next_free: PageId::new(17),
        };
        let mut bytes = [0u8; LINK_SIZE];
        header.write(&mut bytes);
        assert_eq!(DataPageHeader::read(&bytes), header);
    }

    #[test]
    fn test_new_header_is_unlinked() {
        let mut bytes = [0u8; LINK_SIZE];
        DataPageHeader::new().write(&mut bytes);
        assert_eq!(bytes, [0xFF; LINK_SIZE]);
        assert!(!DataPageHeader::read(&bytes).next_free.is_valid());
    }
}
