//! Record file header.
//!
//! The first page (page 0) of every record file holds metadata about the
//! file: the record geometry and the head of the free-page list.

use crate::error::{Result, StorageError};
use crate::page::PageLayout;
use crate::types::{PageId, PAGE_SIZE};

/// Magic bytes to identify a valid record file
pub const MAGIC: &[u8; 16] = b"RecordFileV01\0\0\0";

/// File header size (uses first page)
pub const FILE_HEADER_SIZE: usize = PAGE_SIZE;

/// Bytes covered by the checksum
const CHECKSUMMED_LEN: usize = 40;

/// Record file header
///
/// Layout:
/// ```text
/// Offset  Size  Description
/// 0       16    Magic string "RecordFileV01\0\0\0"
/// 16      4     Page size (currently always 4096)
/// 20      4     Record size in bytes
/// 24      4     Records per data page
/// 28      4     Bitmap size in bytes
/// 32      4     First page of the free list (u32::MAX if none)
/// 36      4     Number of data pages
/// 40      4     Checksum of header (CRC32)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFileHeader {
    /// Page size in bytes
    pub page_size: u32,
    /// Size of every record in the file
    pub record_size: u32,
    /// Slots per data page, derived from the record size
    pub records_per_page: u32,
    /// Size of the occupancy bitmap of each data page
    pub bitmap_size: u32,
    /// First data page with a free slot
    pub first_free_page: PageId,
    /// Data pages allocated so far (pages 1..=num_pages)
    pub num_pages: u32,
}

impl RecordFileHeader {
    /// Create the header of an empty file for the given layout
    pub fn new(layout: &PageLayout) -> Self {
        Self {
            page_size: PAGE_SIZE as u32,
            record_size: layout.record_size() as u32,
            records_per_page: layout.records_per_page() as u32,
            bitmap_size: layout.bitmap_size() as u32,
            first_free_page: PageId::INVALID,
            num_pages: 0,
        }
    }

    /// Read and validate a file header from bytes
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CHECKSUMMED_LEN + 4 {
            return Err(StorageError::invalid_db("header too short"));
        }

        // Check magic
        if &bytes[0..16] != MAGIC {
            return Err(StorageError::invalid_db("invalid magic bytes"));
        }

        let field = |at: usize| {
            u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };

        // Verify checksum
        let stored_checksum = field(CHECKSUMMED_LEN);
        let computed_checksum = crc32fast::hash(&bytes[0..CHECKSUMMED_LEN]);
        if stored_checksum != computed_checksum {
            return Err(StorageError::corruption("header checksum mismatch"));
        }

        let header = Self {
            page_size: field(16),
            record_size: field(20),
            records_per_page: field(24),
            bitmap_size: field(28),
            first_free_page: PageId::new(field(32)),
            num_pages: field(36),
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size != PAGE_SIZE as u32 {
            return Err(StorageError::invalid_db(format!(
                "unsupported page size: {} (expected {})",
                self.page_size, PAGE_SIZE
            )));
        }

        let layout = PageLayout::new(self.record_size as usize)
            .map_err(|_| StorageError::invalid_db(format!("bad record size {}", self.record_size)))?;
        if self.records_per_page as usize != layout.records_per_page()
            || self.bitmap_size as usize != layout.bitmap_size()
        {
            return Err(StorageError::invalid_db(format!(
                "page geometry {}x{} does not match record size {}",
                self.records_per_page, self.bitmap_size, self.record_size
            )));
        }

        let head = self.first_free_page;
        if head.is_valid() && (head.value() == 0 || head.value() > self.num_pages) {
            return Err(StorageError::invalid_db(format!(
                "free list head {} outside data pages 1..={}",
                head, self.num_pages
            )));
        }

        Ok(())
    }

    /// Write this header to bytes
    pub fn write(&self, bytes: &mut [u8]) {
        // Clear the page first
        bytes[..FILE_HEADER_SIZE].fill(0);

        // Magic
        bytes[0..16].copy_from_slice(MAGIC);

        // Fields
        bytes[16..20].copy_from_slice(&self.page_size.to_be_bytes());
        bytes[20..24].copy_from_slice(&self.record_size.to_be_bytes());
        bytes[24..28].copy_from_slice(&self.records_per_page.to_be_bytes());
        bytes[28..32].copy_from_slice(&self.bitmap_size.to_be_bytes());
        bytes[32..36].copy_from_slice(&self.first_free_page.value().to_be_bytes());
        bytes[36..40].copy_from_slice(&self.num_pages.to_be_bytes());

        // Checksum
        let checksum = crc32fast::hash(&bytes[0..CHECKSUMMED_LEN]);
        bytes[40..44].copy_from_slice(&checksum.to_be_bytes());
    }

    /// Page geometry described by this header
    pub fn layout(&self) -> Result<PageLayout> {
        PageLayout::new(self.record_size as usize)
    }

    /// Whether `page_id` names an allocated data page
    pub fn is_data_page(&self, page_id: PageId) -> bool {
        page_id.value() >= 1 && page_id.value() <= self.num_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordFileHeader {
        let mut header = RecordFileHeader::new(&PageLayout::new(100).unwrap());
        header.num_pages = 7;
        header.first_free_page = PageId::new(5);
        header
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample();
        let mut bytes = vec![0u8; FILE_HEADER_SIZE];
        header.write(&mut bytes);

        let restored = RecordFileHeader::read(&bytes).unwrap();
        assert_eq!(restored, header);
        assert_eq!(restored.layout().unwrap().record_size(), 100);
    }

    #[test]
    fn test_new_header_is_empty() {
        let header = RecordFileHeader::new(&PageLayout::new(8).unwrap());
        assert_eq!(header.num_pages, 0);
        assert_eq!(header.first_free_page, PageId::INVALID);
        assert!(!header.is_data_page(PageId::HEADER));
        assert!(!header.is_data_page(PageId::new(1)));
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = vec![0u8; FILE_HEADER_SIZE];
        bytes[0..16].copy_from_slice(b"InvalidMagic0000");

        assert!(RecordFileHeader::read(&bytes).is_err());
    }

    #[test]
    fn test_checksum_validation() {
        let mut bytes = vec![0u8; FILE_HEADER_SIZE];
        sample().write(&mut bytes);

        // Corrupt a byte
        bytes[21] ^= 0xFF;

        assert!(matches!(
            RecordFileHeader::read(&bytes),
            Err(StorageError::Corruption(_))
        ));
    }

    #[test]
    fn test_inconsistent_geometry() {
        let mut header = sample();
        header.records_per_page += 1;
        let mut bytes = vec![0u8; FILE_HEADER_SIZE];
        header.write(&mut bytes);

        assert!(matches!(
            RecordFileHeader::read(&bytes),
            Err(StorageError::InvalidDatabaseFile(_))
        ));
    }

    #[test]
    fn test_free_head_out_of_range() {
        let mut header = sample();
        header.first_free_page = PageId::new(8);
        let mut bytes = vec![0u8; FILE_HEADER_SIZE];
        header.write(&mut bytes);

        assert!(RecordFileHeader::read(&bytes).is_err());
    }
}
