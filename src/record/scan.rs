//! Sequential predicate scan over an open record file.
//!
//! A scan visits live records in page-then-slot order and returns those
//! whose attribute satisfies a single comparison. It borrows the file handle
//! immutably, so the handle cannot be modified while the scan is open.

use crate::buffer::BufferPool;
use crate::error::{Result, StorageError};
use crate::page::RecordPage;
use crate::record::{Record, RecordFileHandle};
use crate::types::{AttrType, CompOp, Rid};

/// Attribute comparison applied to every live record
#[derive(Debug, Clone)]
struct Predicate {
    attr_type: AttrType,
    offset: usize,
    length: usize,
    op: CompOp,
    value: Vec<u8>,
}

impl Predicate {
    fn new(
        record_size: usize,
        attr_type: AttrType,
        length: usize,
        offset: usize,
        op: CompOp,
        value: Option<&[u8]>,
    ) -> Result<Self> {
        match offset.checked_add(length) {
            Some(end) if end <= record_size => {}
            _ => {
                return Err(StorageError::invalid_attribute(format!(
                    "attribute at {}..{}+{} outside {}-byte record",
                    offset, offset, length, record_size
                )))
            }
        }
        if op == CompOp::NoOp {
            return Ok(Self {
                attr_type,
                offset,
                length,
                op,
                value: Vec::new(),
            });
        }

        if !attr_type.valid_length(length) {
            return Err(StorageError::invalid_attribute(format!(
                "length {} is not valid for {:?}",
                length, attr_type
            )));
        }
        let value =
            value.ok_or_else(|| StorageError::invalid_attribute("missing comparison value"))?;
        if value.len() != length {
            return Err(StorageError::invalid_attribute(format!(
                "comparison value is {} bytes, attribute is {}",
                value.len(),
                length
            )));
        }

        Ok(Self {
            attr_type,
            offset,
            length,
            op,
            value: value.to_vec(),
        })
    }

    fn matches(&self, record: &[u8]) -> bool {
        if self.op == CompOp::NoOp {
            return true;
        }
        let attr = &record[self.offset..self.offset + self.length];
        self.op.matches(self.attr_type.compare(attr, &self.value))
    }
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// Before the first data page
    Start,
    /// Just after this record
    After(Rid),
    /// Past the last data page
    End,
}

struct ScanState<'a> {
    handle: &'a RecordFileHandle,
    predicate: Predicate,
    cursor: Cursor,
}

/// Linear scan of the records in a [`RecordFileHandle`]
///
/// ```rust,ignore
/// let mut scan = FileScan::new();
/// scan.open_scan(&handle, AttrType::Int, 4, 0, CompOp::Gt, Some(&10i32.to_le_bytes()))?;
/// while let Some(record) = scan.next_rec()? {
///     println!("{}", record.rid());
/// }
/// scan.close_scan()?;
/// ```
#[derive(Default)]
pub struct FileScan<'a> {
    state: Option<ScanState<'a>>,
}

impl<'a> FileScan<'a> {
    /// Create a closed scan
    pub fn new() -> Self {
        Self { state: None }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Bind the scan to an open handle with a predicate.
    ///
    /// The attribute must lie inside the record. With `CompOp::NoOp` every
    /// record matches and the type and value are not checked; otherwise the
    /// length must suit `attr_type` and `value` must have that length.
    pub fn open_scan(
        &mut self,
        handle: &'a RecordFileHandle,
        attr_type: AttrType,
        attr_length: usize,
        attr_offset: usize,
        comp_op: CompOp,
        value: Option<&[u8]>,
    ) -> Result<()> {
        if self.state.is_some() {
            return Err(StorageError::AlreadyOpen);
        }
        let record_size = handle.record_size()?;
        let predicate = Predicate::new(
            record_size,
            attr_type,
            attr_length,
            attr_offset,
            comp_op,
            value,
        )?;

        self.state = Some(ScanState {
            handle,
            predicate,
            cursor: Cursor::Start,
        });
        Ok(())
    }

    /// Next matching record, or `None` once the file is exhausted
    pub fn next_rec(&mut self) -> Result<Option<Record>> {
        let state = self.state.as_mut().ok_or(StorageError::NotOpen)?;
        let handle = state.handle;
        let file = handle.inner()?;
        let pool = file.pool();
        let layout = file.layout();

        let (mut page, mut from) = match state.cursor {
            // Page 0 is the file header
            Cursor::Start => (pool.first_page().and_then(|p| pool.next_page(p)), 0),
            Cursor::After(rid) => (Some(rid.page), rid.slot + 1),
            Cursor::End => return Ok(None),
        };

        while let Some(page_id) = page {
            if !file.header().is_data_page(page_id) {
                break;
            }

            let guard = pool.fetch_page(page_id)?;
            let bytes = guard.read();
            let view = RecordPage::new(&bytes, layout);

            let mut slot = view.next_occupied(from);
            while let Some(s) = slot {
                let data = view.record(s);
                if state.predicate.matches(data) {
                    let rid = Rid::new(page_id, s);
                    state.cursor = Cursor::After(rid);
                    return Ok(Some(Record::new(rid, data.to_vec())));
                }
                slot = view.next_occupied(s + 1);
            }

            page = pool.next_page(page_id);
            from = 0;
        }

        state.cursor = Cursor::End;
        Ok(None)
    }

    /// Release the handle. Fails with `NotOpen` if the scan is closed.
    pub fn close_scan(&mut self) -> Result<()> {
        self.state.take().map(|_| ()).ok_or(StorageError::NotOpen)
    }
}

impl<'a> Iterator for FileScan<'a> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state.is_none() {
            return None;
        }
        self.next_rec().transpose()
    }
}
