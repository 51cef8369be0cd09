//! Record value type.

use crate::types::Rid;

/// A copy of one record's bytes together with its address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    rid: Rid,
    data: Vec<u8>,
}

impl Record {
    pub fn new(rid: Rid, data: Vec<u8>) -> Self {
        Self { rid, data }
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the bytes, for building an update
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
