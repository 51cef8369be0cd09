//! Common types used throughout the record manager.

mod page_id;
mod rid;

pub use page_id::PageId;
pub use rid::Rid;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Maximum length of a string attribute in a scan predicate
pub const MAX_STRING_LEN: usize = 255;

/// Size of an `Int` or `Float` attribute
pub const NUMERIC_ATTR_LEN: usize = 4;

/// Attribute types understood by scan predicates
///
/// Numeric attributes are stored little-endian inside the record bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttrType {
    /// 4-byte signed integer
    Int,
    /// 4-byte IEEE-754 float
    Float,
    /// Fixed-length byte string, compared lexicographically
    String,
}

impl AttrType {
    /// Check whether `len` is a legal attribute length for this type
    pub fn valid_length(self, len: usize) -> bool {
        match self {
            Self::Int | Self::Float => len == NUMERIC_ATTR_LEN,
            Self::String => (1..=MAX_STRING_LEN).contains(&len),
        }
    }

    /// Compare two attribute values of this type.
    ///
    /// Both slices must already have the attribute's length. Returns `None`
    /// when the values are unordered (a NaN float).
    pub fn compare(self, lhs: &[u8], rhs: &[u8]) -> Option<Ordering> {
        match self {
            Self::Int => Some(read_i32(lhs).cmp(&read_i32(rhs))),
            Self::Float => read_f32(lhs).partial_cmp(&read_f32(rhs)),
            Self::String => Some(lhs.cmp(rhs)),
        }
    }
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Comparison operators for scan predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// Matches every record
    NoOp,
}

impl CompOp {
    /// Decide whether a comparison outcome satisfies this operator.
    ///
    /// `ordering` is `record_value.cmp(scan_value)`; `None` means unordered,
    /// which only `Ne` (and `NoOp`) accept.
    pub fn matches(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Self::NoOp, _) => true,
            (Self::Ne, None) => true,
            (_, None) => false,
            (Self::Eq, Some(o)) => o == Ordering::Equal,
            (Self::Ne, Some(o)) => o != Ordering::Equal,
            (Self::Lt, Some(o)) => o == Ordering::Less,
            (Self::Gt, Some(o)) => o == Ordering::Greater,
            (Self::Le, Some(o)) => o != Ordering::Greater,
            (Self::Ge, Some(o)) => o != Ordering::Less,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_compare() {
        let a = 3i32.to_le_bytes();
        let b = (-7i32).to_le_bytes();
        assert_eq!(AttrType::Int.compare(&a, &b), Some(Ordering::Greater));
        assert_eq!(AttrType::Int.compare(&b, &a), Some(Ordering::Less));
        assert_eq!(AttrType::Int.compare(&a, &a), Some(Ordering::Equal));
    }

    #[test]
    fn test_float_compare_nan() {
        let nan = f32::NAN.to_le_bytes();
        let one = 1.0f32.to_le_bytes();
        let ord = AttrType::Float.compare(&nan, &one);
        assert_eq!(ord, None);
        assert!(CompOp::Ne.matches(ord));
        assert!(!CompOp::Eq.matches(ord));
        assert!(!CompOp::Le.matches(ord));
        assert!(CompOp::NoOp.matches(ord));
    }

    #[test]
    fn test_string_compare() {
        assert_eq!(
            AttrType::String.compare(b"abc", b"abd"),
            Some(Ordering::Less)
        );
        assert_eq!(AttrType::String.compare(b"b\0\0", b"abc"), Some(Ordering::Greater));
    }

    #[test]
    fn test_comp_op_table() {
        use Ordering::*;
        assert!(CompOp::Le.matches(Some(Equal)));
        assert!(CompOp::Le.matches(Some(Less)));
        assert!(!CompOp::Le.matches(Some(Greater)));
        assert!(CompOp::Ge.matches(Some(Greater)));
        assert!(!CompOp::Gt.matches(Some(Equal)));
        assert!(CompOp::Lt.matches(Some(Less)));
    }

    #[test]
    fn test_valid_length() {
        assert!(AttrType::Int.valid_length(4));
        assert!(!AttrType::Float.valid_length(8));
        assert!(AttrType::String.valid_length(1));
        assert!(AttrType::String.valid_length(MAX_STRING_LEN));
        assert!(!AttrType::String.valid_length(0));
        assert!(!AttrType::String.valid_length(MAX_STRING_LEN + 1));
    }
}
