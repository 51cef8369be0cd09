//! Slot occupancy bitmap.
//!
//! Bit `i` lives in byte `i / 8` under mask `1 << (i % 8)`. Bits at or past
//! the page's slot count are never set.

/// Read-only view of a bitmap
#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a> {
    bits: &'a [u8],
}

impl<'a> Bitmap<'a> {
    pub fn new(bits: &'a [u8]) -> Self {
        Self { bits }
    }

    /// Check whether bit `i` is set
    pub fn is_set(&self, i: usize) -> bool {
        self.bits[i / 8] & (1 << (i % 8)) != 0
    }

    /// Lowest clear bit below `limit`
    pub fn first_clear(&self, limit: usize) -> Option<usize> {
        for (idx, &byte) in self.bits.iter().enumerate() {
            if byte != 0xFF {
                let bit = idx * 8 + byte.trailing_ones() as usize;
                return (bit < limit).then_some(bit);
            }
        }
        None
    }

    /// Lowest set bit in `from..limit`
    pub fn next_set(&self, from: usize, limit: usize) -> Option<usize> {
        let mut i = from;
        while i < limit {
            let byte = self.bits[i / 8] >> (i % 8);
            if byte == 0 {
                // Nothing left in this byte
                i = (i / 8 + 1) * 8;
                continue;
            }
            let bit = i + byte.trailing_zeros() as usize;
            return (bit < limit).then_some(bit);
        }
        None
    }

    /// Number of set bits
    pub fn count_set(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}

/// Mutable view of a bitmap
#[derive(Debug)]
pub struct BitmapMut<'a> {
    bits: &'a mut [u8],
}

impl<'a> BitmapMut<'a> {
    pub fn new(bits: &'a mut [u8]) -> Self {
        Self { bits }
    }

    pub fn view(&self) -> Bitmap<'_> {
        Bitmap::new(&*self.bits)
    }

    pub fn set(&mut self, i: usize) {
        self.bits[i / 8] |= 1 << (i % 8);
    }

    pub fn clear(&mut self, i: usize) {
        self.bits[i / 8] &= !(1 << (i % 8));
    }

    /// Clear every bit
    pub fn reset(&mut self) {
        self.bits.fill(0);
    }
}
