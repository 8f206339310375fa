use std::fmt::{self, Debug, Formatter};

use bytemuck::{Pod, Zeroable};

/// The atomic 8-byte cell of a row.
///
/// A cell holds either an unsigned index (category indices, vector and
/// dictionary lengths, row sizes) or an IEEE double. Nothing in the cell says
/// which: the row metadata decides by position. Reading a cell through the
/// wrong accessor yields a reinterpretation of the bits, not an error.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct EntryValue(u64);

impl EntryValue {
    #[inline]
    pub const fn from_index(index: u64) -> Self {
        Self(index)
    }

    #[inline]
    pub fn from_double(value: f64) -> Self {
        Self(value.to_bits())
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn index_value(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn double_value(self) -> f64 {
        f64::from_bits(self.0)
    }

    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl Debug for EntryValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EntryValue({:#018x})", self.0)
    }
}

impl From<u64> for EntryValue {
    fn from(index: u64) -> Self {
        Self::from_index(index)
    }
}

impl From<f64> for EntryValue {
    fn from(value: f64) -> Self {
        Self::from_double(value)
    }
}
