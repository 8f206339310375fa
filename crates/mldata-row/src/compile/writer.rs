use mldata_error::{mldata_err, MlDataError};

use crate::entry::EntryValue;

/// Appends the cells of one row to a block buffer.
///
/// With a size prefix, a placeholder cell is reserved when the writer is
/// created and back-patched by [`finish_row`](RowWriter::finish_row) with
/// the row's total cell count, the prefix included.
pub struct RowWriter<'a> {
    data: &'a mut Vec<EntryValue>,
    row_start: usize,
    has_size_prefix: bool,
}

impl<'a> RowWriter<'a> {
    pub fn new(data: &'a mut Vec<EntryValue>, has_size_prefix: bool) -> Self {
        let row_start = data.len();
        if has_size_prefix {
            data.push(EntryValue::from_index(0));
        }
        Self {
            data,
            row_start,
            has_size_prefix,
        }
    }

    /// Offset of the row inside the block.
    pub fn row_start(&self) -> usize {
        self.row_start
    }

    /// Cells written so far, the size prefix included.
    pub fn row_size(&self) -> usize {
        self.data.len() - self.row_start
    }

    #[inline]
    pub fn write_value(&mut self, value: f64) {
        self.data.push(EntryValue::from_double(value));
    }

    #[inline]
    pub fn write_index(&mut self, index: u64) {
        self.data.push(EntryValue::from_index(index));
    }

    #[inline]
    pub fn write_size(&mut self, size: usize) {
        self.data.push(EntryValue::from_index(size as u64));
    }

    #[inline]
    pub fn write_index_value_pair(&mut self, index: u64, value: f64) {
        self.write_index(index);
        self.write_value(value);
    }

    /// Back-patches the size prefix if there is one and returns the number
    /// of cells the row occupies.
    pub fn finish_row(self) -> usize {
        let size = self.row_size();
        if self.has_size_prefix {
            self.data[self.row_start] = EntryValue::from_index(size as u64);
        }
        size
    }
}

/// Error for a missing value the active policy does not allow.
#[cold]
pub fn bad_missing_value_encountered(column_name: &str) -> MlDataError {
    mldata_err!(MissingValue: "missing value in column '{}' is not allowed", column_name)
}
