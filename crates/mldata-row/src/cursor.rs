use mldata_error::{mldata_ensure, mldata_err, MlDataResult};

use crate::entry::EntryValue;
use crate::metadata::{ColumnMetadata, ColumnMode};

/// A position inside the cells of a block, advanced by schema-driven skips.
///
/// Every operation is bounds checked against the slice it is given, so a
/// cursor never walks past the end of a block even when size cells are
/// corrupted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCursor {
    pos: usize,
}

impl RowCursor {
    pub fn new(pos: usize) -> Self {
        Self { pos }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn skip_cells(&mut self, data: &[EntryValue], n: usize) -> MlDataResult<()> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| mldata_err!(oob = self.pos.saturating_add(n), data.len()))?;
        self.pos = end;
        Ok(())
    }

    /// Returns the cell under the cursor and steps past it.
    #[inline]
    pub fn next_cell(&mut self, data: &[EntryValue]) -> MlDataResult<EntryValue> {
        let cell = *data
            .get(self.pos)
            .ok_or_else(|| mldata_err!(oob = self.pos, data.len()))?;
        self.pos += 1;
        Ok(cell)
    }

    /// Reads a length cell and steps past it.
    #[inline]
    pub fn read_size(&mut self, data: &[EntryValue]) -> MlDataResult<usize> {
        let size = self.next_cell(data)?.index_value();
        let remaining = data.len() - self.pos;
        mldata_ensure!(
            size <= remaining as u64,
            Corruption: "length cell {} at offset {} exceeds the {} remaining cells", size, self.pos - 1, remaining
        );
        Ok(size as usize)
    }

    #[inline]
    pub fn skip_fixed_vector(&mut self, data: &[EntryValue], width: usize) -> MlDataResult<()> {
        self.skip_cells(data, width)
    }

    /// Skips a size cell and the indices it announces.
    #[inline]
    pub fn skip_categorical_vector(&mut self, data: &[EntryValue]) -> MlDataResult<()> {
        let n = self.read_size(data)?;
        self.skip_cells(data, n)
    }

    /// Skips a size cell and the `(index, value)` pairs it announces.
    #[inline]
    pub fn skip_dictionary(&mut self, data: &[EntryValue]) -> MlDataResult<()> {
        let n = self.read_size(data)?;
        self.skip_cells(data, n.saturating_mul(2))
    }

    /// Skips whatever `column` wrote for one row.
    pub fn skip_column(&mut self, data: &[EntryValue], column: &ColumnMetadata) -> MlDataResult<()> {
        match column.mode() {
            ColumnMode::Numeric | ColumnMode::Categorical => self.skip_cells(data, 1),
            ColumnMode::NumericVector | ColumnMode::NumericNdVector => {
                self.skip_fixed_vector(data, column.width())
            },
            ColumnMode::CategoricalVector => self.skip_categorical_vector(data),
            ColumnMode::Dictionary => self.skip_dictionary(data),
            ColumnMode::Untranslated | ColumnMode::CategoricalSorted => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::indexer::ColumnIndexer;

    fn cells(values: &[u64]) -> Vec<EntryValue> {
        values.iter().map(|&v| EntryValue::from_index(v)).collect()
    }

    #[test]
    fn test_skips() {
        // vector(2) | cat vec [2: 4, 5] | dict [1: (3, x)] | numeric
        let data = cells(&[0, 0, 2, 4, 5, 1, 3, 0, 0]);
        let mut cursor = RowCursor::new(0);
        cursor.skip_fixed_vector(&data, 2).unwrap();
        assert_eq!(cursor.pos(), 2);
        cursor.skip_categorical_vector(&data).unwrap();
        assert_eq!(cursor.pos(), 5);
        cursor.skip_dictionary(&data).unwrap();
        assert_eq!(cursor.pos(), 8);

        let numeric = ColumnMetadata::numeric("x");
        cursor.skip_column(&data, &numeric).unwrap();
        assert_eq!(cursor.pos(), data.len());
        assert!(cursor.next_cell(&data).is_err());
    }

    #[test]
    fn test_untranslated_is_free() {
        let data = cells(&[1]);
        let mut cursor = RowCursor::default();
        cursor
            .skip_column(&data, &ColumnMetadata::untranslated("raw"))
            .unwrap();
        cursor
            .skip_column(&data, &ColumnMetadata::categorical_sorted("s"))
            .unwrap();
        assert_eq!(cursor.pos(), 0);
    }

    #[test]
    fn test_corrupted_lengths() {
        let data = cells(&[10, 1, 2]);
        assert!(RowCursor::new(0).skip_categorical_vector(&data).is_err());

        let data = cells(&[2, 1, 2, 3]);
        assert!(RowCursor::new(0).skip_dictionary(&data).is_err());

        let data = cells(&[u64::MAX]);
        let dict = ColumnMetadata::dictionary("d", Arc::new(ColumnIndexer::new()));
        assert!(RowCursor::new(0).skip_column(&data, &dict).is_err());
    }
}
