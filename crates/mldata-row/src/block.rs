use mldata_error::{mldata_bail, mldata_ensure, mldata_err, MlDataResult};

use crate::entry::EntryValue;
use crate::metadata::RowMetadata;
use crate::value::Value;

/// A chunk of consecutive compiled rows.
///
/// Rows are stored back to back in `entry_data`; how many cells each row
/// spans is only known together with the [`RowMetadata`] the block was
/// compiled under. `additional_data` is carried through save and load
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowDataBlock {
    entry_data: Vec<EntryValue>,
    additional_data: Vec<Value>,
}

impl RowDataBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entry_data: Vec::with_capacity(capacity),
            additional_data: vec![],
        }
    }

    pub fn from_entries(entry_data: Vec<EntryValue>) -> Self {
        Self {
            entry_data,
            additional_data: vec![],
        }
    }

    pub fn entry_data(&self) -> &[EntryValue] {
        &self.entry_data
    }

    pub fn entry_data_mut(&mut self) -> &mut Vec<EntryValue> {
        &mut self.entry_data
    }

    /// Number of cells in the block.
    pub fn len(&self) -> usize {
        self.entry_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_data.is_empty()
    }

    pub fn additional_data(&self) -> &[Value] {
        &self.additional_data
    }

    pub fn set_additional_data(&mut self, additional_data: Vec<Value>) {
        self.additional_data = additional_data;
    }

    /// Iterates the rows of the block front to back as cell slices.
    pub fn rows<'a>(&'a self, metadata: &'a RowMetadata) -> RowIter<'a> {
        RowIter {
            metadata,
            data: &self.entry_data,
            offset: 0,
        }
    }

    /// Counts the rows by walking the block.
    pub fn num_rows(&self, metadata: &RowMetadata) -> MlDataResult<usize> {
        if metadata.data_size_is_constant() {
            let stride = metadata.constant_data_size();
            if stride == 0 {
                return Ok(0);
            }
            mldata_ensure!(
                self.entry_data.len() % stride == 0,
                Corruption: "block of {} cells is not a multiple of the row size {}", self.entry_data.len(), stride
            );
            return Ok(self.entry_data.len() / stride);
        }
        self.rows(metadata).try_fold(0, |n, row| row.map(|_| n + 1))
    }
}

/// Number of cells spanned by the row that starts at `offset`.
///
/// For constant-size schemas this is the constant stride and `data` is not
/// read; otherwise it is the value of the row's size prefix, which must fit
/// inside `data`.
pub fn row_size(metadata: &RowMetadata, data: &[EntryValue], offset: usize) -> MlDataResult<usize> {
    if metadata.data_size_is_constant() {
        return Ok(metadata.constant_data_size());
    }
    let Some(size) = data.get(offset) else {
        mldata_bail!(oob = offset, data.len());
    };
    let size = size.index_value();
    let remaining = (data.len() - offset) as u64;
    mldata_ensure!(
        size >= 1 && size <= remaining,
        Corruption: "row at offset {} claims {} cells, {} available", offset, size, remaining
    );
    Ok(size as usize)
}

/// Forward iterator over the rows of a block.
pub struct RowIter<'a> {
    metadata: &'a RowMetadata,
    data: &'a [EntryValue],
    offset: usize,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = MlDataResult<&'a [EntryValue]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        let size = match row_size(self.metadata, self.data, self.offset) {
            Ok(0) => return None,
            Ok(size) => size,
            Err(e) => {
                self.offset = self.data.len();
                return Some(Err(e));
            },
        };
        let end = self.offset + size;
        if end > self.data.len() {
            let offset = self.offset;
            self.offset = self.data.len();
            return Some(Err(mldata_err!(
                Corruption: "row at offset {} runs past the end of the block", offset
            )));
        }
        let row = &self.data[self.offset..end];
        self.offset = end;
        Some(Ok(row))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::indexer::ColumnIndexer;
    use crate::metadata::ColumnMetadata;

    fn variable_metadata() -> RowMetadata {
        RowMetadata::try_new(vec![
            ColumnMetadata::numeric("x"),
            ColumnMetadata::categorical_vector("c", Arc::new(ColumnIndexer::new())),
        ])
        .unwrap()
    }

    fn cells(values: &[u64]) -> Vec<EntryValue> {
        values.iter().map(|&v| EntryValue::from_index(v)).collect()
    }

    #[test]
    fn test_iterate_variable_rows() {
        let metadata = variable_metadata();
        let block = RowDataBlock::from_entries(cells(&[3, 9, 0, 5, 9, 2, 4, 7]));
        let rows: Vec<_> = block.rows(&metadata).collect::<MlDataResult<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1][4].index_value(), 7);
        assert_eq!(block.num_rows(&metadata).unwrap(), 2);
    }

    #[test]
    fn test_iterate_constant_rows() {
        let metadata = RowMetadata::try_new(vec![ColumnMetadata::numeric_vector("v", 2)]).unwrap();
        let block = RowDataBlock::from_entries(cells(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(block.num_rows(&metadata).unwrap(), 3);
        assert_eq!(block.rows(&metadata).count(), 3);

        let ragged = RowDataBlock::from_entries(cells(&[1, 2, 3]));
        assert!(ragged.num_rows(&metadata).is_err());
    }

    #[test]
    fn test_bad_size_prefix() {
        let metadata = variable_metadata();
        let data = cells(&[0, 1]);
        assert!(row_size(&metadata, &data, 0).is_err());
        let data = cells(&[5, 1]);
        assert!(row_size(&metadata, &data, 0).is_err());
        assert!(row_size(&metadata, &data, 2).is_err());

        let block = RowDataBlock::from_entries(cells(&[2, 1, 9, 1]));
        let rows: Vec<_> = block.rows(&metadata).collect();
        assert!(rows[0].is_ok());
        assert!(rows[1].is_err());
    }
}
