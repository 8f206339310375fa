//! Operations on compiled blocks that never decode the row contents.
use mldata_error::{mldata_bail, mldata_ensure, MlDataResult};

use crate::block::{row_size, RowDataBlock};
use crate::cursor::RowCursor;
use crate::entry::EntryValue;
use crate::metadata::{ColumnMode, RowMetadata};

/// Cuts `block` down to its first `n_rows` rows.
///
/// Fails with `OutOfBounds` if the block holds fewer rows.
pub fn truncate_block(metadata: &RowMetadata, block: &mut RowDataBlock, n_rows: usize) -> MlDataResult<()> {
    let data = block.entry_data();
    let end = if metadata.data_size_is_constant() {
        let end = n_rows.checked_mul(metadata.constant_data_size());
        match end {
            Some(end) if end <= data.len() => end,
            _ => mldata_bail!(
                OutOfBounds: "cannot truncate to {} rows of {} cells, block holds {} cells",
                n_rows, metadata.constant_data_size(), data.len()
            ),
        }
    } else {
        let mut offset = 0;
        for row in 0..n_rows {
            mldata_ensure!(
                offset < data.len(),
                OutOfBounds: "cannot truncate to {} rows, block holds {}", n_rows, row
            );
            offset += row_size(metadata, data, offset)?;
        }
        offset
    };
    block.entry_data_mut().truncate(end);
    Ok(())
}

/// Copies the row starting at `row_start` in `source` onto the end of `dest`
/// and returns its size in cells.
pub fn append_row(
    metadata: &RowMetadata,
    dest: &mut RowDataBlock,
    source: &[EntryValue],
    row_start: usize,
) -> MlDataResult<usize> {
    let size = row_size(metadata, source, row_start)?;
    let end = row_start.saturating_add(size);
    mldata_ensure!(
        row_start < source.len() && end <= source.len(),
        OutOfBounds: "row {}..{} is out of bounds for a source of {} cells", row_start, end, source.len()
    );
    dest.entry_data_mut().extend_from_slice(&source[row_start..end]);
    Ok(size)
}

#[inline]
fn remap_cell(cell: &mut EntryValue, remap: &[u64]) {
    let mapped = usize::try_from(cell.index_value())
        .ok()
        .and_then(|idx| remap.get(idx));
    if let Some(&new_index) = mapped {
        *cell = EntryValue::from_index(new_index);
    }
}

/// Rewrites the categorical indices of every row through `remaps`.
///
/// `remaps[c]` is the old → new index table of column `c`, or `None` to leave
/// the column alone. Indices past the end of a table are kept as they are.
/// Only category cells, categorical-vector elements and dictionary keys are
/// written; everything else is stepped over. The order of indices within a
/// row is not changed.
pub fn reindex_block(
    metadata: &RowMetadata,
    block: &mut RowDataBlock,
    remaps: &[Option<&[u64]>],
) -> MlDataResult<()> {
    mldata_ensure!(
        remaps.len() == metadata.num_columns(),
        SchemaMismatch: "expected {} index remappings, got {}", metadata.num_columns(), remaps.len()
    );
    if remaps.iter().all(Option::is_none) {
        return Ok(());
    }

    let has_size_prefix = !metadata.data_size_is_constant();
    let data = block.entry_data_mut();
    let mut offset = 0;
    while offset < data.len() {
        let size = row_size(metadata, data, offset)?;
        if size == 0 {
            break;
        }
        let end = offset + size;
        mldata_ensure!(
            end <= data.len(),
            Corruption: "row at offset {} runs past the end of the block", offset
        );
        let row = &mut data[..end];
        let mut cursor = RowCursor::new(offset + has_size_prefix as usize);

        for (column, remap) in metadata.columns().iter().zip(remaps) {
            match (column.mode(), remap) {
                (ColumnMode::Categorical, Some(remap)) => {
                    let pos = cursor.pos();
                    cursor.skip_cells(row, 1)?;
                    remap_cell(&mut row[pos], remap);
                },
                (ColumnMode::CategoricalVector, Some(remap)) => {
                    let n = cursor.read_size(row)?;
                    let start = cursor.pos();
                    cursor.skip_cells(row, n)?;
                    row[start..start + n]
                        .iter_mut()
                        .for_each(|cell| remap_cell(cell, remap));
                },
                (ColumnMode::Dictionary, Some(remap)) => {
                    let n = cursor.read_size(row)?;
                    let start = cursor.pos();
                    cursor.skip_cells(row, 2 * n)?;
                    row[start..start + 2 * n]
                        .iter_mut()
                        .step_by(2)
                        .for_each(|cell| remap_cell(cell, remap));
                },
                _ => cursor.skip_column(row, column)?,
            }
        }

        mldata_ensure!(
            cursor.pos() == end,
            Corruption: "row at offset {} ends at cell {}, its size says {}", offset, cursor.pos(), end
        );
        offset = end;
    }
    Ok(())
}
