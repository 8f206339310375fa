//! Unpacking single rows of a compiled block.
use mldata_error::{mldata_ensure, mldata_err, MlDataResult};

use crate::block::row_size;
use crate::cursor::RowCursor;
use crate::entry::EntryValue;
use crate::indexer::CategoricalIndexer;
use crate::metadata::{ColumnMode, RowMetadata};
use crate::value::{NdVector, Value};

/// One non-structural cell of a row, as consumed by model code.
///
/// Numeric columns yield `(element, value)`, categorical columns
/// `(category index, 1.0)`, dictionaries `(key index, value)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowEntry {
    pub column_index: usize,
    pub index: u64,
    pub value: f64,
}

/// Splits off the row starting at `offset`, returning the cells after the
/// size prefix and the total row size.
fn row_payload<'a>(
    metadata: &RowMetadata,
    data: &'a [EntryValue],
    offset: usize,
) -> MlDataResult<(&'a [EntryValue], RowCursor, usize)> {
    let size = row_size(metadata, data, offset)?;
    let end = offset
        .checked_add(size)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| mldata_err!(oob = offset.saturating_add(size), data.len()))?;
    let start = if metadata.data_size_is_constant() {
        offset
    } else {
        offset + 1
    };
    Ok((&data[..end], RowCursor::new(start), size))
}

fn ensure_consumed(cursor: &RowCursor, row: &[EntryValue], offset: usize) -> MlDataResult<()> {
    mldata_ensure!(
        cursor.pos() == row.len(),
        Corruption: "row at offset {} ends at cell {}, its size says {}", offset, cursor.pos(), row.len()
    );
    Ok(())
}

/// Appends the entries of the row starting at `offset` to `out` and returns
/// the number of cells the row occupies.
pub fn decode_row(
    metadata: &RowMetadata,
    data: &[EntryValue],
    offset: usize,
    out: &mut Vec<RowEntry>,
) -> MlDataResult<usize> {
    let (row, mut cursor, size) = row_payload(metadata, data, offset)?;

    for (column_index, column) in metadata.columns().iter().enumerate() {
        let entry = |index: u64, value: f64| RowEntry {
            column_index,
            index,
            value,
        };
        match column.mode() {
            ColumnMode::Numeric => out.push(entry(0, cursor.next_cell(row)?.double_value())),
            ColumnMode::NumericVector | ColumnMode::NumericNdVector => {
                for i in 0..column.width() {
                    out.push(entry(i as u64, cursor.next_cell(row)?.double_value()));
                }
            },
            ColumnMode::Categorical => out.push(entry(cursor.next_cell(row)?.index_value(), 1.0)),
            ColumnMode::CategoricalVector => {
                let n = cursor.read_size(row)?;
                for _ in 0..n {
                    out.push(entry(cursor.next_cell(row)?.index_value(), 1.0));
                }
            },
            ColumnMode::Dictionary => {
                let n = cursor.read_size(row)?;
                for _ in 0..n {
                    let index = cursor.next_cell(row)?.index_value();
                    let value = cursor.next_cell(row)?.double_value();
                    out.push(entry(index, value));
                }
            },
            ColumnMode::Untranslated | ColumnMode::CategoricalSorted => {},
        }
    }

    ensure_consumed(&cursor, row, offset)?;
    Ok(size)
}

fn category(indexer: &dyn CategoricalIndexer, index: u64) -> Value {
    indexer
        .map_index_to_value(index)
        .map_or(Value::Undefined, Value::from)
}

/// Maps the row starting at `offset` back to one [`Value`] per column.
///
/// Indices the column's indexer does not know, such as
/// [`UNKNOWN_INDEX`](crate::indexer::UNKNOWN_INDEX), come back as
/// `Undefined`, as do columns that are not stored in the row.
pub fn translate_row(
    metadata: &RowMetadata,
    data: &[EntryValue],
    offset: usize,
) -> MlDataResult<(Vec<Value>, usize)> {
    let (row, mut cursor, size) = row_payload(metadata, data, offset)?;
    let mut values = Vec::with_capacity(metadata.num_columns());

    for column in metadata.columns() {
        let value = match column.mode() {
            ColumnMode::Numeric => Value::Float(cursor.next_cell(row)?.double_value()),
            ColumnMode::NumericVector | ColumnMode::NumericNdVector => {
                let elements = (0..column.width())
                    .map(|_| cursor.next_cell(row).map(EntryValue::double_value))
                    .collect::<MlDataResult<Vec<_>>>()?;
                match column.nd_shape() {
                    Some(shape) => Value::NdVector(NdVector::try_new(shape.to_vec(), elements)?),
                    None => Value::Vector(elements),
                }
            },
            ColumnMode::Categorical => {
                let indexer = column.indexer()?;
                category(indexer, cursor.next_cell(row)?.index_value())
            },
            ColumnMode::CategoricalVector => {
                let indexer = column.indexer()?;
                let n = cursor.read_size(row)?;
                let items = (0..n)
                    .map(|_| Ok(category(indexer, cursor.next_cell(row)?.index_value())))
                    .collect::<MlDataResult<Vec<_>>>()?;
                Value::List(items)
            },
            ColumnMode::Dictionary => {
                let indexer = column.indexer()?;
                let n = cursor.read_size(row)?;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    let key = category(indexer, cursor.next_cell(row)?.index_value());
                    let value = Value::Float(cursor.next_cell(row)?.double_value());
                    items.push((key, value));
                }
                Value::Dict(items)
            },
            ColumnMode::Untranslated | ColumnMode::CategoricalSorted => Value::Undefined,
        };
        values.push(value);
    }

    ensure_consumed(&cursor, row, offset)?;
    Ok((values, size))
}
