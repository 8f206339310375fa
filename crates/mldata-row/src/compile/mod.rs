//! Translation of typed column buffers into packed rows.
mod parallel;
mod writer;

use std::ops::Range;

use mldata_error::{mldata_bail, mldata_ensure, mldata_err, MlDataResult};
pub use parallel::{compile_parallel, CompiledShard, ParallelCompileOutput};
pub use writer::{bad_missing_value_encountered, RowWriter};

use crate::block::RowDataBlock;
use crate::indexer::{CategoricalIndexer, UNKNOWN_INDEX};
use crate::metadata::{ColumnMetadata, ColumnMode, RowMetadata};
use crate::statistics::{ColumnStatistics, PartialStatistics, StatisticsSink};
use crate::value::{CategoryValue, Value};

/// What to do with an `Undefined` numeric value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MissingValueAction {
    /// Fail the compilation.
    Error,
    /// Replace the value with the mean of the feature's committed statistics.
    #[default]
    Impute,
    /// Write a NaN.
    UseNan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompileOptions {
    /// Feed written values into the per-shard statistics.
    pub track_statistics: bool,
    /// Look categories up in frozen indexers instead of inserting them.
    pub immutable_indexing: bool,
    pub missing_value_action: MissingValueAction,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            track_statistics: true,
            immutable_indexing: false,
            missing_value_action: MissingValueAction::Impute,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileSummary {
    /// Largest row written, in cells, size prefix included.
    pub max_row_size: usize,
    /// Categories a frozen indexer did not know and mapped to
    /// [`UNKNOWN_INDEX`].
    pub num_unseen_categories: usize,
}

impl CompileSummary {
    pub fn combine(self, other: CompileSummary) -> CompileSummary {
        CompileSummary {
            max_row_size: self.max_row_size.max(other.max_row_size),
            num_unseen_categories: self.num_unseen_categories + other.num_unseen_categories,
        }
    }
}

#[derive(Default)]
struct Scratch {
    indices: Vec<u64>,
    pairs: Vec<(u64, f64)>,
    stat_pairs: Vec<(u64, f64)>,
    excluded: Vec<usize>,
}

/// Compiles rows of a set of column buffers under one [`RowMetadata`].
///
/// The compiler is immutable and can be shared between workers; every call to
/// [`compile_rows`](RowCompiler::compile_rows) writes into state owned by the
/// caller.
pub struct RowCompiler<'a> {
    metadata: &'a RowMetadata,
    columns: &'a [Vec<Value>],
    statistics: &'a [ColumnStatistics],
    options: CompileOptions,
    n_rows: usize,
}

fn is_stored(mode: ColumnMode) -> bool {
    !matches!(mode, ColumnMode::Untranslated | ColumnMode::CategoricalSorted)
}

impl<'a> RowCompiler<'a> {
    /// Checks that there is one buffer and one statistics entry per column and
    /// that every stored column has the same number of rows. Buffers of
    /// untranslated columns are never read and may have any length.
    pub fn try_new(
        metadata: &'a RowMetadata,
        columns: &'a [Vec<Value>],
        statistics: &'a [ColumnStatistics],
        options: CompileOptions,
    ) -> MlDataResult<Self> {
        let n_columns = metadata.num_columns();
        mldata_ensure!(
            columns.len() == n_columns,
            SchemaMismatch: "expected {} column buffers, got {}", n_columns, columns.len()
        );
        mldata_ensure!(
            statistics.len() == n_columns,
            SchemaMismatch: "expected {} column statistics, got {}", n_columns, statistics.len()
        );

        let mut n_rows = None;
        for (column, buffer) in metadata.columns().iter().zip(columns) {
            if !is_stored(column.mode()) {
                continue;
            }
            match n_rows {
                None => n_rows = Some(buffer.len()),
                Some(n) => mldata_ensure!(
                    n == buffer.len(),
                    SchemaMismatch: "column '{}' has {} rows, expected {}", column.name(), buffer.len(), n
                ),
            }
        }

        Ok(Self {
            metadata,
            columns,
            statistics,
            options,
            n_rows: n_rows.unwrap_or(0),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Fresh per-shard statistics, one per column.
    pub fn new_partials(&self) -> Vec<PartialStatistics> {
        vec![PartialStatistics::new(); self.metadata.num_columns()]
    }

    /// Appends `rows` to `block`, in order, pushing the offset of every row
    /// onto `row_offsets`.
    ///
    /// On error the block is left with a partially written row and must be
    /// discarded.
    pub fn compile_rows(
        &self,
        thread_idx: usize,
        rows: Range<usize>,
        block: &mut RowDataBlock,
        row_offsets: &mut Vec<usize>,
        partials: &mut [PartialStatistics],
    ) -> MlDataResult<CompileSummary> {
        mldata_ensure!(
            rows.start <= rows.end && rows.end <= self.n_rows,
            OutOfBounds: "rows {:?} out of bounds for {} rows", rows, self.n_rows
        );
        mldata_ensure!(
            partials.len() == self.metadata.num_columns(),
            SchemaMismatch: "expected {} partial statistics, got {}", self.metadata.num_columns(), partials.len()
        );

        let has_size_prefix = !self.metadata.data_size_is_constant();
        let mut scratch = Scratch::default();
        let mut summary = CompileSummary::default();
        let data = block.entry_data_mut();
        row_offsets.reserve(rows.len());

        for row in rows {
            row_offsets.push(data.len());
            let mut writer = RowWriter::new(data, has_size_prefix);
            for (column_idx, column) in self.metadata.columns().iter().enumerate() {
                if !is_stored(column.mode()) {
                    continue;
                }
                self.write_column(
                    thread_idx,
                    column_idx,
                    column,
                    &self.columns[column_idx][row],
                    &mut writer,
                    &mut partials[column_idx],
                    &mut scratch,
                    &mut summary.num_unseen_categories,
                )?;
            }
            let size = writer.finish_row();
            debug_assert!(has_size_prefix || size == self.metadata.constant_data_size());
            summary.max_row_size = summary.max_row_size.max(size);
        }
        Ok(summary)
    }

    fn resolve_missing(&self, column_idx: usize, column: &ColumnMetadata, feature_index: usize) -> MlDataResult<f64> {
        match self.options.missing_value_action {
            MissingValueAction::Error => Err(bad_missing_value_encountered(column.name())),
            MissingValueAction::Impute => Ok(self.statistics[column_idx].mean(feature_index)),
            MissingValueAction::UseNan => Ok(f64::NAN),
        }
    }

    fn index_category(
        &self,
        thread_idx: usize,
        column: &ColumnMetadata,
        indexer: &dyn CategoricalIndexer,
        value: &Value,
        num_unseen: &mut usize,
    ) -> MlDataResult<u64> {
        let category = CategoryValue::try_from(value)
            .map_err(|e| e.context(format!("column '{}'", column.name()).into()))?;
        if !self.options.immutable_indexing {
            return Ok(indexer.map_value_to_index(thread_idx, &category));
        }

        let index = indexer.immutable_map_value_to_index(&category);
        if index == UNKNOWN_INDEX {
            if self.options.missing_value_action == MissingValueAction::Error {
                mldata_bail!(
                    MissingValue: "category {:?} of column '{}' is not in the index", category, column.name()
                );
            }
            *num_unseen += 1;
        }
        Ok(index)
    }

    fn write_column(
        &self,
        thread_idx: usize,
        column_idx: usize,
        column: &ColumnMetadata,
        value: &Value,
        writer: &mut RowWriter<'_>,
        partial: &mut PartialStatistics,
        scratch: &mut Scratch,
        num_unseen: &mut usize,
    ) -> MlDataResult<()> {
        let track = self.options.track_statistics;
        match column.mode() {
            ColumnMode::Numeric => match value {
                Value::Undefined => writer.write_value(self.resolve_missing(column_idx, column, 0)?),
                v => {
                    let x = v.as_numeric().ok_or_else(|| {
                        mldata_err!(
                            SchemaMismatch: "column '{}' expects a numeric value, got {}", column.name(), v.type_name()
                        )
                    })?;
                    writer.write_value(x);
                    if track {
                        partial.update_numeric_statistics(&[x]);
                    }
                },
            },
            ColumnMode::NumericVector | ColumnMode::NumericNdVector => {
                if value.is_undefined() {
                    for i in 0..column.width() {
                        writer.write_value(self.resolve_missing(column_idx, column, i)?);
                    }
                    return Ok(());
                }
                let values = vector_payload(column, value)?;
                values.iter().for_each(|&x| writer.write_value(x));
                if track {
                    partial.update_numeric_statistics(values);
                }
            },
            ColumnMode::Categorical => {
                let indexer = column.indexer()?;
                let index = self.index_category(thread_idx, column, indexer, value, num_unseen)?;
                writer.write_index(index);
                if track {
                    partial.update_categorical_statistics(&[index]);
                }
            },
            ColumnMode::CategoricalVector => {
                let items = match value {
                    Value::Undefined => {
                        if self.options.missing_value_action == MissingValueAction::Error {
                            return Err(bad_missing_value_encountered(column.name()));
                        }
                        &[][..]
                    },
                    Value::List(items) => items.as_slice(),
                    v => mldata_bail!(
                        SchemaMismatch: "column '{}' expects a list, got {}", column.name(), v.type_name()
                    ),
                };
                let indexer = column.indexer()?;
                let indices = &mut scratch.indices;
                indices.clear();
                for item in items {
                    indices.push(self.index_category(thread_idx, column, indexer, item, num_unseen)?);
                }
                indices.sort_unstable();

                writer.write_size(indices.len());
                indices.iter().for_each(|&idx| writer.write_index(idx));
                if track {
                    partial.update_categorical_statistics(indices);
                }
            },
            ColumnMode::Dictionary => {
                let items = match value {
                    Value::Undefined => {
                        if self.options.missing_value_action == MissingValueAction::Error {
                            return Err(bad_missing_value_encountered(column.name()));
                        }
                        &[][..]
                    },
                    Value::Dict(items) => items.as_slice(),
                    v => mldata_bail!(
                        SchemaMismatch: "column '{}' expects a dictionary, got {}", column.name(), v.type_name()
                    ),
                };
                self.write_dictionary(thread_idx, column_idx, column, items, writer, partial, scratch, num_unseen)?;
            },
            ColumnMode::Untranslated | ColumnMode::CategoricalSorted => {},
        }
        Ok(())
    }

    fn write_dictionary(
        &self,
        thread_idx: usize,
        column_idx: usize,
        column: &ColumnMetadata,
        items: &[(Value, Value)],
        writer: &mut RowWriter<'_>,
        partial: &mut PartialStatistics,
        scratch: &mut Scratch,
        num_unseen: &mut usize,
    ) -> MlDataResult<()> {
        let indexer = column.indexer()?;
        let pairs = &mut scratch.pairs;
        let excluded = &mut scratch.excluded;
        pairs.clear();
        excluded.clear();

        for (pos, (key, value)) in items.iter().enumerate() {
            let index = self.index_category(thread_idx, column, indexer, key, num_unseen)?;
            let x = match value {
                Value::Undefined => {
                    // Imputed values never feed back into the statistics.
                    excluded.push(pos);
                    self.resolve_missing(column_idx, column, index as usize)?
                },
                v => v.as_numeric().ok_or_else(|| {
                    mldata_err!(
                        SchemaMismatch: "dictionary column '{}' has a {} value", column.name(), v.type_name()
                    )
                })?,
            };
            pairs.push((index, x));
        }

        if self.options.track_statistics {
            match excluded.as_slice() {
                [] => partial.update_dict_statistics(pairs),
                &[skip] => {
                    let stat_pairs = &mut scratch.stat_pairs;
                    stat_pairs.clear();
                    stat_pairs.extend_from_slice(&pairs[..skip]);
                    stat_pairs.extend_from_slice(&pairs[skip + 1..]);
                    partial.update_dict_statistics(stat_pairs);
                },
                excluded => {
                    let stat_pairs = &mut scratch.stat_pairs;
                    stat_pairs.clear();
                    stat_pairs.extend(
                        pairs
                            .iter()
                            .enumerate()
                            .filter(|(pos, _)| excluded.binary_search(pos).is_err())
                            .map(|(_, pair)| *pair),
                    );
                    partial.update_dict_statistics(stat_pairs);
                },
            }
        }

        pairs.sort_by_key(|&(index, _)| index);
        writer.write_size(pairs.len());
        pairs
            .iter()
            .for_each(|&(index, x)| writer.write_index_value_pair(index, x));
        Ok(())
    }
}

fn vector_payload<'v>(column: &ColumnMetadata, value: &'v Value) -> MlDataResult<&'v [f64]> {
    let values = match (column.mode(), value) {
        (ColumnMode::NumericVector, Value::Vector(values)) => values.as_slice(),
        (ColumnMode::NumericNdVector, Value::NdVector(nd)) => {
            mldata_ensure!(
                Some(nd.shape()) == column.nd_shape(),
                SchemaMismatch: "column '{}' expects shape {:?}, got {:?}", column.name(), column.nd_shape(), nd.shape()
            );
            nd.data()
        },
        (mode, v) => mldata_bail!(
            SchemaMismatch: "{} column '{}' cannot hold a {} value", mode.name(), column.name(), v.type_name()
        ),
    };
    mldata_ensure!(
        values.len() == column.width(),
        SchemaMismatch: "column '{}' expects {} values, got {}", column.name(), column.width(), values.len()
    );
    Ok(values)
}
