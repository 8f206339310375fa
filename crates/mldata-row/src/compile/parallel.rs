use std::ops::Range;

use mldata_error::{mldata_warn, MlDataResult};
use mldata_utils::config::verbose_print;
use mldata_utils::{split_offsets, POOL};
use rayon::prelude::*;

use super::{CompileOptions, CompileSummary, RowCompiler};
use crate::block::RowDataBlock;
use crate::metadata::RowMetadata;
use crate::statistics::{ColumnStatistics, PartialStatistics};
use crate::value::Value;

/// The rows of one contiguous shard, compiled by one worker.
#[derive(Debug, Clone)]
pub struct CompiledShard {
    /// Source rows covered by this shard.
    pub row_range: Range<usize>,
    pub block: RowDataBlock,
    /// Offset of every row of `row_range` inside `block`.
    pub row_offsets: Vec<usize>,
    pub summary: CompileSummary,
}

#[derive(Debug, Clone)]
pub struct ParallelCompileOutput {
    /// Shards in row order.
    pub shards: Vec<CompiledShard>,
    pub summary: CompileSummary,
}

/// Compiles all rows of `columns` on the global pool.
///
/// Rows are split into `n_threads` contiguous shards, or one per pool thread if
/// `n_threads` is zero. Each shard gets its own block and its own partial
/// statistics. Once every shard is done the partials are merged into
/// `statistics` in a single step, so the result does not depend on how the
/// shards were scheduled. Imputation during the pass reads `statistics` as
/// they were on entry.
pub fn compile_parallel(
    metadata: &RowMetadata,
    columns: &[Vec<Value>],
    statistics: &mut [ColumnStatistics],
    options: CompileOptions,
    n_threads: usize,
) -> MlDataResult<ParallelCompileOutput> {
    let (shards, partials): (Vec<CompiledShard>, Vec<Vec<PartialStatistics>>) = {
        let compiler = RowCompiler::try_new(metadata, columns, statistics, options)?;
        let n_threads = match n_threads {
            0 => POOL.current_num_threads(),
            n => n,
        };
        let offsets = split_offsets(compiler.n_rows(), n_threads);
        verbose_print(|| {
            format!(
                "compiling {} rows in {} shards",
                compiler.n_rows(),
                offsets.len()
            )
        });

        let results = POOL.install(|| {
            offsets
                .into_par_iter()
                .enumerate()
                .map(|(thread_idx, (offset, len))| {
                    let row_range = offset..offset + len;
                    let mut block = RowDataBlock::new();
                    let mut row_offsets = Vec::with_capacity(len);
                    let mut partials = compiler.new_partials();
                    let summary = compiler.compile_rows(
                        thread_idx,
                        row_range.clone(),
                        &mut block,
                        &mut row_offsets,
                        &mut partials,
                    )?;
                    let shard = CompiledShard {
                        row_range,
                        block,
                        row_offsets,
                        summary,
                    };
                    Ok((shard, partials))
                })
                .collect::<MlDataResult<Vec<_>>>()
        })?;
        results.into_iter().unzip()
    };

    if options.track_statistics {
        for (column_idx, column_statistics) in statistics.iter_mut().enumerate() {
            column_statistics.merge(partials.iter().map(|p| &p[column_idx]));
        }
    }

    let summary = shards
        .iter()
        .fold(CompileSummary::default(), |acc, shard| acc.combine(shard.summary));
    if summary.num_unseen_categories > 0 {
        mldata_warn!(
            UnseenCategoryWarning,
            "{} categorical values were not present in the index and were mapped to the unknown index",
            summary.num_unseen_categories
        );
    }
    verbose_print(|| format!("compiled rows, max row size {} cells", summary.max_row_size));

    Ok(ParallelCompileOutput { shards, summary })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::indexer::ColumnIndexer;
    use crate::metadata::ColumnMetadata;

    fn dataset(n: usize) -> (RowMetadata, Vec<Vec<Value>>) {
        let indexer = Arc::new(ColumnIndexer::from_values(["a", "b", "c", "d"]));
        let metadata = RowMetadata::try_new(vec![
            ColumnMetadata::numeric("x"),
            ColumnMetadata::categorical_vector("tags", indexer),
        ])
        .unwrap();
        let names = ["a", "b", "c", "d"];
        let x = (0..n).map(|i| Value::Float(i as f64 * 0.5)).collect();
        let tags = (0..n)
            .map(|i| Value::List((0..i % 4).map(|j| Value::from(names[(i + j) % 4])).collect()))
            .collect();
        (metadata, vec![x, tags])
    }

    #[test]
    fn test_shards_match_single_pass() {
        let (metadata, columns) = dataset(1001);

        let mut sequential_stats = ColumnStatistics::for_metadata(&metadata);
        let sequential = compile_parallel(
            &metadata,
            &columns,
            &mut sequential_stats,
            CompileOptions::default(),
            1,
        )
        .unwrap();
        assert_eq!(sequential.shards.len(), 1);

        let mut parallel_stats = ColumnStatistics::for_metadata(&metadata);
        let parallel = compile_parallel(
            &metadata,
            &columns,
            &mut parallel_stats,
            CompileOptions::default(),
            4,
        )
        .unwrap();
        assert_eq!(parallel.shards.len(), 4);
        assert_eq!(parallel.summary, sequential.summary);

        let mut concatenated = vec![];
        let mut next_row = 0;
        for shard in &parallel.shards {
            assert_eq!(shard.row_range.start, next_row);
            assert_eq!(shard.row_offsets.len(), shard.row_range.len());
            next_row = shard.row_range.end;
            concatenated.extend_from_slice(shard.block.entry_data());
        }
        assert_eq!(next_row, 1001);
        assert_eq!(concatenated, sequential.shards[0].block.entry_data());

        assert_eq!(parallel_stats[0].num_rows(), 1001);
        assert!((parallel_stats[0].mean(0) - sequential_stats[0].mean(0)).abs() < 1e-9);
        assert_eq!(parallel_stats[1].count(2), sequential_stats[1].count(2));
    }

    #[test]
    fn test_unseen_categories_are_summed() {
        let (metadata, mut columns) = dataset(10);
        columns[1] = (0..10).map(|_| Value::List(vec![Value::from("zz")])).collect();
        let mut statistics = ColumnStatistics::for_metadata(&metadata);
        let options = CompileOptions {
            immutable_indexing: true,
            track_statistics: false,
            ..Default::default()
        };
        let out = compile_parallel(&metadata, &columns, &mut statistics, options, 0).unwrap();
        assert_eq!(out.shards.len(), POOL.current_num_threads());
        assert_eq!(out.summary.num_unseen_categories, 10);
        assert_eq!(statistics[0].num_rows(), 0);
    }

    #[test]
    fn test_error_in_any_shard_fails() {
        let (metadata, mut columns) = dataset(100);
        columns[0][77] = Value::from("not a number");
        let mut statistics = ColumnStatistics::for_metadata(&metadata);
        assert!(compile_parallel(
            &metadata,
            &columns,
            &mut statistics,
            CompileOptions::default(),
            4
        )
        .is_err());
    }
}
