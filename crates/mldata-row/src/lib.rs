//! Compact row storage for machine-learning data.
//!
//! Typed columns are compiled into blocks of densely packed rows that can be
//! iterated quickly, compiled in parallel, re-indexed after the category
//! numbering changes and persisted bit-exactly.
//!
//! ## Overview
//!
//! A row is a sequence of 8-byte cells ([`EntryValue`]) made by concatenating
//! what each column writes. Cells carry no type tag: the [`RowMetadata`]
//! decides by position whether a cell holds an index or a double.
//!
//! | mode                 | cells per row                               |
//! |----------------------|---------------------------------------------|
//! | `Numeric`            | one double                                  |
//! | `Categorical`        | one index                                   |
//! | `NumericVector`      | `width` doubles                             |
//! | `NumericNdVector`    | `width` doubles, shape in the metadata      |
//! | `CategoricalVector`  | length, then that many sorted indices       |
//! | `Dictionary`         | length, then that many `(index, double)` pairs sorted by index |
//! | `Untranslated`       | none                                        |
//! | `CategoricalSorted`  | none (reserved)                             |
//!
//! If any column is a categorical vector or a dictionary, rows vary in size
//! and every row starts with a size cell counting all of its cells, the size
//! cell included. Otherwise rows have a constant size and no prefix.
//!
//! A numeric column with value `1.5` followed by a categorical vector
//! `["b", "a", "b"]` under the indexing `a → 0, b → 1` encodes as
//!
//! ```text
//!   ┌──────┬──────┬──────┬──────┬──────┬──────┐
//!   │  6   │ 1.5  │  3   │  0   │  1   │  1   │
//!   └──────┴──────┴──────┴──────┴──────┴──────┘
//!    size    x     length  ───── indices ─────
//! ```
//!
//! ## Persistence
//!
//! [`RowDataBlock::save`] picks between two encodings. Blocks that contain
//! only small integers are frame-of-reference compressed as a whole; all
//! other blocks split cells into integers, integral doubles and true doubles,
//! compressing the first two and copying the last. See [`codec`].
pub mod block;
pub mod codec;
pub mod compile;
pub mod cursor;
pub mod decode;
pub mod entry;
pub mod indexer;
pub mod metadata;
pub mod statistics;
pub mod surgery;
pub mod value;

pub use block::{row_size, RowDataBlock, RowIter};
pub use codec::{ROW_BLOCK_CHECKSUM, ROW_BLOCK_VERSION};
pub use compile::{
    compile_parallel, CompileOptions, CompileSummary, CompiledShard, MissingValueAction,
    ParallelCompileOutput, RowCompiler,
};
pub use cursor::RowCursor;
pub use decode::{decode_row, translate_row, RowEntry};
pub use entry::EntryValue;
pub use indexer::{index_remapping, CategoricalIndexer, ColumnIndexer, UNKNOWN_INDEX};
pub use metadata::{ColumnMetadata, ColumnMode, RowMetadata};
pub use statistics::{ColumnStatistics, FeatureStatistics, PartialStatistics, StatisticsSink};
pub use surgery::{append_row, reindex_block, truncate_block};
pub use value::{CategoryValue, NdVector, Value};
