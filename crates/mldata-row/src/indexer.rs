use mldata_utils::aliases::{InitHashMaps, MlIndexSet};
use parking_lot::RwLock;

use crate::value::CategoryValue;

/// Index returned by a frozen indexer for values it has never seen.
pub const UNKNOWN_INDEX: u64 = u64::MAX;

/// Maps raw categorical values to dense integer indices.
///
/// Implementations are shared between worker threads. Insertion in
/// [`map_value_to_index`](CategoricalIndexer::map_value_to_index) must be
/// internally synchronized or keep thread-local state keyed by `thread_idx`.
pub trait CategoricalIndexer: Send + Sync {
    /// Returns the index of `value`, assigning the next free index if the
    /// value is new.
    fn map_value_to_index(&self, thread_idx: usize, value: &CategoryValue) -> u64;

    /// Returns the index of `value`, or [`UNKNOWN_INDEX`] if the value is new.
    fn immutable_map_value_to_index(&self, value: &CategoryValue) -> u64;

    fn map_index_to_value(&self, index: u64) -> Option<CategoryValue>;

    /// Number of distinct values indexed so far.
    fn indexed_column_size(&self) -> usize;
}

/// Insertion-ordered indexer: the n-th distinct value receives index n.
#[derive(Default)]
pub struct ColumnIndexer {
    values: RwLock<MlIndexSet<CategoryValue>>,
}

impl ColumnIndexer {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(MlIndexSet::new()),
        }
    }

    /// Builds an indexer that assigns indices in the order of `values`.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<CategoryValue>,
    {
        let mut set = MlIndexSet::new();
        set.extend(values.into_iter().map(Into::into));
        Self {
            values: RwLock::new(set),
        }
    }
}

impl CategoricalIndexer for ColumnIndexer {
    fn map_value_to_index(&self, _thread_idx: usize, value: &CategoryValue) -> u64 {
        if let Some(idx) = self.values.read().get_index_of(value) {
            return idx as u64;
        }
        // Another thread may have inserted the value in between; insert_full
        // returns the existing index in that case.
        self.values.write().insert_full(value.clone()).0 as u64
    }

    fn immutable_map_value_to_index(&self, value: &CategoryValue) -> u64 {
        self.values
            .read()
            .get_index_of(value)
            .map_or(UNKNOWN_INDEX, |idx| idx as u64)
    }

    fn map_index_to_value(&self, index: u64) -> Option<CategoryValue> {
        let index = usize::try_from(index).ok()?;
        self.values.read().get_index(index).cloned()
    }

    fn indexed_column_size(&self) -> usize {
        self.values.read().len()
    }
}

/// Builds the old → new index table that moves blocks compiled under `old`
/// onto the numbering of `new`.
///
/// Values `new` does not know map to [`UNKNOWN_INDEX`].
pub fn index_remapping(old: &dyn CategoricalIndexer, new: &dyn CategoricalIndexer) -> Vec<u64> {
    (0..old.indexed_column_size() as u64)
        .map(|idx| {
            old.map_index_to_value(idx)
                .map_or(UNKNOWN_INDEX, |v| new.immutable_map_value_to_index(&v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rayon::prelude::*;

    use super::*;

    #[test]
    fn test_mutable_and_frozen() {
        let indexer = ColumnIndexer::new();
        assert_eq!(indexer.map_value_to_index(0, &"b".into()), 0);
        assert_eq!(indexer.map_value_to_index(0, &"a".into()), 1);
        assert_eq!(indexer.map_value_to_index(1, &"b".into()), 0);
        assert_eq!(indexer.map_value_to_index(0, &CategoryValue::Undefined), 2);

        assert_eq!(indexer.immutable_map_value_to_index(&"a".into()), 1);
        assert_eq!(indexer.immutable_map_value_to_index(&"z".into()), UNKNOWN_INDEX);
        assert_eq!(indexer.indexed_column_size(), 3);

        assert_eq!(indexer.map_index_to_value(0), Some("b".into()));
        assert_eq!(indexer.map_index_to_value(3), None);
        assert_eq!(indexer.map_index_to_value(UNKNOWN_INDEX), None);
    }

    #[test]
    fn test_concurrent_insertion_is_dense() {
        let indexer = Arc::new(ColumnIndexer::new());
        (0..8usize).into_par_iter().for_each(|thread_idx| {
            for i in 0..100i64 {
                indexer.map_value_to_index(thread_idx, &CategoryValue::Integer(i % 37));
            }
        });
        assert_eq!(indexer.indexed_column_size(), 37);
        let mut seen: Vec<u64> = (0..37)
            .map(|i| indexer.immutable_map_value_to_index(&CategoryValue::Integer(i)))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..37).collect::<Vec<u64>>());
    }

    #[test]
    fn test_index_remapping() {
        let old = ColumnIndexer::from_values(["a", "b", "c"]);
        let new = ColumnIndexer::from_values(["c", "a"]);
        assert_eq!(index_remapping(&old, &new), vec![1, UNKNOWN_INDEX, 0]);
    }
}
