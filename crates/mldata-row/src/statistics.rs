//! Running column statistics.
//!
//! Compilation never mutates shared statistics. Every worker owns one
//! [`PartialStatistics`] per column and feeds it through [`StatisticsSink`];
//! once all shards are done the partials are folded into the committed
//! [`ColumnStatistics`] in a single reduction step.
use crate::indexer::UNKNOWN_INDEX;
use crate::metadata::{ColumnMode, RowMetadata};

/// Receives the values written for one column, row by row.
pub trait StatisticsSink {
    /// Observed elements of a numeric or numeric-vector row.
    fn update_numeric_statistics(&mut self, values: &[f64]);

    /// Category indices of a categorical or categorical-vector row, sorted
    /// ascending. A category repeated within the row counts once.
    fn update_categorical_statistics(&mut self, indices: &[u64]);

    /// Observed `(key index, value)` pairs of a dictionary row.
    fn update_dict_statistics(&mut self, pairs: &[(u64, f64)]);
}

/// Count, mean and sum of squared deviations of one feature, mergeable in any
/// order (Welford / Chan et al.).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureStatistics {
    count: u64,
    mean: f64,
    m2: f64,
}

impl FeatureStatistics {
    #[inline]
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn merge(&mut self, other: &FeatureStatistics) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * (self.count as f64 * other.count as f64) / count as f64;
        *self = FeatureStatistics { count, mean, m2 };
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn stdev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Accumulators {
    rows: u64,
    features: Vec<FeatureStatistics>,
}

impl Accumulators {
    #[inline]
    fn feature_mut(&mut self, idx: u64) -> &mut FeatureStatistics {
        let idx = idx as usize;
        if idx >= self.features.len() {
            self.features.resize(idx + 1, FeatureStatistics::default());
        }
        &mut self.features[idx]
    }

    fn merge(&mut self, other: &Accumulators) {
        self.rows += other.rows;
        if other.features.len() > self.features.len() {
            self.features
                .resize(other.features.len(), FeatureStatistics::default());
        }
        for (acc, feature) in self.features.iter_mut().zip(&other.features) {
            acc.merge(feature);
        }
    }
}

/// Per-thread statistics of one column for the rows of a single shard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialStatistics {
    acc: Accumulators,
}

impl PartialStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_rows(&self) -> u64 {
        self.acc.rows
    }
}

impl StatisticsSink for PartialStatistics {
    fn update_numeric_statistics(&mut self, values: &[f64]) {
        self.acc.rows += 1;
        for (i, &x) in values.iter().enumerate() {
            self.acc.feature_mut(i as u64).push(x);
        }
    }

    fn update_categorical_statistics(&mut self, indices: &[u64]) {
        self.acc.rows += 1;
        let mut prev = None;
        for &idx in indices {
            if idx != UNKNOWN_INDEX && prev != Some(idx) {
                self.acc.feature_mut(idx).push(1.0);
            }
            prev = Some(idx);
        }
    }

    fn update_dict_statistics(&mut self, pairs: &[(u64, f64)]) {
        self.acc.rows += 1;
        for &(idx, x) in pairs {
            if idx != UNKNOWN_INDEX {
                self.acc.feature_mut(idx).push(x);
            }
        }
    }
}

/// Committed statistics of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStatistics {
    mode: ColumnMode,
    acc: Accumulators,
}

impl ColumnStatistics {
    pub fn new(mode: ColumnMode) -> Self {
        Self {
            mode,
            acc: Accumulators::default(),
        }
    }

    /// Empty statistics for every column of `metadata`.
    pub fn for_metadata(metadata: &RowMetadata) -> Vec<ColumnStatistics> {
        metadata
            .columns()
            .iter()
            .map(|c| ColumnStatistics::new(c.mode()))
            .collect()
    }

    /// Folds the partial statistics of every shard into `self`.
    pub fn merge<'a, I>(&mut self, partials: I)
    where
        I: IntoIterator<Item = &'a PartialStatistics>,
    {
        for partial in partials {
            self.acc.merge(&partial.acc);
        }
    }

    pub fn mode(&self) -> ColumnMode {
        self.mode
    }

    pub fn num_rows(&self) -> u64 {
        self.acc.rows
    }

    pub fn num_features(&self) -> usize {
        self.acc.features.len()
    }

    pub fn feature(&self, feature_index: usize) -> Option<&FeatureStatistics> {
        self.acc.features.get(feature_index)
    }

    /// Number of observations of a feature: values seen for numeric features
    /// and dictionary keys, rows containing the category for categories.
    pub fn count(&self, feature_index: usize) -> u64 {
        self.feature(feature_index).map_or(0, |f| f.count())
    }

    /// Mean of a feature, used to impute missing values.
    ///
    /// For categorical modes this is the fraction of rows containing the
    /// category. Unseen features have mean zero.
    pub fn mean(&self, feature_index: usize) -> f64 {
        match self.mode {
            ColumnMode::Categorical | ColumnMode::CategoricalVector => {
                if self.acc.rows == 0 {
                    0.0
                } else {
                    self.count(feature_index) as f64 / self.acc.rows as f64
                }
            },
            _ => self.feature(feature_index).map_or(0.0, |f| f.mean()),
        }
    }

    pub fn stdev(&self, feature_index: usize) -> f64 {
        match self.mode {
            ColumnMode::Categorical | ColumnMode::CategoricalVector => {
                let p = self.mean(feature_index);
                (p * (1.0 - p)).max(0.0).sqrt()
            },
            _ => self.feature(feature_index).map_or(0.0, |f| f.stdev()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_numeric_merge_matches_sequential() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin() * 10.0).collect();

        let mut sequential = PartialStatistics::new();
        values
            .iter()
            .for_each(|x| sequential.update_numeric_statistics(&[*x]));

        let mut left = PartialStatistics::new();
        let mut right = PartialStatistics::new();
        values[..31]
            .iter()
            .for_each(|x| left.update_numeric_statistics(&[*x]));
        values[31..]
            .iter()
            .for_each(|x| right.update_numeric_statistics(&[*x]));

        let mut merged = ColumnStatistics::new(ColumnMode::Numeric);
        merged.merge([&left, &right]);
        let mut direct = ColumnStatistics::new(ColumnMode::Numeric);
        direct.merge([&sequential]);

        assert_eq!(merged.num_rows(), 100);
        assert_eq!(merged.count(0), 100);
        assert_close(merged.mean(0), direct.mean(0));
        assert_close(merged.stdev(0), direct.stdev(0));
    }

    #[test]
    fn test_categorical_frequencies() {
        let mut partial = PartialStatistics::new();
        partial.update_categorical_statistics(&[0, 2]);
        partial.update_categorical_statistics(&[2]);
        partial.update_categorical_statistics(&[UNKNOWN_INDEX]);
        partial.update_categorical_statistics(&[]);
        partial.update_categorical_statistics(&[1, 1, 1, 2]);

        let mut stats = ColumnStatistics::new(ColumnMode::CategoricalVector);
        stats.merge([&partial]);
        assert_eq!(stats.num_rows(), 5);
        assert_eq!(stats.num_features(), 3);
        assert_eq!(stats.count(1), 1);
        assert_eq!(stats.count(2), 3);
        assert_close(stats.mean(0), 0.2);
        assert_close(stats.mean(1), 0.2);
        assert_close(stats.stdev(1), 0.4);
        assert_close(stats.mean(2), 0.6);
        assert_close(stats.mean(7), 0.0);
    }

    #[test]
    fn test_dict_means() {
        let mut partial = PartialStatistics::new();
        partial.update_dict_statistics(&[(1, 2.0), (3, 4.0)]);
        partial.update_dict_statistics(&[(1, 4.0)]);

        let mut stats = ColumnStatistics::new(ColumnMode::Dictionary);
        stats.merge([&partial]);
        assert_close(stats.mean(1), 3.0);
        assert_close(stats.mean(3), 4.0);
        assert_eq!(stats.count(0), 0);
        assert_close(stats.stdev(1), 1.0);
    }
}
