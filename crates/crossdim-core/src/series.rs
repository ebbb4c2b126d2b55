//! # Series and Buckets
//!
//! The live aggregate state of a dimension.
//!
//! A `Series` groups every included record sharing a series key. Inside it,
//! each `Bucket` accumulates the records sharing a bucket key. Buckets keep the
//! order in which their keys first appeared.

use crate::types::Key;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// BUCKET
// =============================================================================

/// The finest aggregation unit: one accumulator plus a contribution counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket<B> {
    /// Bucket key within its series.
    pub key: Key,
    /// Number of included records currently contributing.
    pub count: usize,
    /// Caller-defined accumulator.
    pub value: B,
    /// Optional presentation color, assigned on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl<B> Bucket<B> {
    pub(crate) fn new(key: Key, value: B, color: Option<String>) -> Self {
        Self {
            key,
            count: 0,
            value,
            color,
        }
    }
}

// =============================================================================
// ROLLUP STATISTICS
// =============================================================================

/// Min, max, sum and mean of one projection over a series' emitted buckets.
///
/// An empty series rolls up to all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RollupStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
}

impl RollupStats {
    /// Fold a sequence of projected values.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut n = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for v in values {
            n += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }

        if n == 0 {
            return Self::default();
        }

        Self {
            min,
            max,
            sum,
            mean: sum / n as f64,
        }
    }
}

// =============================================================================
// SERIES
// =============================================================================

/// All buckets for one series key.
#[derive(Debug, Clone)]
pub struct Series<B> {
    pub(crate) key: Key,
    pub(crate) count: usize,
    pub(crate) visible: bool,
    pub(crate) color: Option<String>,
    pub(crate) rollups: BTreeMap<String, RollupStats>,
    pub(crate) buckets: IndexMap<Key, Bucket<B>>,
}

impl<B> Series<B> {
    pub(crate) fn new<'a>(
        key: Key,
        color: Option<String>,
        rollup_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            key,
            count: 0,
            visible: true,
            color,
            rollups: rollup_names
                .into_iter()
                .map(|name| (name.to_string(), RollupStats::default()))
                .collect(),
            buckets: IndexMap::new(),
        }
    }

    /// Drop every bucket and zero the count, keeping key and color.
    pub(crate) fn reset(&mut self) {
        self.count = 0;
        self.visible = false;
        self.buckets.clear();
        for stats in self.rollups.values_mut() {
            *stats = RollupStats::default();
        }
    }

    /// The series key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Number of included records in this series.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// `false` once every record of the series has been filtered out.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Rollup statistics by projection name, as of the last post-process.
    #[must_use]
    pub fn rollups(&self) -> &BTreeMap<String, RollupStats> {
        &self.rollups
    }

    #[must_use]
    pub fn rollup(&self, name: &str) -> Option<&RollupStats> {
        self.rollups.get(name)
    }

    /// O(1) bucket lookup.
    #[must_use]
    pub fn bucket(&self, key: &str) -> Option<&Bucket<B>> {
        self.buckets.get(key)
    }

    /// Buckets in first-occurrence order, including zero-count ones kept
    /// when empty buckets are not hidden.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket<B>> {
        self.buckets.values()
    }

    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_of_nothing_is_zero() {
        assert_eq!(RollupStats::from_values([]), RollupStats::default());
    }

    #[test]
    fn rollup_folds_values() {
        let stats = RollupStats::from_values([1.0, 2.0, 3.0]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.sum, 6.0);
        assert_eq!(stats.mean, 2.0);
    }

    #[test]
    fn new_series_starts_with_default_rollups() {
        let series: Series<i64> = Series::new(Key::from("A"), None, ["y"]);
        assert_eq!(series.count(), 0);
        assert_eq!(series.rollup("y"), Some(&RollupStats::default()));
        assert!(series.rollup("x").is_none());
    }

    #[test]
    fn reset_clears_buckets_and_hides() {
        let mut series: Series<i64> = Series::new(Key::from("A"), Some("red".into()), ["y"]);
        let mut bucket = Bucket::new(Key::from("1"), 5, None);
        bucket.count = 1;
        series.buckets.insert(Key::from("1"), bucket);
        series.count = 1;

        series.reset();

        assert_eq!(series.bucket_count(), 0);
        assert_eq!(series.count(), 0);
        assert!(!series.is_visible());
        assert_eq!(series.color(), Some("red"));
    }
}
