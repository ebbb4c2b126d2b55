//! # Snapshots
//!
//! Owned, serializable views of dimension output.
//!
//! A dimension rebuilds its `SeriesSnapshot` list once per mutation batch;
//! the manager bundles one `DimensionSnapshot` per registered dimension into a
//! `ManagerSnapshot` keyed by dimension id.

use crate::series::{Bucket, RollupStats, Series};
use crate::types::Key;
use serde::Serialize;
use std::collections::BTreeMap;

/// Post-processed output of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot<B> {
    pub name: Key,
    pub count: usize,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rollups: BTreeMap<String, RollupStats>,
    /// Emitted buckets: empty ones hidden and sort applied as configured.
    pub buckets: Vec<Bucket<B>>,
}

impl<B> SeriesSnapshot<B> {
    pub(crate) fn from_series(series: &Series<B>, buckets: Vec<Bucket<B>>) -> Self {
        Self {
            name: series.key.clone(),
            count: series.count,
            visible: series.visible,
            color: series.color.clone(),
            rollups: series.rollups.clone(),
            buckets,
        }
    }

    /// Linear lookup of an emitted bucket.
    #[must_use]
    pub fn bucket(&self, key: &str) -> Option<&Bucket<B>> {
        self.buckets.iter().find(|b| b.key.as_str() == key)
    }
}

/// Everything a consumer needs to render one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSnapshot<B> {
    pub id: Key,
    pub name: String,
    pub selection: Vec<Key>,
    pub series: Vec<SeriesSnapshot<B>>,
}

impl<B> DimensionSnapshot<B> {
    #[must_use]
    pub fn series(&self, name: &str) -> Option<&SeriesSnapshot<B>> {
        self.series.iter().find(|s| s.name.as_str() == name)
    }
}

/// Consolidated view of every dimension a manager owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ManagerSnapshot<B> {
    dimensions: BTreeMap<Key, DimensionSnapshot<B>>,
}

impl<B> ManagerSnapshot<B> {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DimensionSnapshot<B>> {
        self.dimensions.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Dimensions ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &DimensionSnapshot<B>> {
        self.dimensions.values()
    }
}

impl<B> FromIterator<DimensionSnapshot<B>> for ManagerSnapshot<B> {
    fn from_iter<I: IntoIterator<Item = DimensionSnapshot<B>>>(iter: I) -> Self {
        Self {
            dimensions: iter.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }
}
