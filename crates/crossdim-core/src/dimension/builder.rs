//! # Dimension Builder
//!
//! The construction-time configuration surface of a [`Dimension`].
//!
//! Required: `id`, `series_key`, `bucket_key` and the reducer triple
//! (`init_bucket`, `add_to_bucket`, `remove_from_bucket`, or all three at once
//! through `reducer`). `build` fails with `CrossdimError::MissingOption`
//! before any record is processed if one is absent.

use super::Dimension;
use crate::filters::{self, FilterFactory, FilterKey, FilterKeyFn};
use crate::series::Bucket;
use crate::snapshot::SeriesSnapshot;
use crate::types::{CrossdimError, Key, KeyFn, Predicate};
use std::cmp::Ordering;
use std::sync::Arc;

// =============================================================================
// CALLBACK ALIASES
// =============================================================================

/// Creates a bucket accumulator from its first record.
pub type InitFn<R, B> = Arc<dyn Fn(&R) -> B + Send + Sync>;

/// Folds a record into (or out of) an accumulator.
pub type ReduceFn<R, B> = Arc<dyn Fn(&mut B, &R) + Send + Sync>;

/// Fans one input record out into logical records.
pub type SplitFn<R> = Arc<dyn Fn(&R) -> Vec<R> + Send + Sync>;

/// Orders emitted buckets.
pub type BucketOrder<B> = Arc<dyn Fn(&Bucket<B>, &Bucket<B>) -> Ordering + Send + Sync>;

/// Projects an accumulator to a number for rollups.
pub type Projection<B> = Arc<dyn Fn(&B) -> f64 + Send + Sync>;

/// Final transform over the emitted series.
pub type PostProcessFn<B> =
    Arc<dyn Fn(Vec<SeriesSnapshot<B>>) -> Vec<SeriesSnapshot<B>> + Send + Sync>;

pub type SeriesColorFn = Arc<dyn Fn(&Key) -> String + Send + Sync>;
pub type BucketColorFn<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

/// Validated callbacks held by a dimension.
pub(crate) struct Callbacks<R, B> {
    pub(crate) series_key: KeyFn<R>,
    pub(crate) bucket_key: KeyFn<R>,
    pub(crate) init_bucket: InitFn<R, B>,
    pub(crate) add_to_bucket: ReduceFn<R, B>,
    pub(crate) remove_from_bucket: ReduceFn<R, B>,
    pub(crate) split: Option<SplitFn<R>>,
    pub(crate) filter_key: FilterKeyFn<R>,
    pub(crate) filter_factory: FilterFactory<R>,
    pub(crate) order: Option<BucketOrder<B>>,
    pub(crate) rollups: Vec<(String, Projection<B>)>,
    pub(crate) post_process: Option<PostProcessFn<B>>,
    pub(crate) series_color: Option<SeriesColorFn>,
    pub(crate) bucket_color: Option<BucketColorFn<R>>,
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builder for [`Dimension`]. Obtain one with [`Dimension::builder`].
pub struct DimensionBuilder<R, B> {
    id: Option<Key>,
    name: Option<String>,
    series_key: Option<KeyFn<R>>,
    bucket_key: Option<KeyFn<R>>,
    init_bucket: Option<InitFn<R, B>>,
    add_to_bucket: Option<ReduceFn<R, B>>,
    remove_from_bucket: Option<ReduceFn<R, B>>,
    split: Option<SplitFn<R>>,
    filter_key: Option<FilterKeyFn<R>>,
    filter_factory: Option<FilterFactory<R>>,
    hide_empty_buckets: bool,
    reprocess_all_on_filter: bool,
    order: Option<BucketOrder<B>>,
    rollups: Vec<(String, Projection<B>)>,
    post_process: Option<PostProcessFn<B>>,
    series_color: Option<SeriesColorFn>,
    bucket_color: Option<BucketColorFn<R>>,
    selection: Vec<Key>,
    data: Vec<R>,
}

impl<R, B> Default for DimensionBuilder<R, B> {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            series_key: None,
            bucket_key: None,
            init_bucket: None,
            add_to_bucket: None,
            remove_from_bucket: None,
            split: None,
            filter_key: None,
            filter_factory: None,
            hide_empty_buckets: true,
            reprocess_all_on_filter: false,
            order: None,
            rollups: Vec::new(),
            post_process: None,
            series_color: None,
            bucket_color: None,
            selection: Vec::new(),
            data: Vec::new(),
        }
    }
}

impl<R: Clone + 'static, B: Clone + 'static> DimensionBuilder<R, B> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique id; also the id of the filter this dimension broadcasts.
    #[must_use]
    pub fn id(mut self, id: impl Into<Key>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Display name. Defaults to the id.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// How records are grouped into series.
    #[must_use]
    pub fn series_key(mut self, f: impl Fn(&R) -> Key + Send + Sync + 'static) -> Self {
        self.series_key = Some(Arc::new(f));
        self
    }

    /// How records are grouped into buckets within a series.
    #[must_use]
    pub fn bucket_key(mut self, f: impl Fn(&R) -> Key + Send + Sync + 'static) -> Self {
        self.bucket_key = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn init_bucket(mut self, f: impl Fn(&R) -> B + Send + Sync + 'static) -> Self {
        self.init_bucket = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn add_to_bucket(mut self, f: impl Fn(&mut B, &R) + Send + Sync + 'static) -> Self {
        self.add_to_bucket = Some(Arc::new(f));
        self
    }

    /// Must exactly undo `add_to_bucket` unless `reprocess_all_on_filter` is set.
    #[must_use]
    pub fn remove_from_bucket(mut self, f: impl Fn(&mut B, &R) + Send + Sync + 'static) -> Self {
        self.remove_from_bucket = Some(Arc::new(f));
        self
    }

    /// Set the whole reducer triple at once.
    #[must_use]
    pub fn reducer(
        self,
        init: impl Fn(&R) -> B + Send + Sync + 'static,
        add: impl Fn(&mut B, &R) + Send + Sync + 'static,
        remove: impl Fn(&mut B, &R) + Send + Sync + 'static,
    ) -> Self {
        self.init_bucket(init)
            .add_to_bucket(add)
            .remove_from_bucket(remove)
    }

    /// Fan each input record out into zero or more logical records.
    #[must_use]
    pub fn split(mut self, f: impl Fn(&R) -> Vec<R> + Send + Sync + 'static) -> Self {
        self.split = Some(Arc::new(f));
        self
    }

    /// What the selection is compared against. Defaults to the series key.
    #[must_use]
    pub fn filter_predicate(mut self, f: impl Fn(&R) -> FilterKey + Send + Sync + 'static) -> Self {
        self.filter_key = Some(Arc::new(f));
        self
    }

    /// How a selection becomes a predicate.
    /// Defaults to [`filters::any_selection_matches_value`].
    #[must_use]
    pub fn filter_factory(
        mut self,
        f: impl Fn(&[Key], FilterKeyFn<R>) -> Predicate<R> + Send + Sync + 'static,
    ) -> Self {
        self.filter_factory = Some(Arc::new(f));
        self
    }

    /// Prune buckets whose count drops to zero. Default `true`.
    #[must_use]
    pub fn hide_empty_buckets(mut self, hide: bool) -> Self {
        self.hide_empty_buckets = hide;
        self
    }

    /// Rebuild every series from scratch on each filter change.
    /// Needed when the reducer cannot be inverted (max, latest, distinct).
    #[must_use]
    pub fn reprocess_all_on_filter(mut self, enabled: bool) -> Self {
        self.reprocess_all_on_filter = enabled;
        self
    }

    /// Order emitted buckets by a derived key.
    #[must_use]
    pub fn sort_key<K: Ord + 'static>(mut self, f: impl Fn(&Bucket<B>) -> K + Send + Sync + 'static) -> Self {
        self.order = Some(Arc::new(move |a: &Bucket<B>, b: &Bucket<B>| f(a).cmp(&f(b))));
        self
    }

    /// Order emitted buckets with a comparator. Replaces any `sort_key`.
    #[must_use]
    pub fn sort_fn(
        mut self,
        f: impl Fn(&Bucket<B>, &Bucket<B>) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.order = Some(Arc::new(f));
        self
    }

    /// Compute min/max/sum/mean of `projection` per series under `name`.
    #[must_use]
    pub fn rollup(
        mut self,
        name: impl Into<String>,
        projection: impl Fn(&B) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.rollups.push((name.into(), Arc::new(projection)));
        self
    }

    #[must_use]
    pub fn post_process(
        mut self,
        f: impl Fn(Vec<SeriesSnapshot<B>>) -> Vec<SeriesSnapshot<B>> + Send + Sync + 'static,
    ) -> Self {
        self.post_process = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn series_color(mut self, f: impl Fn(&Key) -> String + Send + Sync + 'static) -> Self {
        self.series_color = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn bucket_color(mut self, f: impl Fn(&R) -> String + Send + Sync + 'static) -> Self {
        self.bucket_color = Some(Arc::new(f));
        self
    }

    /// Initial selection.
    #[must_use]
    pub fn selection<I, K>(mut self, selection: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.selection = selection.into_iter().map(Into::into).collect();
        self
    }

    /// Records ingested as one batch once the dimension is built.
    #[must_use]
    pub fn data(mut self, records: impl IntoIterator<Item = R>) -> Self {
        self.data.extend(records);
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<Dimension<R, B>, CrossdimError> {
        let id = self.id.ok_or(CrossdimError::MissingOption("id"))?;
        let series_key = self
            .series_key
            .ok_or(CrossdimError::MissingOption("series_key"))?;
        let bucket_key = self
            .bucket_key
            .ok_or(CrossdimError::MissingOption("bucket_key"))?;
        let init_bucket = self
            .init_bucket
            .ok_or(CrossdimError::MissingOption("init_bucket"))?;
        let add_to_bucket = self
            .add_to_bucket
            .ok_or(CrossdimError::MissingOption("add_to_bucket"))?;
        let remove_from_bucket = self
            .remove_from_bucket
            .ok_or(CrossdimError::MissingOption("remove_from_bucket"))?;

        let filter_key = self.filter_key.unwrap_or_else(|| {
            let key_of = Arc::clone(&series_key);
            let by_series: FilterKeyFn<R> =
                Arc::new(move |record: &R| FilterKey::One(key_of(record)));
            by_series
        });
        let filter_factory = self
            .filter_factory
            .unwrap_or_else(filters::default_factory::<R>);

        let callbacks = Callbacks {
            series_key,
            bucket_key,
            init_bucket,
            add_to_bucket,
            remove_from_bucket,
            split: self.split,
            filter_key,
            filter_factory,
            order: self.order,
            rollups: self.rollups,
            post_process: self.post_process,
            series_color: self.series_color,
            bucket_color: self.bucket_color,
        };

        let name = self.name.unwrap_or_else(|| id.to_string());
        let mut dimension = Dimension::from_parts(
            id,
            name,
            callbacks,
            self.hide_empty_buckets,
            self.reprocess_all_on_filter,
            self.selection,
        );

        if !self.data.is_empty() {
            dimension.add_many(self.data);
        }

        Ok(dimension)
    }
}

// =============================================================================
// TESTS
// =============================================================================
