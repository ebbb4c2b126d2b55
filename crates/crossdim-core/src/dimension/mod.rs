//! # Dimension
//!
//! One grouping of the record stream into series of reduced buckets.
//!
//! A dimension owns:
//! - every ingested record (`raw`, before splitting)
//! - the post-split stream, partitioned into `included` and `excluded` under
//!   the conjunction of applied filters, each kept in arrival order
//! - the live series/bucket aggregates over `included`
//! - the post-processed output handed to consumers
//!
//! ## Invariants
//!
//! - `included.len() + excluded.len()` equals the post-split stream length
//! - the series counts sum to `included.len()`
//! - after every mutation batch no bucket holds a zero count unless
//!   `hide_empty_buckets` is off
//! - every mutation batch ends with exactly one post-process and one
//!   `Change` event
//!
//! Filter management and selection live in `filtering.rs`.

mod builder;
mod filtering;
mod partition;

pub use builder::{
    BucketColorFn, BucketOrder, DimensionBuilder, InitFn, PostProcessFn, Projection, ReduceFn,
    SeriesColorFn, SplitFn,
};

use crate::events::{DimensionEvent, EventBus, EventKind, SubscriptionId};
use crate::series::{Bucket, RollupStats, Series};
use crate::snapshot::{DimensionSnapshot, SeriesSnapshot};
use crate::types::{CrossdimError, Filter, Key, Predicate};
use builder::Callbacks;
use indexmap::IndexMap;
use partition::Partition;
use std::fmt;

/// Events a dimension emits.
const DIMENSION_EVENTS: &[EventKind] = &[EventKind::Selection, EventKind::Change];

/// A grouping of records into series of aggregated buckets, filterable by
/// the selections of its peers.
pub struct Dimension<R, B> {
    id: Key,
    name: String,
    callbacks: Callbacks<R, B>,
    hide_empty_buckets: bool,
    reprocess_all_on_filter: bool,

    raw: Vec<R>,
    next_seq: u64,
    included: Partition<R>,
    excluded: Partition<R>,

    series: IndexMap<Key, Series<B>>,
    output: Vec<SeriesSnapshot<B>>,

    selection: Vec<Key>,
    own_filter: Filter<R>,
    applied: IndexMap<Key, Predicate<R>>,

    events: EventBus<DimensionEvent<R>>,
}

impl<R: Clone + 'static, B: Clone + 'static> Dimension<R, B> {
    /// Start configuring a dimension.
    #[must_use]
    pub fn builder() -> DimensionBuilder<R, B> {
        DimensionBuilder::new()
    }

    pub(crate) fn from_parts(
        id: Key,
        name: String,
        callbacks: Callbacks<R, B>,
        hide_empty_buckets: bool,
        reprocess_all_on_filter: bool,
        selection: Vec<Key>,
    ) -> Self {
        let mut dimension = Self {
            own_filter: Filter::cleared(id.clone()),
            id,
            name,
            callbacks,
            hide_empty_buckets,
            reprocess_all_on_filter,
            raw: Vec::new(),
            next_seq: 0,
            included: Partition::default(),
            excluded: Partition::default(),
            series: IndexMap::new(),
            output: Vec::new(),
            selection,
            applied: IndexMap::new(),
            events: EventBus::new("Dimension", DIMENSION_EVENTS),
        };
        dimension.own_filter = dimension.derive_own_filter();
        dimension
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    #[must_use]
    pub fn id(&self) -> &Key {
        &self.id
    }

    /// Display name; the id unless one was configured.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Add a batch of records. One post-process and one `Change` event for
    /// the whole batch.
    pub fn add_many(&mut self, records: impl IntoIterator<Item = R>) {
        let before = self.raw.len();
        for record in records {
            self.ingest(record);
        }

        tracing::debug!(
            dimension = %self.id,
            added = self.raw.len() - before,
            included = self.included.len(),
            excluded = self.excluded.len(),
            "records ingested"
        );

        self.post_process();
    }

    /// Add a single record.
    pub fn add_one(&mut self, record: R) {
        self.ingest(record);
        self.post_process();
    }

    /// Throw away every aggregate and partition, then re-ingest the raw
    /// records under the filters currently applied.
    pub fn refresh(&mut self) {
        let raw = std::mem::take(&mut self.raw);
        self.series.clear();
        self.included.clear();
        self.excluded.clear();
        self.next_seq = 0;

        tracing::debug!(dimension = %self.id, records = raw.len(), "refreshing");
        self.add_many(raw);
    }

    fn ingest(&mut self, record: R) {
        let logical = match &self.callbacks.split {
            Some(split) => split(&record),
            None => vec![record.clone()],
        };
        self.raw.push(record);

        for record in logical {
            let seq = self.next_seq;
            self.next_seq += 1;
            if self.passes_applied(&record) {
                self.apply_addition(&record);
                self.included.push(seq, record);
            } else {
                self.excluded.push(seq, record);
            }
        }
    }

    /// AND across every applied filter. No filters means included.
    pub(crate) fn passes_applied(&self, record: &R) -> bool {
        self.applied.values().all(|predicate| predicate(record))
    }

    // =========================================================================
    // INCREMENTAL AGGREGATION
    // =========================================================================

    /// Fold an included record into its series and bucket, creating either
    /// on first sight.
    pub(crate) fn apply_addition(&mut self, record: &R) {
        let series_key = (self.callbacks.series_key)(record);
        let bucket_key = (self.callbacks.bucket_key)(record);

        let callbacks = &self.callbacks;
        let series = self.series.entry(series_key).or_insert_with_key(|key| {
            let color = callbacks.series_color.as_ref().map(|color| color(key));
            Series::new(
                key.clone(),
                color,
                callbacks.rollups.iter().map(|(name, _)| name.as_str()),
            )
        });

        let bucket = series.buckets.entry(bucket_key).or_insert_with_key(|key| {
            let color = callbacks.bucket_color.as_ref().map(|color| color(record));
            Bucket::new(key.clone(), (callbacks.init_bucket)(record), color)
        });

        bucket.count += 1;
        (callbacks.add_to_bucket)(&mut bucket.value, record);

        series.count += 1;
        series.visible = true;
    }

    /// Take an included record back out of its bucket. Emptied buckets stay
    /// until `post_process` prunes them.
    ///
    /// # Panics
    ///
    /// If the record's series or bucket has no contribution to remove. Only
    /// records previously passed to `apply_addition` may be removed.
    #[allow(clippy::panic)]
    pub(crate) fn apply_removal(&mut self, record: &R) {
        let series_key = (self.callbacks.series_key)(record);
        let bucket_key = (self.callbacks.bucket_key)(record);

        let Some(series) = self.series.get_mut(&series_key) else {
            panic!(
                "dimension '{}': removal from unknown series '{}'",
                self.id, series_key
            );
        };
        let bucket = match series.buckets.get_mut(&bucket_key) {
            Some(bucket) if bucket.count > 0 => bucket,
            _ => panic!(
                "dimension '{}': removal from empty or unknown bucket '{}' in series '{}'",
                self.id, bucket_key, series_key
            ),
        };

        bucket.count -= 1;
        (self.callbacks.remove_from_bucket)(&mut bucket.value, record);

        series.count -= 1;
        if series.count == 0 {
            series.visible = false;
        }
    }

    /// Discard every bucket and re-add the included records from scratch,
    /// in arrival order.
    pub(crate) fn rebuild(&mut self) {
        for series in self.series.values_mut() {
            series.reset();
        }

        let included = std::mem::take(&mut self.included);
        for record in included.as_slice() {
            self.apply_addition(record);
        }
        self.included = included;
    }

    // =========================================================================
    // POST-PROCESSING
    // =========================================================================

    /// Settle the output after a mutation batch and fire `Change`.
    pub(crate) fn post_process(&mut self) {
        let hide = self.hide_empty_buckets;
        let callbacks = &self.callbacks;
        let mut output = Vec::with_capacity(self.series.len());

        for series in self.series.values_mut() {
            if hide {
                series.buckets.retain(|_, bucket| bucket.count > 0);
            }
            let mut buckets: Vec<Bucket<B>> = series.buckets.values().cloned().collect();

            // Stable: equal buckets keep first-occurrence order.
            if let Some(order) = &callbacks.order {
                buckets.sort_by(|a, b| order(a, b));
            }

            for (name, projection) in &callbacks.rollups {
                let stats =
                    RollupStats::from_values(buckets.iter().map(|bucket| projection(&bucket.value)));
                series.rollups.insert(name.clone(), stats);
            }

            output.push(SeriesSnapshot::from_series(series, buckets));
        }

        if let Some(hook) = &callbacks.post_process {
            output = hook(output);
        }

        self.output = output;
        self.events.emit(&DimensionEvent::Change);
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Post-processed series, as of the last mutation batch.
    #[must_use]
    pub fn data(&self) -> &[SeriesSnapshot<B>] {
        &self.output
    }

    /// O(1) live series lookup.
    #[must_use]
    pub fn series(&self, key: &str) -> Option<&Series<B>> {
        self.series.get(key)
    }

    /// O(1) live bucket lookup.
    #[must_use]
    pub fn bucket(&self, series: &str, bucket: &str) -> Option<&Bucket<B>> {
        self.series.get(series).and_then(|s| s.bucket(bucket))
    }

    /// Live series in first-occurrence order.
    pub fn all_series(&self) -> impl Iterator<Item = &Series<B>> {
        self.series.values()
    }

    #[must_use]
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Post-split records passing every applied filter.
    #[must_use]
    pub fn included(&self) -> &[R] {
        self.included.as_slice()
    }

    /// Post-split records rejected by at least one applied filter.
    #[must_use]
    pub fn excluded(&self) -> &[R] {
        self.excluded.as_slice()
    }

    #[must_use]
    pub fn included_count(&self) -> usize {
        self.included.len()
    }

    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    /// Records ingested, before splitting.
    #[must_use]
    pub fn raw_count(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub fn hides_empty_buckets(&self) -> bool {
        self.hide_empty_buckets
    }

    #[must_use]
    pub fn reprocesses_all_on_filter(&self) -> bool {
        self.reprocess_all_on_filter
    }

    /// Owned view for consumers.
    #[must_use]
    pub fn snapshot(&self) -> DimensionSnapshot<B> {
        DimensionSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            selection: self.selection.clone(),
            series: self.output.clone(),
        }
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Subscribe to `Selection` or `Change`.
    pub fn on(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&DimensionEvent<R>) + Send + 'static,
    ) -> Result<SubscriptionId, CrossdimError> {
        self.events.subscribe(kind, Box::new(handler))
    }

    /// Subscribe by event name (`"selection"` or `"change"`).
    pub fn on_named(
        &mut self,
        event: &str,
        handler: impl FnMut(&DimensionEvent<R>) + Send + 'static,
    ) -> Result<SubscriptionId, CrossdimError> {
        let kind = event.parse()?;
        self.on(kind, handler)
    }

    /// Unsubscribe. Returns `false` if the id was not subscribed here.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl<R, B> fmt::Debug for Dimension<R, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dimension")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("raw", &self.raw.len())
            .field("included", &self.included.len())
            .field("excluded", &self.excluded.len())
            .field("series", &self.series.len())
            .field("selection", &self.selection)
            .field("applied", &self.applied.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
