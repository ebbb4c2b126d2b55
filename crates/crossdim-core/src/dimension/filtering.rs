//! # Filtering and Selection
//!
//! Inbound filters move records between the included and excluded
//! partitions. The selection derives the one outbound filter a dimension
//! broadcasts to its peers.
//!
//! In incremental mode every move is mirrored by exactly one
//! `apply_addition` or `apply_removal`. In reprocess mode records only move
//! between partitions and `settle` rebuilds the series from `included`.

use super::Dimension;
use crate::events::DimensionEvent;
use crate::types::{Filter, Key, Predicate};
use std::collections::HashSet;

impl<R: Clone + 'static, B: Clone + 'static> Dimension<R, B> {
    // =========================================================================
    // INBOUND FILTERS
    // =========================================================================

    /// Apply a filter under its id.
    ///
    /// An id that is already applied is replaced rather than stacked, and a
    /// cleared filter behaves like `remove_filter`.
    pub fn add_filter(&mut self, filter: Filter<R>) {
        let Filter { id, predicate } = filter;
        match predicate {
            Some(predicate) if !self.applied.contains_key(&id) => {
                self.narrow(id, predicate);
                self.settle();
            }
            predicate => self.replace_filter(Filter::from_predicate(id, predicate)),
        }
    }

    /// Drop the filter applied under `id`. Returns `false`, touching
    /// nothing, if no such filter is applied.
    pub fn remove_filter(&mut self, id: &str) -> bool {
        if !self.detach(id) {
            return false;
        }
        self.settle();
        true
    }

    /// Swap the filter applied under `filter.id` for `filter`, in one
    /// post-process. A cleared filter removes the id.
    pub fn replace_filter(&mut self, filter: Filter<R>) {
        let Filter { id, predicate } = filter;
        let detached = self.detach(id.as_str());

        match predicate {
            Some(predicate) => self.narrow(id, predicate),
            None if !detached => return,
            None => {}
        }

        self.settle();
    }

    /// Drop every applied filter.
    pub fn clear_filters(&mut self) {
        if self.applied.is_empty() {
            return;
        }
        self.applied.clear();
        self.widen();
        self.settle();
    }

    /// Whether a filter is applied under `id`.
    #[must_use]
    pub fn has_filter(&self, id: &str) -> bool {
        self.applied.contains_key(id)
    }

    /// Ids of the applied filters, in application order.
    pub fn applied_filter_ids(&self) -> impl Iterator<Item = &Key> {
        self.applied.keys()
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Replace the selection. Returns `false` if it is set-equal to the
    /// current one, in which case nothing is derived and no event fires.
    ///
    /// Selecting never touches this dimension's own partitions.
    pub fn select<I, K>(&mut self, selection: I) -> bool
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let selection: Vec<Key> = selection.into_iter().map(Into::into).collect();

        let current: HashSet<&Key> = self.selection.iter().collect();
        let next: HashSet<&Key> = selection.iter().collect();
        if current == next {
            return false;
        }

        self.selection = selection;
        self.own_filter = self.derive_own_filter();

        tracing::debug!(
            dimension = %self.id,
            selected = self.selection.len(),
            "selection changed"
        );

        let event = DimensionEvent::Selection(self.own_filter.clone());
        self.events.emit(&event);
        true
    }

    /// Select nothing. Returns `false` if the selection was already empty.
    pub fn clear_selection(&mut self) -> bool {
        self.select(Vec::<Key>::new())
    }

    #[must_use]
    pub fn selection(&self) -> &[Key] {
        &self.selection
    }

    /// The filter derived from the current selection; cleared when nothing
    /// is selected.
    #[must_use]
    pub fn own_filter(&self) -> &Filter<R> {
        &self.own_filter
    }

    pub(super) fn derive_own_filter(&self) -> Filter<R> {
        if self.selection.is_empty() {
            return Filter::cleared(self.id.clone());
        }
        let predicate = (self.callbacks.filter_factory)(
            &self.selection,
            self.callbacks.filter_key.clone(),
        );
        Filter::from_predicate(self.id.clone(), Some(predicate))
    }

    // =========================================================================
    // PARTITION MOVES
    // =========================================================================

    /// Apply one more predicate: included records failing it move out.
    fn narrow(&mut self, id: Key, predicate: Predicate<R>) {
        let (kept, dropped) =
            std::mem::take(&mut self.included).split_by(|record| predicate(record));

        if !self.reprocess_all_on_filter {
            for record in dropped.as_slice() {
                self.apply_removal(record);
            }
        }

        tracing::debug!(dimension = %self.id, filter = %id, moved = dropped.len(), "narrowed");

        self.included = kept;
        self.excluded.merge(dropped);
        self.applied.insert(id, predicate);
    }

    /// Re-test excluded records after predicates were dropped: those now
    /// passing every applied filter move back in at their arrival position.
    fn widen(&mut self) {
        let (restored, still_out) =
            std::mem::take(&mut self.excluded).split_by(|record| self.passes_applied(record));

        if !self.reprocess_all_on_filter {
            for record in restored.as_slice() {
                self.apply_addition(record);
            }
        }

        tracing::debug!(dimension = %self.id, moved = restored.len(), "widened");

        self.excluded = still_out;
        self.included.merge(restored);
    }

    /// Remove the predicate applied under `id` and widen. `false` if absent.
    fn detach(&mut self, id: &str) -> bool {
        if self.applied.shift_remove(id).is_none() {
            return false;
        }
        self.widen();
        true
    }

    /// Close a filter batch.
    fn settle(&mut self) {
        if self.reprocess_all_on_filter {
            self.rebuild();
        }
        self.post_process();
    }
}

// =============================================================================
// TESTS
// =============================================================================
