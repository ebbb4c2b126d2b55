//! # Dimension Manager
//!
//! Coordinates a set of dimensions over one record stream.
//!
//! - New records are forwarded to every registered dimension and kept in a
//!   history that is replayed into late joiners
//! - A member's selection filter is applied to every *other* member, never to
//!   the member itself
//! - After every operation the manager emits one consolidated `Change`
//!
//! The manager owns its dimensions. Each member's `Selection` handler only
//! forwards the filter into a channel; the manager drains it right after the
//! operation that caused it, so no handler ever re-enters a dimension.

use crate::dimension::Dimension;
use crate::events::{DimensionEvent, EventBus, EventKind, ManagerEvent, SubscriptionId};
use crate::snapshot::ManagerSnapshot;
use crate::types::{CrossdimError, Filter, Key};
use indexmap::IndexMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

/// Events a manager emits.
const MANAGER_EVENTS: &[EventKind] = &[EventKind::Change];

struct Member<R, B> {
    dimension: Dimension<R, B>,
    subscription: SubscriptionId,
}

/// Owns dimensions and wires their selections to each other.
pub struct DimensionManager<R, B> {
    dimensions: IndexMap<Key, Member<R, B>>,
    history: Vec<R>,
    sender: Sender<Filter<R>>,
    receiver: Receiver<Filter<R>>,
    events: EventBus<ManagerEvent<B>>,
}

impl<R: Clone + 'static, B: Clone + 'static> Default for DimensionManager<R, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone + 'static, B: Clone + 'static> DimensionManager<R, B> {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            dimensions: IndexMap::new(),
            history: Vec::new(),
            sender,
            receiver,
            events: EventBus::new("DimensionManager", MANAGER_EVENTS),
        }
    }

    // =========================================================================
    // REGISTRY
    // =========================================================================

    /// Register a dimension and bring it up to date.
    ///
    /// The newcomer receives every peer's active selection filter and the
    /// full record history. Its own selection, if any, is pushed to the peers.
    ///
    /// # Errors
    ///
    /// `DuplicateDimension` if the id is already registered. The rejected
    /// dimension is dropped with everything it holds; check
    /// [`contains_dimension`](Self::contains_dimension) first to keep it.
    pub fn add_dimension(&mut self, mut dimension: Dimension<R, B>) -> Result<(), CrossdimError> {
        let id = dimension.id().clone();
        if self.dimensions.contains_key(&id) {
            return Err(CrossdimError::DuplicateDimension(id.to_string()));
        }

        let sender = self.sender.clone();
        let subscription = dimension.on(EventKind::Selection, move |event| {
            if let DimensionEvent::Selection(filter) = event {
                // The receiver lives as long as the manager.
                let _ = sender.send(filter.clone());
            }
        })?;

        for member in self.dimensions.values() {
            let peer_filter = member.dimension.own_filter();
            if !peer_filter.is_cleared() {
                dimension.replace_filter(peer_filter.clone());
            }
        }

        if !self.history.is_empty() {
            dimension.add_many(self.history.iter().cloned());
        }

        let own_filter = dimension.own_filter().clone();
        if !own_filter.is_cleared() {
            self.apply_to_peers(&own_filter);
        }

        tracing::debug!(
            dimension = %id,
            replayed = self.history.len(),
            members = self.dimensions.len() + 1,
            "dimension registered"
        );

        self.dimensions.insert(
            id,
            Member {
                dimension,
                subscription,
            },
        );
        self.emit_change();
        Ok(())
    }

    /// Unregister a dimension and hand it back.
    ///
    /// Its own state is untouched, and filters it already pushed onto peers
    /// stay applied.
    pub fn remove_dimension(&mut self, id: &str) -> Result<Dimension<R, B>, CrossdimError> {
        let Member {
            mut dimension,
            subscription,
        } = self
            .dimensions
            .shift_remove(id)
            .ok_or_else(|| CrossdimError::DimensionNotFound(id.to_string()))?;

        dimension.off(subscription);

        tracing::debug!(dimension = %id, members = self.dimensions.len(), "dimension removed");

        self.emit_change();
        Ok(dimension)
    }

    // =========================================================================
    // DATA
    // =========================================================================

    /// Forward a batch to every dimension and append it to the history.
    pub fn add_data(&mut self, records: impl IntoIterator<Item = R>) {
        let records: Vec<R> = records.into_iter().collect();

        for member in self.dimensions.values_mut() {
            member.dimension.add_many(records.iter().cloned());
        }

        tracing::debug!(
            records = records.len(),
            history = self.history.len() + records.len(),
            "data forwarded"
        );

        self.history.extend(records);
        self.emit_change();
    }

    pub fn add_one(&mut self, record: R) {
        self.add_data(std::iter::once(record));
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Run `f` against a registered dimension, then propagate whatever
    /// selections it emitted.
    pub fn update_dimension<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Dimension<R, B>) -> T,
    ) -> Result<T, CrossdimError> {
        let member = self
            .dimensions
            .get_mut(id)
            .ok_or_else(|| CrossdimError::DimensionNotFound(id.to_string()))?;

        let result = f(&mut member.dimension);
        self.propagate();
        Ok(result)
    }

    /// Select on a member. `Ok(false)` if the selection did not change.
    pub fn select<I, K>(&mut self, id: &str, selection: I) -> Result<bool, CrossdimError>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.update_dimension(id, |dimension| dimension.select(selection))
    }

    pub fn clear_selection(&mut self, id: &str) -> Result<bool, CrossdimError> {
        self.update_dimension(id, Dimension::clear_selection)
    }

    /// Drain pending selection filters into the peers of their emitters.
    fn propagate(&mut self) {
        let pending: Vec<Filter<R>> = self.receiver.try_iter().collect();
        if pending.is_empty() {
            return;
        }

        for filter in &pending {
            tracing::debug!(
                from = %filter.id,
                cleared = filter.is_cleared(),
                "propagating selection"
            );
            self.apply_to_peers(filter);
            self.emit_change();
        }
    }

    fn apply_to_peers(&mut self, filter: &Filter<R>) {
        for (id, member) in &mut self.dimensions {
            if *id != filter.id {
                member.dimension.replace_filter(filter.clone());
            }
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn dimension(&self, id: &str) -> Option<&Dimension<R, B>> {
        self.dimensions.get(id).map(|member| &member.dimension)
    }

    #[must_use]
    pub fn contains_dimension(&self, id: &str) -> bool {
        self.dimensions.contains_key(id)
    }

    /// Members in registration order.
    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension<R, B>> {
        self.dimensions.values().map(|member| &member.dimension)
    }

    pub fn dimension_ids(&self) -> impl Iterator<Item = &Key> {
        self.dimensions.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Every record added so far, in arrival order.
    #[must_use]
    pub fn history(&self) -> &[R] {
        &self.history
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Consolidated view keyed by dimension id.
    #[must_use]
    pub fn snapshot(&self) -> ManagerSnapshot<B> {
        self.dimensions().map(Dimension::snapshot).collect()
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Subscribe to `Change`. `Selection` is rejected: selections are
    /// consumed internally.
    pub fn on(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&ManagerEvent<B>) + Send + 'static,
    ) -> Result<SubscriptionId, CrossdimError> {
        self.events.subscribe(kind, Box::new(handler))
    }

    pub fn on_named(
        &mut self,
        event: &str,
        handler: impl FnMut(&ManagerEvent<B>) + Send + 'static,
    ) -> Result<SubscriptionId, CrossdimError> {
        let kind = event.parse()?;
        self.on(kind, handler)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn emit_change(&mut self) {
        if !self.events.has_subscribers(EventKind::Change) {
            return;
        }
        let snapshot = self.snapshot();
        self.events.emit(&ManagerEvent::Change(snapshot));
    }
}

impl<R, B> fmt::Debug for DimensionManager<R, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimensionManager")
            .field("dimensions", &self.dimensions.keys().collect::<Vec<_>>())
            .field("history", &self.history.len())
            .field("events", &self.events)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
