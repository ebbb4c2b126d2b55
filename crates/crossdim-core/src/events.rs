//! # Events
//!
//! Synchronous publish/subscribe used by dimensions and the manager.
//!
//! - Delivery happens inside the call that fires the event
//! - Handlers run in subscription order
//! - Each component declares which event kinds it emits; subscribing to any
//!   other kind fails at subscribe time

use crate::snapshot::ManagerSnapshot;
use crate::types::{CrossdimError, Filter};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// EVENT KINDS
// =============================================================================

/// The event kinds the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A dimension's own filter changed.
    Selection,
    /// State settled after a mutation batch.
    Change,
}

impl EventKind {
    /// The wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Change => "change",
        }
    }
}

impl FromStr for EventKind {
    type Err = CrossdimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "selection" => Ok(Self::Selection),
            "change" => Ok(Self::Change),
            other => Err(CrossdimError::UnknownEvent(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can travel over an [`EventBus`].
pub trait Event {
    /// The kind used to route this event to handlers.
    fn kind(&self) -> EventKind;
}

/// Events fired by a `Dimension`.
#[derive(Debug, Clone)]
pub enum DimensionEvent<R> {
    /// The dimension's own filter, freshly derived from its selection.
    Selection(Filter<R>),
    /// Aggregates settled; re-read them through the query API.
    Change,
}

impl<R> Event for DimensionEvent<R> {
    fn kind(&self) -> EventKind {
        match self {
            Self::Selection(_) => EventKind::Selection,
            Self::Change => EventKind::Change,
        }
    }
}

/// Events fired by a `DimensionManager`.
#[derive(Debug, Clone)]
pub enum ManagerEvent<B> {
    /// Consolidated view of every registered dimension.
    Change(ManagerSnapshot<B>),
}

impl<B> Event for ManagerEvent<B> {
    fn kind(&self) -> EventKind {
        EventKind::Change
    }
}

// =============================================================================
// EVENT BUS
// =============================================================================

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// A subscribed callback.
pub type Handler<E> = Box<dyn FnMut(&E) + Send>;

struct Subscription<E> {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler<E>,
}

/// Subscriber registry owned by one component.
pub struct EventBus<E> {
    owner: &'static str,
    accepts: &'static [EventKind],
    next_id: u64,
    subscriptions: Vec<Subscription<E>>,
}

impl<E: Event> EventBus<E> {
    /// Create a bus for `owner` that carries only the `accepts` kinds.
    #[must_use]
    pub fn new(owner: &'static str, accepts: &'static [EventKind]) -> Self {
        Self {
            owner,
            accepts,
            next_id: 0,
            subscriptions: Vec::new(),
        }
    }

    /// Register a handler for one event kind.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: Handler<E>,
    ) -> Result<SubscriptionId, CrossdimError> {
        if !self.accepts.contains(&kind) {
            return Err(CrossdimError::UnsupportedEvent {
                kind: kind.to_string(),
                target: self.owner,
            });
        }

        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.subscriptions.push(Subscription { id, kind, handler });
        Ok(id)
    }

    /// Remove a handler. Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Whether anyone listens to `kind`.
    #[must_use]
    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.subscriptions.iter().any(|s| s.kind == kind)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the bus has no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Deliver an event to every handler of its kind, in subscription order.
    pub fn emit(&mut self, event: &E) {
        let kind = event.kind();
        for sub in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            (sub.handler)(event);
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("owner", &self.owner)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
