//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the engine:
//! - Keys used for series, buckets, selections and dimension ids (`Key`)
//! - Callback aliases (`Predicate`, `KeyFn`)
//! - Filters exchanged between dimensions (`Filter`)
//! - Error types (`CrossdimError`)
//!
//! Records themselves are never described here. The engine only ever touches a
//! record through the callbacks a dimension is configured with.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// KEYS
// =============================================================================

/// A grouping key.
///
/// Series keys, bucket keys, selection values and dimension ids are all keys.
/// `Key` borrows as `str`, so every keyed lookup accepts a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Create a new key from anything string-like.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CALLBACK ALIASES
// =============================================================================

/// A record predicate. `true` keeps the record included.
pub type Predicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Extracts a key from a record.
pub type KeyFn<R> = Arc<dyn Fn(&R) -> Key + Send + Sync>;

// =============================================================================
// FILTER
// =============================================================================

/// A filter applied to a dimension's record partition.
///
/// The id names the filter's owner (for selection filters, the dimension that
/// derived it). A `None` predicate excludes nothing; handing one to
/// `replace_filter` clears whatever that id had applied.
pub struct Filter<R> {
    /// Owner of the filter, unique within one dimension's applied set.
    pub id: Key,
    /// The predicate, or `None` for "exclude nothing".
    pub predicate: Option<Predicate<R>>,
}

impl<R> Filter<R> {
    /// Create a filter from a closure.
    pub fn new(id: impl Into<Key>, predicate: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        Self {
            id: id.into(),
            predicate: Some(Arc::new(predicate)),
        }
    }

    /// Create a filter from an existing shared predicate.
    pub fn from_predicate(id: impl Into<Key>, predicate: Option<Predicate<R>>) -> Self {
        Self {
            id: id.into(),
            predicate,
        }
    }

    /// A filter that excludes nothing.
    pub fn cleared(id: impl Into<Key>) -> Self {
        Self {
            id: id.into(),
            predicate: None,
        }
    }

    /// Whether this filter carries no predicate.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.predicate.is_none()
    }

    /// Test a record. A cleared filter accepts everything.
    pub fn matches(&self, record: &R) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(record))
    }
}

// Manual impls: deriving would demand `R: Clone` / `R: Debug`.
impl<R> Clone for Filter<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

impl<R> fmt::Debug for Filter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("id", &self.id)
            .field("cleared", &self.predicate.is_none())
            .finish()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the engine.
///
/// - Configuration errors surface from `DimensionBuilder::build`, before any
///   record is processed
/// - Argument errors surface from the offending call and leave state untouched
/// - Removing a record that was never added is a defect and panics instead
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrossdimError {
    /// A required dimension option was not supplied.
    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    /// An event name that no component emits.
    #[error("Unknown event type '{0}', only \"selection\" or \"change\" are valid")]
    UnknownEvent(String),

    /// A known event that this component does not emit.
    #[error("{target} does not emit '{kind}' events")]
    UnsupportedEvent {
        /// The event kind requested.
        kind: String,
        /// The component the subscription was attempted on.
        target: &'static str,
    },

    /// A dimension with this id is already registered.
    #[error("Dimension already registered: {0}")]
    DuplicateDimension(String),

    /// No dimension with this id is registered.
    #[error("Dimension not found: {0}")]
    DimensionNotFound(String),
}

// =============================================================================
// TESTS
// =============================================================================
