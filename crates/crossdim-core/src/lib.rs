//! # crossdim-core
//!
//! Incremental cross-filtering aggregation engine.
//!
//! A [`Dimension`] groups a stream of caller-defined records into series of
//! buckets, each holding a reduced accumulator. Filters move records between
//! an included and an excluded partition, and the aggregates follow
//! incrementally. A [`DimensionManager`] wires dimensions together: the
//! selection made on one dimension filters all of the others.
//!
//! ## Constraints
//!
//! - Records are opaque: the engine reads them only through callbacks
//! - Fully synchronous: every call runs to completion, events included
//! - No async, no I/O, no interior locking

// =============================================================================
// MODULES
// =============================================================================

pub mod dimension;
pub mod events;
pub mod filters;
pub mod manager;
pub mod series;
pub mod snapshot;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{CrossdimError, Filter, Key, KeyFn, Predicate};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use dimension::{Dimension, DimensionBuilder};
pub use events::{DimensionEvent, EventKind, ManagerEvent, SubscriptionId};
pub use filters::{
    FilterFactory, FilterKey, FilterKeyFn, any_selection_in_value_array,
    any_selection_matches_value,
};
pub use manager::DimensionManager;
pub use series::{Bucket, RollupStats, Series};
pub use snapshot::{DimensionSnapshot, ManagerSnapshot, SeriesSnapshot};
