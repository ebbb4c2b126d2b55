//! # Property-Based Tests
//!
//! Partition and aggregate invariants under random records and random
//! filter sequences.

use crossdim_core::{Dimension, Filter, Key};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::HashMap;

type Row = (u8, u8, i64);

fn summing(reprocess: bool) -> Dimension<Row, i64> {
    Dimension::<Row, i64>::builder()
        .id("prop")
        .series_key(|r: &Row| Key::new(r.0.to_string()))
        .bucket_key(|r: &Row| Key::new(r.1.to_string()))
        .reducer(|_| 0, |acc, r| *acc += r.2, |acc, r| *acc -= r.2)
        .reprocess_all_on_filter(reprocess)
        .build()
        .expect("build")
}

/// A filter step: `(slot, threshold)` applies "series key != threshold"
/// under one of three ids; a negative threshold removes that id instead.
fn apply(dim: &mut Dimension<Row, i64>, slot: u8, threshold: i8) {
    let id = format!("f{slot}");
    if threshold < 0 {
        dim.remove_filter(&id);
    } else {
        let rejected = threshold as u8;
        dim.add_filter(Filter::new(id, move |r: &Row| r.0 != rejected));
    }
}

fn rows() -> impl Strategy<Value = Vec<Row>> {
    vec((0u8..5, 0u8..4, -100i64..100), 0..60)
}

fn steps() -> impl Strategy<Value = Vec<(u8, i8)>> {
    vec((0u8..3, -2i8..5), 0..12)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Included plus excluded always covers every logical record, and the
    /// split between them follows the active filters.
    #[test]
    fn partition_covers_stream(records in rows(), filters in steps()) {
        let mut dim = summing(false);
        dim.add_many(records.clone());
        let mut active = HashMap::new();
        for (slot, threshold) in filters {
            apply(&mut dim, slot, threshold);
            if threshold < 0 {
                active.remove(&slot);
            } else {
                active.insert(slot, threshold as u8);
            }
        }

        prop_assert_eq!(dim.included_count() + dim.excluded_count(), records.len());
        for record in dim.included() {
            prop_assert!(active.values().all(|rejected| record.0 != *rejected));
        }
        for record in dim.excluded() {
            prop_assert!(active.values().any(|rejected| record.0 == *rejected));
        }
    }

    /// Series counts sum to the included partition; bucket counts sum to
    /// their series.
    #[test]
    fn counts_are_consistent(records in rows(), filters in steps()) {
        let mut dim = summing(false);
        dim.add_many(records);
        for (slot, threshold) in filters {
            apply(&mut dim, slot, threshold);
        }

        let total: usize = dim.all_series().map(|s| s.count()).sum();
        prop_assert_eq!(total, dim.included_count());
        for series in dim.all_series() {
            let buckets: usize = series.buckets().map(|b| b.count).sum();
            prop_assert_eq!(buckets, series.count());
            prop_assert!(series.buckets().all(|b| b.count > 0));
        }
    }

    /// Incremental sums equal a from-scratch fold over the included records.
    #[test]
    fn incremental_matches_rebuild(records in rows(), filters in steps()) {
        let mut incremental = summing(false);
        let mut rebuilt = summing(true);
        incremental.add_many(records.clone());
        rebuilt.add_many(records);
        for (slot, threshold) in filters {
            apply(&mut incremental, slot, threshold);
            apply(&mut rebuilt, slot, threshold);
        }

        for series in incremental.all_series() {
            for bucket in series.buckets() {
                let other = rebuilt.bucket(series.key().as_str(), bucket.key.as_str());
                prop_assert_eq!(other.map(|b| (b.count, b.value)), Some((bucket.count, bucket.value)));
            }
        }
        prop_assert_eq!(incremental.included_count(), rebuilt.included_count());
    }

    /// Adding and then removing a filter leaves every sum where it was.
    #[test]
    fn filter_round_trip_restores_sums(records in rows(), rejected in 0u8..5) {
        let mut dim = summing(false);
        dim.add_many(records);
        let before: Vec<(Key, Key, i64)> = dim
            .all_series()
            .flat_map(|s| s.buckets().map(move |b| (s.key().clone(), b.key.clone(), b.value)))
            .collect();

        dim.add_filter(Filter::new("round", move |r: &Row| r.0 != rejected));
        dim.remove_filter("round");

        for (series, bucket, value) in before {
            prop_assert_eq!(dim.bucket(series.as_str(), bucket.as_str()).map(|b| b.value), Some(value));
        }
    }
}
