//! Shared fixtures: the twelve-record dataset and its dimensions.

#![allow(dead_code)]

use crossdim_core::{Dimension, DimensionBuilder, Key};

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub group: &'static str,
    pub csv_group: &'static str,
    pub subgroup: &'static str,
    pub a: i64,
    pub b: i64,
    /// Arrival order, standing in for a timestamp.
    pub ts: u32,
}

/// Bucket accumulator: `x` is the bucket's `a`, `y` sums `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

pub fn row(
    group: &'static str,
    csv_group: &'static str,
    subgroup: &'static str,
    a: i64,
    b: i64,
    ts: u32,
) -> Row {
    Row {
        group,
        csv_group,
        subgroup,
        a,
        b,
        ts,
    }
}

pub fn data() -> Vec<Row> {
    vec![
        row("A", "A,C", "one", 1, 1, 1),
        row("A", "A,C", "one", 2, 2, 2),
        row("A", "A,C", "one", 3, 3, 3),
        row("A", "A", "two", 1, 10, 4),
        row("A", "A", "two", 2, 20, 5),
        row("A", "A", "two", 3, 30, 6),
        row("A", "A,C", "three", 1, 100, 7),
        row("A", "A,C", "three", 2, 200, 8),
        row("A", "A,C", "three", 3, 300, 9),
        row("B", "B", "one", 1, 1000, 10),
        row("B", "B", "one", 2, 2000, 11),
        row("B", "B", "one", 3, 3000, 12),
    ]
}

pub fn not_one(r: &Row) -> bool {
    r.subgroup != "one"
}

pub fn not_two(r: &Row) -> bool {
    r.subgroup != "two"
}

/// Series by `series_of`, buckets by `a`, summing `b`.
pub fn summing(
    id: &str,
    series_of: impl Fn(&Row) -> &'static str + Send + Sync + 'static,
) -> DimensionBuilder<Row, Point> {
    Dimension::<Row, Point>::builder()
        .id(id)
        .series_key(move |r: &Row| Key::from(series_of(r)))
        .bucket_key(|r: &Row| Key::new(r.a.to_string()))
        .reducer(
            |r| Point { x: r.a, y: 0 },
            |p, r| p.y += r.b,
            |p, r| p.y -= r.b,
        )
}

/// Fan a record out per comma-separated `csv_group` entry.
pub fn split_csv(r: &Row) -> Vec<Row> {
    r.csv_group
        .split(',')
        .map(str::trim)
        .map(|group| Row {
            csv_group: group,
            ..r.clone()
        })
        .collect()
}

/// `y` of the bucket at `index` in the emitted output of `series`.
pub fn y_at(dim: &Dimension<Row, Point>, series: &str, index: usize) -> Option<i64> {
    dim.data()
        .iter()
        .find(|s| s.name.as_str() == series)
        .and_then(|s| s.buckets.get(index))
        .map(|b| b.value.y)
}

/// Number of emitted buckets in `series`.
pub fn emitted(dim: &Dimension<Row, Point>, series: &str) -> usize {
    dim.data()
        .iter()
        .find(|s| s.name.as_str() == series)
        .map_or(0, |s| s.buckets.len())
}
