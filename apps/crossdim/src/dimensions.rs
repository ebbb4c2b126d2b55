//! # JSON Dimensions
//!
//! Builds engine dimensions over JSON object records from their config.
//!
//! Field values become keys through their string form: strings as-is, other
//! values as their JSON text, missing fields and `null` as the empty key.

use crate::config::{Config, DimensionConfig, FilterMode, Reducer, SortOrder};
use crate::error::AppResult;
use crossdim_core::{
    Bucket, Dimension, DimensionManager, FilterKey, Key, any_selection_in_value_array,
};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// A record as loaded from disk. Shared so fan-out and replay stay cheap.
pub type Record = Arc<Value>;

pub type JsonDimension = Dimension<Record, Aggregate>;
pub type JsonManager = DimensionManager<Record, Aggregate>;

// =============================================================================
// ACCUMULATOR
// =============================================================================

/// Bucket accumulator shared by every reducer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    /// Bucket field value of the record that created the bucket.
    pub x: Value,
    /// Reduced value; `None` until a numeric value has been folded in.
    pub y: Option<f64>,
    #[serde(skip)]
    sum: KahanSum,
    #[serde(skip)]
    n: u64,
    #[serde(skip)]
    latest_by: Option<Value>,
}

impl Aggregate {
    fn new(x: Value, reducer: Reducer) -> Self {
        let y = match reducer {
            Reducer::Count | Reducer::Sum => Some(0.0),
            Reducer::Mean | Reducer::Min | Reducer::Max | Reducer::Latest => None,
        };
        Self {
            x,
            y,
            sum: KahanSum::default(),
            n: 0,
            latest_by: None,
        }
    }
}

/// Compensated running sum. Removal adds the negated value, so a
/// filter round-trip lands back on the same total.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    fn sum(&self) -> f64 {
        self.sum
    }
}

/// Reducer settings captured by the callbacks.
#[derive(Debug)]
struct Fold {
    reducer: Reducer,
    value: Option<String>,
    latest_by: Option<String>,
}

impl Fold {
    fn value_of(&self, record: &Value) -> Option<f64> {
        self.value
            .as_deref()
            .and_then(|field| record.get(field))
            .and_then(number)
    }

    fn add(&self, acc: &mut Aggregate, record: &Value) {
        if self.reducer == Reducer::Count {
            acc.y = Some(acc.y.unwrap_or(0.0) + 1.0);
            return;
        }
        if self.reducer == Reducer::Latest {
            self.add_latest(acc, record);
            return;
        }

        let Some(v) = self.value_of(record) else {
            return;
        };
        acc.n += 1;
        acc.sum.add(v);
        acc.y = match self.reducer {
            Reducer::Sum => Some(acc.sum.sum()),
            Reducer::Mean => Some(acc.sum.sum() / acc.n as f64),
            Reducer::Min => Some(acc.y.map_or(v, |y| y.min(v))),
            Reducer::Max => Some(acc.y.map_or(v, |y| y.max(v))),
            Reducer::Count | Reducer::Latest => acc.y,
        };
    }

    fn add_latest(&self, acc: &mut Aggregate, record: &Value) {
        let at = self
            .latest_by
            .as_deref()
            .and_then(|field| record.get(field))
            .cloned()
            .unwrap_or(Value::Null);

        let newer = match &acc.latest_by {
            None => true,
            Some(current) => compare_json(&at, current) == Ordering::Greater,
        };
        if newer {
            acc.y = self.value_of(record);
            acc.latest_by = Some(at);
        }
    }

    /// Only the invertible reducers undo; the others are rebuilt on every
    /// filter change instead.
    fn remove(&self, acc: &mut Aggregate, record: &Value) {
        match self.reducer {
            Reducer::Count => acc.y = Some(acc.y.unwrap_or(0.0) - 1.0),
            Reducer::Sum | Reducer::Mean => {
                let Some(v) = self.value_of(record) else {
                    return;
                };
                acc.n = acc.n.saturating_sub(1);
                if acc.n == 0 {
                    // Nothing left to sum: drop any residue.
                    acc.sum = KahanSum::default();
                } else {
                    acc.sum.add(-v);
                }
                acc.y = match (self.reducer, acc.n) {
                    (Reducer::Mean, 0) => None,
                    (Reducer::Mean, n) => Some(acc.sum.sum() / n as f64),
                    _ => Some(acc.sum.sum()),
                };
            }
            Reducer::Min | Reducer::Max | Reducer::Latest => {}
        }
    }
}

// =============================================================================
// FIELD HELPERS
// =============================================================================

/// The key form of a field value.
#[must_use]
pub fn key_of(value: Option<&Value>) -> Key {
    match value {
        None | Some(Value::Null) => Key::default(),
        Some(Value::String(s)) => Key::new(s.as_str()),
        Some(other) => Key::new(other.to_string()),
    }
}

fn field_key(record: &Value, field: &str) -> Key {
    key_of(record.get(field))
}

/// Numbers, and strings that parse as numbers.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Total order over JSON scalars: null, then booleans, then numbers, then
/// strings. Anything else compares by its JSON text.
#[must_use]
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// The values of `field` as a list: arrays element-wise, strings split on
/// `separator`, anything else as one key.
fn field_keys(record: &Value, field: &str, separator: &str) -> Vec<Key> {
    match record.get(field) {
        Some(Value::Array(items)) => items.iter().map(|item| key_of(Some(item))).collect(),
        Some(Value::String(s)) => s
            .split(separator)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Key::from)
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => vec![key_of(Some(other))],
    }
}

fn compare_y(a: &Bucket<Aggregate>, b: &Bucket<Aggregate>) -> Ordering {
    match (a.value.y, b.value.y) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

/// Build one dimension from its config.
pub fn build_dimension(config: &DimensionConfig) -> AppResult<JsonDimension> {
    config.validate()?;

    let reprocess = config.reprocesses();
    if reprocess && !config.reprocess_all {
        tracing::warn!(
            dimension = %config.id,
            reducer = config.reducer.as_str(),
            "reducer cannot be undone, rebuilding on every filter change"
        );
    }

    let fold = Arc::new(Fold {
        reducer: config.reducer,
        value: config.value.clone(),
        latest_by: config.latest_by.clone(),
    });
    let (add, remove) = (Arc::clone(&fold), Arc::clone(&fold));
    let reducer = config.reducer;
    let bucket_field = config.bucket.clone();

    let mut builder = JsonDimension::builder()
        .id(config.id.as_str())
        .series_key({
            let field = config.series.clone();
            move |record: &Record| field_key(record, &field)
        })
        .bucket_key({
            let field = bucket_field.clone();
            move |record: &Record| field_key(record, &field)
        })
        .reducer(
            move |record: &Record| {
                let x = record.get(&bucket_field).cloned().unwrap_or(Value::Null);
                Aggregate::new(x, reducer)
            },
            move |acc, record| add.add(acc, record),
            move |acc, record| remove.remove(acc, record),
        )
        .hide_empty_buckets(config.hide_empty)
        .reprocess_all_on_filter(reprocess)
        .selection(config.selection.iter().map(String::as_str));

    if let Some(name) = &config.name {
        builder = builder.name(name.as_str());
    }

    if let Some(split) = &config.split {
        let field = split.field.clone();
        let separator = split.separator.clone();
        builder = builder.split(move |record: &Record| split_record(record, &field, &separator));
    }

    let filter_field = config.filter_field().to_string();
    builder = match config.filter_mode {
        FilterMode::Matches => builder.filter_predicate(move |record: &Record| {
            FilterKey::One(field_key(record, &filter_field))
        }),
        FilterMode::Contains => {
            let separator = config.filter_separator.clone();
            builder
                .filter_predicate(move |record: &Record| {
                    FilterKey::Many(field_keys(record, &filter_field, &separator))
                })
                .filter_factory(any_selection_in_value_array::<Record>)
        }
    };

    builder = match config.sort {
        None => builder,
        Some(SortOrder::Bucket) => builder.sort_fn(|a, b| compare_json(&a.value.x, &b.value.x)),
        Some(SortOrder::Value) => builder.sort_fn(compare_y),
        Some(SortOrder::ValueDesc) => builder.sort_fn(|a, b| compare_y(b, a)),
    };

    if config.rollup {
        builder = builder.rollup("y", |acc: &Aggregate| acc.y.unwrap_or(0.0));
    }

    Ok(builder.build()?)
}

/// One logical record per non-empty part of `field`, each carrying that
/// part in place of the whole. Records without the field pass through.
fn split_record(record: &Record, field: &str, separator: &str) -> Vec<Record> {
    let Some(Value::String(whole)) = record.get(field) else {
        return vec![Arc::clone(record)];
    };

    whole
        .split(separator)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut copy = Value::clone(record);
            if let Value::Object(map) = &mut copy {
                map.insert(field.to_string(), Value::String(part.to_string()));
            }
            Arc::new(copy)
        })
        .collect()
}

/// Build a manager holding every configured dimension, in config order.
pub fn build_manager(config: &Config) -> AppResult<JsonManager> {
    let mut manager = JsonManager::new();
    for dimension in &config.dimensions {
        manager.add_dimension(build_dimension(dimension)?)?;
        tracing::debug!(dimension = %dimension.id, "dimension built");
    }
    Ok(manager)
}

// =============================================================================
// TESTS
// =============================================================================
