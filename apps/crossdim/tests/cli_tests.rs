//! Integration tests for config loading, record loading and snapshot runs.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use crossdim::cli::{DataFormat, SelectArg, load_records, parse_records, run_snapshot};
use crossdim::config::Config;
use crossdim::error::AppError;
use std::io::Write;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[[dimension]]
id = "dim1"
series = "group"
bucket = "a"
value = "b"
reducer = "sum"

[[dimension]]
id = "dim2"
series = "subgroup"
bucket = "a"
value = "b"
reducer = "sum"
rollup = true
"#;

const NDJSON: &str = r#"
{"group": "A", "subgroup": "one", "a": 1, "b": 1}
{"group": "A", "subgroup": "one", "a": 2, "b": 2}
{"group": "A", "subgroup": "one", "a": 3, "b": 3}
{"group": "A", "subgroup": "two", "a": 1, "b": 10}
{"group": "A", "subgroup": "two", "a": 2, "b": 20}
{"group": "A", "subgroup": "two", "a": 3, "b": 30}
{"group": "A", "subgroup": "three", "a": 1, "b": 100}
{"group": "A", "subgroup": "three", "a": 2, "b": 200}
{"group": "A", "subgroup": "three", "a": 3, "b": 300}
{"group": "B", "subgroup": "one", "a": 1, "b": 1000}
{"group": "B", "subgroup": "one", "a": 2, "b": 2000}
{"group": "B", "subgroup": "one", "a": 3, "b": 3000}
"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn select(arg: &str) -> SelectArg {
    arg.parse().unwrap()
}

// =============================================================================
// LOADING
// =============================================================================

#[test]
fn test_config_from_file() {
    let file = write_temp(CONFIG);
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.dimensions.len(), 2);
    assert!(config.dimensions[1].rollup);
}

#[test]
fn test_missing_config_is_io_error() {
    let result = Config::from_file(std::path::Path::new("/nonexistent/dims.toml"));
    assert!(matches!(result, Err(AppError::Io(_))));
}

#[test]
fn test_load_ndjson_records() {
    let file = write_temp(NDJSON);
    let records = load_records(file.path(), DataFormat::Ndjson).unwrap();
    assert_eq!(records.len(), 12);
}

#[test]
fn test_load_json_array_records() {
    let file = write_temp(r#"[{"group": "A"}, {"group": "B"}]"#);
    let records = load_records(file.path(), DataFormat::Json).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_non_object_records_rejected() {
    let result = parse_records(r#"[{"group": "A"}, 3]"#, DataFormat::Json);
    assert!(matches!(result, Err(AppError::NotAnObject { index: 1 })));
}

#[test]
fn test_malformed_json_rejected() {
    let result = parse_records("{\"group\": ", DataFormat::Ndjson);
    assert!(matches!(result, Err(AppError::Json(_))));
}

// =============================================================================
// RUNS
// =============================================================================

#[test]
fn test_run_without_selection() {
    let config = Config::parse(CONFIG).unwrap();
    let records = parse_records(NDJSON, DataFormat::Ndjson).unwrap();
    let snapshot = run_snapshot(&config, records, &[]).unwrap();

    let dim1 = snapshot.get("dim1").unwrap();
    let a = dim1.series("A").unwrap();
    assert_eq!(a.count, 9);
    assert_eq!(a.bucket("1").unwrap().value.y, Some(111.0));

    let dim2 = snapshot.get("dim2").unwrap();
    assert_eq!(dim2.series("one").unwrap().rollups["y"].sum, 6006.0);
}

#[test]
fn test_run_with_selection_filters_peers() {
    let config = Config::parse(CONFIG).unwrap();
    let records = parse_records(NDJSON, DataFormat::Ndjson).unwrap();
    let snapshot = run_snapshot(&config, records, &[select("dim1=A")]).unwrap();

    let dim2 = snapshot.get("dim2").unwrap();
    assert_eq!(dim2.series("one").unwrap().rollups["y"].sum, 6.0);
    assert_eq!(dim2.series("two").unwrap().rollups["y"].sum, 60.0);
    assert_eq!(dim2.series("three").unwrap().rollups["y"].sum, 600.0);

    // A selection never filters its own dimension.
    let dim1 = snapshot.get("dim1").unwrap();
    assert_eq!(dim1.selection.len(), 1);
    assert_eq!(dim1.series("B").unwrap().count, 3);
}

#[test]
fn test_run_with_configured_selection() {
    let config = Config::parse(&CONFIG.replace(
        "reducer = \"sum\"\nrollup = true",
        "reducer = \"sum\"\nrollup = true\nselection = [\"two\"]",
    ))
    .unwrap();
    let records = parse_records(NDJSON, DataFormat::Ndjson).unwrap();
    let snapshot = run_snapshot(&config, records, &[]).unwrap();

    let dim1 = snapshot.get("dim1").unwrap();
    let a = dim1.series("A").unwrap();
    assert_eq!(a.count, 3);
    assert_eq!(a.bucket("1").unwrap().value.y, Some(10.0));
    assert!(!dim1.series("B").unwrap().visible);
}

#[test]
fn test_run_unknown_dimension_selection() {
    let config = Config::parse(CONFIG).unwrap();
    let records = parse_records(NDJSON, DataFormat::Ndjson).unwrap();
    let result = run_snapshot(&config, records, &[select("nope=A")]);
    assert!(matches!(result, Err(AppError::Engine(_))));
}

#[test]
fn test_snapshot_serializes_by_dimension_id() {
    let config = Config::parse(CONFIG).unwrap();
    let records = parse_records(NDJSON, DataFormat::Ndjson).unwrap();
    let snapshot = run_snapshot(&config, records, &[]).unwrap();

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["dim1"]["id"], "dim1");
    assert_eq!(json["dim1"]["series"][0]["name"], "A");
    assert_eq!(json["dim1"]["series"][0]["buckets"][0]["value"]["y"], 111.0);
    assert!(json["dim1"]["series"][0]["buckets"][0]["value"].get("sum").is_none());
}
