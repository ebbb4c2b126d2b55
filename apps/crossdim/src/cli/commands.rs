//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::{DataFormat, SelectArg};
use crate::config::Config;
use crate::dimensions::{Aggregate, Record, build_manager};
use crate::error::{AppError, AppResult};
use crossdim_core::ManagerSnapshot;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a records file (256 MiB).
///
/// Every record stays in memory for replay, so the whole file is read at once.
pub const MAX_DATA_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Validate file size before reading.
pub fn validate_file_size(path: &Path, max: u64) -> AppResult<()> {
    let size = std::fs::metadata(path)?.len();
    if size > max {
        return Err(AppError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max,
        });
    }
    Ok(())
}

// =============================================================================
// RECORD LOADING
// =============================================================================

/// Load JSON object records from a file.
pub fn load_records(path: &Path, format: DataFormat) -> AppResult<Vec<Record>> {
    validate_file_size(path, MAX_DATA_FILE_SIZE)?;
    let contents = std::fs::read_to_string(path)?;
    let records = parse_records(&contents, format)?;

    tracing::info!(
        path = %path.display(),
        records = records.len(),
        "records loaded"
    );
    Ok(records)
}

/// Parse records, rejecting anything that is not a JSON object.
pub fn parse_records(contents: &str, format: DataFormat) -> AppResult<Vec<Record>> {
    let values: Vec<Value> = match format {
        DataFormat::Json => serde_json::from_str(contents)?,
        DataFormat::Ndjson => contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<Value>)
            .collect::<Result<_, _>>()?,
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            if value.is_object() {
                Ok(Arc::new(value))
            } else {
                Err(AppError::NotAnObject { index })
            }
        })
        .collect()
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Build the configured dimensions, feed them the records, apply the
/// command-line selections and return the resulting snapshot.
pub fn run_snapshot(
    config: &Config,
    records: Vec<Record>,
    selections: &[SelectArg],
) -> AppResult<ManagerSnapshot<Aggregate>> {
    let mut manager = build_manager(config)?;
    manager.add_data(records);

    for selection in selections {
        let values = selection.values.iter().map(String::as_str);
        let changed = manager.select(&selection.dimension, values)?;
        tracing::debug!(
            dimension = %selection.dimension,
            values = ?selection.values,
            changed,
            "selection applied"
        );
    }

    Ok(manager.snapshot())
}

/// Aggregate records and print the consolidated snapshot.
pub fn cmd_run(
    config_path: &Path,
    data_path: &Path,
    format: DataFormat,
    selections: &[SelectArg],
    pretty: bool,
) -> AppResult<()> {
    let config = Config::from_file(config_path)?;
    let records = load_records(data_path, format)?;
    let snapshot = run_snapshot(&config, records, selections)?;

    let output = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{}", output);
    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Validate a config and list its dimensions.
pub fn cmd_check(config_path: &Path) -> AppResult<()> {
    let config = Config::from_file(config_path)?;
    build_manager(&config)?;

    println!("{}: {} dimension(s)", config_path.display(), config.dimensions.len());
    for dimension in &config.dimensions {
        println!(
            "  {:<16} series={} bucket={} reducer={}{}",
            dimension.id,
            dimension.series,
            dimension.bucket,
            dimension.reducer.as_str(),
            if dimension.reprocesses() {
                " (rebuild on filter)"
            } else {
                ""
            }
        );
    }
    Ok(())
}
