//! # Dimension Configuration
//!
//! TOML description of the dimensions to build.
//!
//! ```toml
//! [[dimension]]
//! id = "by_group"
//! series = "group"
//! bucket = "a"
//! value = "b"
//! reducer = "sum"
//! rollup = true
//! selection = ["A"]
//! ```

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Maximum size of a config file (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SCHEMA
// =============================================================================

/// Top-level config: a list of `[[dimension]]` tables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, rename = "dimension")]
    pub dimensions: Vec<DimensionConfig>,
}

/// One `[[dimension]]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionConfig {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Record field grouping records into series.
    pub series: String,

    /// Record field grouping records into buckets.
    pub bucket: String,

    /// Numeric field the reducer folds. Unused by `count`.
    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub reducer: Reducer,

    /// Field ordering records for `latest`.
    #[serde(default)]
    pub latest_by: Option<String>,

    #[serde(default)]
    pub split: Option<SplitConfig>,

    /// Field compared against the selection. Defaults to `series`.
    #[serde(default)]
    pub filter_field: Option<String>,

    #[serde(default)]
    pub filter_mode: FilterMode,

    /// Separator for string fields under `filter_mode = "contains"`.
    #[serde(default = "default_separator")]
    pub filter_separator: String,

    #[serde(default = "default_true")]
    pub hide_empty: bool,

    #[serde(default)]
    pub reprocess_all: bool,

    #[serde(default)]
    pub sort: Option<SortOrder>,

    /// Roll `y` up per series.
    #[serde(default)]
    pub rollup: bool,

    #[serde(default)]
    pub selection: Vec<String>,
}

/// How bucket values are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    #[default]
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Latest,
}

impl Reducer {
    /// Whether removing a record can be folded back out exactly.
    #[must_use]
    pub fn is_invertible(self) -> bool {
        matches!(self, Self::Count | Self::Sum | Self::Mean)
    }

    #[must_use]
    pub fn needs_value(self) -> bool {
        !matches!(self, Self::Count)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Latest => "latest",
        }
    }
}

/// Fan a record out over a delimited field.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    pub field: String,
    #[serde(default = "default_separator")]
    pub separator: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// The field equals a selected value.
    #[default]
    Matches,
    /// The field, as a list, contains a selected value.
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// By bucket value (numbers numerically, then strings).
    Bucket,
    /// By reduced value, ascending.
    Value,
    /// By reduced value, descending.
    ValueDesc,
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    ",".to_string()
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        crate::cli::validate_file_size(path, MAX_CONFIG_FILE_SIZE)?;
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents)?;
        tracing::debug!(
            path = %path.display(),
            dimensions = config.dimensions.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Parse and validate config text.
    pub fn parse(contents: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions.is_empty() {
            return Err(AppError::InvalidConfig(
                "at least one [[dimension]] is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for dimension in &self.dimensions {
            dimension.validate()?;
            if !seen.insert(dimension.id.as_str()) {
                return Err(AppError::InvalidConfig(format!(
                    "duplicate dimension id '{}'",
                    dimension.id
                )));
            }
        }
        Ok(())
    }
}

impl DimensionConfig {
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |reason: &str| AppError::InvalidDimension {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id cannot be empty"));
        }
        if self.series.is_empty() {
            return Err(invalid("series field cannot be empty"));
        }
        if self.bucket.is_empty() {
            return Err(invalid("bucket field cannot be empty"));
        }
        if self.reducer.needs_value() && self.value.as_deref().is_none_or(str::is_empty) {
            return Err(invalid(&format!(
                "reducer '{}' needs a value field",
                self.reducer.as_str()
            )));
        }
        if self.reducer == Reducer::Latest && self.latest_by.as_deref().is_none_or(str::is_empty) {
            return Err(invalid("reducer 'latest' needs a latest_by field"));
        }
        if let Some(split) = &self.split {
            if split.field.is_empty() || split.separator.is_empty() {
                return Err(invalid("split needs a field and a non-empty separator"));
            }
        }
        if self.filter_mode == FilterMode::Contains && self.filter_separator.is_empty() {
            return Err(invalid("filter_separator cannot be empty"));
        }
        Ok(())
    }

    /// The field compared against selections.
    #[must_use]
    pub fn filter_field(&self) -> &str {
        self.filter_field.as_deref().unwrap_or(&self.series)
    }

    /// Whether filter changes rebuild the dimension from scratch, either
    /// because it was asked for or because the reducer cannot be undone.
    #[must_use]
    pub fn reprocesses(&self) -> bool {
        self.reprocess_all || !self.reducer.is_invertible()
    }
}

// =============================================================================
// TESTS
// =============================================================================
