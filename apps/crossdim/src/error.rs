//! # App Errors
//!
//! Everything the command line can fail with, wrapping the engine's own
//! errors.

use crossdim_core::CrossdimError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] CrossdimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The config parsed but describes something unusable.
    #[error("Invalid dimension '{id}': {reason}")]
    InvalidDimension { id: String, reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("File '{}' is {size} bytes, above the {max} byte limit", path.display())]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("Record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("Invalid selection '{0}', expected DIM=VALUE[,VALUE...]")]
    InvalidSelection(String),
}

pub type AppResult<T> = Result<T, AppError>;
