//! # crossdim
//!
//! Command-line harness around `crossdim-core`.
//!
//! Dimensions are described in TOML, records are JSON objects, and the result
//! of a run is the manager's consolidated snapshot printed as JSON.

pub mod cli;
pub mod config;
pub mod dimensions;
pub mod error;

pub use error::{AppError, AppResult};
