//! # Crossdim CLI Module
//!
//! This module implements the command-line interface for crossdim.
//!
//! ## Available Commands
//!
//! - `run` - Load records into the configured dimensions and print a snapshot
//! - `check` - Validate a dimension config and list its dimensions

mod commands;

use crate::error::{AppError, AppResult};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// crossdim - linked dimension aggregation
///
/// Groups JSON records into series of reduced buckets per dimension. A
/// selection on one dimension filters every other one.
#[derive(Parser, Debug)]
#[command(name = "crossdim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate records and print the consolidated snapshot as JSON
    Run {
        /// Dimension config (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Records file
        #[arg(short, long)]
        data: PathBuf,

        /// Records file format
        #[arg(short = 't', long, value_enum, default_value_t = DataFormat::Json)]
        format: DataFormat,

        /// Select values on a dimension, e.g. `--select group=A,B` (repeatable)
        #[arg(short, long = "select")]
        selections: Vec<SelectArg>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate a dimension config and list its dimensions
    Check {
        /// Dimension config (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// How the records file is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataFormat {
    /// One JSON array of objects
    Json,
    /// One JSON object per line
    Ndjson,
}

/// `DIM=VALUE[,VALUE...]`. An empty value list clears the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectArg {
    pub dimension: String,
    pub values: Vec<String>,
}

impl FromStr for SelectArg {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dimension, values) = s
            .split_once('=')
            .ok_or_else(|| AppError::InvalidSelection(s.to_string()))?;
        let dimension = dimension.trim();
        if dimension.is_empty() {
            return Err(AppError::InvalidSelection(s.to_string()));
        }

        Ok(Self {
            dimension: dimension.to_string(),
            values: values
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> AppResult<()> {
    match cli.command {
        Commands::Run {
            config,
            data,
            format,
            selections,
            pretty,
        } => cmd_run(&config, &data, format, &selections, pretty),
        Commands::Check { config } => cmd_check(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_args() {
        let arg: SelectArg = "group=A, B".parse().expect("parse");
        assert_eq!(arg.dimension, "group");
        assert_eq!(arg.values, vec!["A", "B"]);

        let cleared: SelectArg = "group=".parse().expect("parse");
        assert!(cleared.values.is_empty());
    }

    #[test]
    fn rejects_malformed_select_args() {
        assert!(matches!(
            "group".parse::<SelectArg>(),
            Err(AppError::InvalidSelection(_))
        ));
        assert!(matches!(
            "=A".parse::<SelectArg>(),
            Err(AppError::InvalidSelection(_))
        ));
    }

    #[test]
    fn cli_parses_run() {
        let cli = Cli::try_parse_from([
            "crossdim", "run", "-c", "dims.toml", "-d", "rows.ndjson", "-t", "ndjson", "-s",
            "group=A", "--select", "kind=x,y", "--pretty",
        ])
        .expect("parse");

        let Commands::Run {
            format,
            selections,
            pretty,
            ..
        } = cli.command
        else {
            unreachable!("parsed a run command");
        };
        assert_eq!(format, DataFormat::Ndjson);
        assert_eq!(selections.len(), 2);
        assert_eq!(selections[1].values, vec!["x", "y"]);
        assert!(pretty);
    }
}
