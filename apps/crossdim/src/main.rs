//! # crossdim
//!
//! The main binary for the crossdim aggregation engine.
//!
//! ## Usage
//!
//! ```bash
//! # Check a dimension config
//! crossdim check --config dims.toml
//!
//! # Aggregate records, selecting A and B on the "group" dimension
//! crossdim run --config dims.toml --data records.json --select group=A,B --pretty
//! ```

use clap::Parser;
use crossdim::cli::{self, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    // CROSSDIM_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CROSSDIM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.quiet {
        "crossdim=warn,crossdim_core=warn"
    } else if cli.verbose {
        "crossdim=debug,crossdim_core=debug"
    } else {
        "crossdim=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr; stdout carries the snapshot.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
