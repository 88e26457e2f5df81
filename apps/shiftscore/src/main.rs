//! shiftscore: Cumulative Layout Shift from browser traces.
//!
//! ```bash
//! # Score a trace file
//! shiftscore compute --trace page.json
//!
//! # Machine-readable output, observed throttling
//! shiftscore compute --trace page.json --throttling devtools --json
//!
//! # Serve the metric over HTTP
//! shiftscore serve --bind 0.0.0.0:9330
//! ```

use clap::Parser;
use shiftscore::cli::{Cli, Commands, cmd_compute, cmd_serve};
use shiftscore::config::ServeConfig;
use shiftscore::init_tracing;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Compute {
            trace,
            throttling,
            json,
        } => cmd_compute(&trace, throttling, json),
        Commands::Serve { bind, cache_size } => {
            cmd_serve(ServeConfig { bind, cache_size }).await
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(code = err.code(), "{err}");
            ExitCode::FAILURE
        }
    }
}
