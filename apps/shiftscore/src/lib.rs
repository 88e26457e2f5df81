//! # shiftscore Library
//!
//! This library exposes the shiftscore modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod input;

// Re-export shiftscore_core for convenience
pub use shiftscore_core;

use shiftscore_core::MetricError;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors surfaced by the CLI and the server.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid trace JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Metric(#[from] MetricError),
}

impl CliError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "INVALID_TRACE",
            Self::Metric(err) => err.code(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr; the filter comes from `RUST_LOG` and defaults to
/// `info`. Calling this twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
