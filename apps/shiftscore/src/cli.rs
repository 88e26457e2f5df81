//! CLI definition and command implementations.
//!
//! Each `cmd_*` function backs one subcommand of the binary and is exposed
//! here so integration tests can drive it without spawning a process.

use crate::api::{self, AppState};
use crate::config::{DEFAULT_BIND, ServeConfig};
use crate::input::{load_trace, warn_if_unordered};
use crate::CliError;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, Subcommand};
use shiftscore_core::cache::DEFAULT_CACHE_SIZE;
use shiftscore_core::{
    AuditContext, CumulativeLayoutShift, Metric, MetricReport, Settings, ThrottlingMethod,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "shiftscore")]
#[command(about = "Cumulative Layout Shift from browser rendering traces")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute Cumulative Layout Shift for a trace file.
    Compute {
        /// Trace JSON: {"mainThreadEvents": [...]}, {"traceEvents": [...]} or an event array.
        #[arg(short, long)]
        trace: PathBuf,

        /// Throttling method the trace was recorded under.
        #[arg(
            long,
            env = "SHIFTSCORE_THROTTLING",
            default_value = "simulate",
            value_parser = throttling_method_parser()
        )]
        throttling: ThrottlingMethod,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve the metric over HTTP.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "SHIFTSCORE_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,

        /// Maximum number of cached results.
        #[arg(long, env = "SHIFTSCORE_CACHE_SIZE", default_value_t = DEFAULT_CACHE_SIZE)]
        cache_size: usize,
    },
}

/// Accepts exactly the names in [`ThrottlingMethod::ALL`] and lists them in `--help`.
fn throttling_method_parser() -> impl TypedValueParser<Value = ThrottlingMethod> {
    PossibleValuesParser::new(ThrottlingMethod::ALL.map(|method| method.as_str()))
        .try_map(|name| name.parse::<ThrottlingMethod>())
}

/// Load a trace and compute its Cumulative Layout Shift report.
pub fn compute_report(trace: &Path, method: ThrottlingMethod) -> Result<MetricReport, CliError> {
    let data = load_trace(trace)?;

    warn_if_unordered(&data, &trace.display().to_string());

    let metric = CumulativeLayoutShift;
    let context = AuditContext::new(Settings::with_method(method));
    let result = metric.compute(&data, &context)?;
    let report = MetricReport::new(&metric, method, &data, result);

    info!(
        metric = metric.name(),
        throttling = %method,
        timing = report.timing,
        shifts = report.layout_shift_events,
        "computed metric"
    );
    Ok(report)
}

/// `shiftscore compute`: print the report as text or JSON.
pub fn cmd_compute(trace: &Path, method: ThrottlingMethod, json: bool) -> Result<(), CliError> {
    let report = compute_report(trace, method)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}

/// `shiftscore serve`: run the HTTP service until Ctrl-C.
pub async fn cmd_serve(config: ServeConfig) -> Result<(), CliError> {
    let state = AppState::new(config.cache_size);
    let app = api::router(state);

    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %listener.local_addr()?, cache_size = config.cache_size, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
