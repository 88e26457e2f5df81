//! Trace file loading.
//!
//! Accepted shapes:
//! - `{"mainThreadEvents": [...]}`: already-selected main-thread events,
//!   used in the order given
//! - `{"traceEvents": [...]}`: a Chrome trace export
//! - `[...]`: a bare event array
//!
//! The last two are raw recordings and are stable-sorted by timestamp before
//! use. Main-thread selection is not attempted: every event is passed on,
//! and the metric's own filtering picks out what it needs.

use crate::CliError;
use serde::Deserialize;
use shiftscore_core::{
    MetricComputationData, TraceEvent, is_time_ordered, main_frame_layout_shifts,
};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum TraceFile {
    MainThread {
        #[serde(rename = "mainThreadEvents")]
        main_thread_events: Vec<TraceEvent>,
    },
    Chrome {
        #[serde(rename = "traceEvents")]
        trace_events: Vec<TraceEvent>,
    },
    Bare(Vec<TraceEvent>),
}

/// Parse trace JSON into metric input.
pub fn parse_trace(json: &str) -> Result<MetricComputationData, CliError> {
    let events = match serde_json::from_str::<TraceFile>(json)? {
        TraceFile::MainThread { main_thread_events } => main_thread_events,
        TraceFile::Chrome { trace_events: mut events } | TraceFile::Bare(mut events) => {
            sort_by_timestamp(&mut events);
            events
        }
    };
    debug!(events = events.len(), "parsed trace");
    Ok(MetricComputationData::new(events))
}

/// Read and parse a trace file.
pub fn load_trace(path: &Path) -> Result<MetricComputationData, CliError> {
    let json = std::fs::read_to_string(path)?;
    parse_trace(&json)
}

/// Warn when the main-frame layout shifts in `data` are not in timestamp
/// order. The metric still reports the last one in sequence.
///
/// Returns whether they were ordered.
pub fn warn_if_unordered(data: &MetricComputationData, source: &str) -> bool {
    let ordered = is_time_ordered(main_frame_layout_shifts(&data.main_thread_events));
    if !ordered {
        warn!(
            source,
            "layout-shift events are not in timestamp order; reporting the last one in sequence"
        );
    }
    ordered
}

/// Stable sort; events without a timestamp sort as time zero.
fn sort_by_timestamp(events: &mut [TraceEvent]) {
    events.sort_by(|a, b| a.ts.unwrap_or(0.0).total_cmp(&b.ts.unwrap_or(0.0)));
}
