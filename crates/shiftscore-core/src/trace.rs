//! # Trace Module
//!
//! Decoded browser trace events and the metric input built from them.
//!
//! Only the fields the metrics read are modelled. Anything else in a raw
//! trace event is ignored on deserialization. Events are produced upstream
//! and borrowed here; nothing in this crate mutates or retains them.

use serde::{Deserialize, Serialize};

/// A single decoded trace event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Event name, e.g. `LayoutShift`.
    pub name: String,
    /// Comma-separated trace categories.
    #[serde(default)]
    pub cat: String,
    /// Phase character (`X`, `I`, `B`, ...).
    #[serde(default)]
    pub ph: String,
    /// Timestamp in microseconds, when recorded.
    #[serde(default)]
    pub ts: Option<f64>,
    /// Process id.
    #[serde(default)]
    pub pid: Option<u32>,
    /// Thread id.
    #[serde(default)]
    pub tid: Option<u32>,
    /// Event arguments.
    #[serde(default)]
    pub args: Option<EventArgs>,
}

/// The `args` object of a trace event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventArgs {
    /// The `args.data` payload.
    #[serde(default)]
    pub data: Option<EventData>,
}

/// The `args.data` payload of a trace event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Set on events that belong to the top-level document frame.
    #[serde(default)]
    pub is_main_frame: Option<bool>,
    /// Running layout-instability total at the time of the event.
    #[serde(default)]
    pub cumulative_score: Option<f64>,
}

impl TraceEvent {
    /// Create an event with just a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Attach an `args.data` payload.
    #[must_use]
    pub fn with_data(mut self, data: EventData) -> Self {
        self.args = Some(EventArgs { data: Some(data) });
        self
    }

    /// Set the timestamp.
    #[must_use]
    pub fn at(mut self, ts: f64) -> Self {
        self.ts = Some(ts);
        self
    }

    /// The `args.data` payload, if any.
    #[must_use]
    pub fn data(&self) -> Option<&EventData> {
        self.args.as_ref().and_then(|args| args.data.as_ref())
    }

    /// Whether the payload flags this event as main-frame.
    #[must_use]
    pub fn is_main_frame(&self) -> bool {
        self.data()
            .and_then(|data| data.is_main_frame)
            .unwrap_or(false)
    }
}

impl EventData {
    /// Payload of a main-frame shift with a cumulative score.
    #[must_use]
    pub fn main_frame(cumulative_score: f64) -> Self {
        Self {
            is_main_frame: Some(true),
            cumulative_score: Some(cumulative_score),
        }
    }
}

/// Input handed to every metric computation.
///
/// `main_thread_events` must already be in occurrence order, as produced by
/// the trace-processing step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricComputationData {
    /// Events recorded on the inspected page's main thread.
    pub main_thread_events: Vec<TraceEvent>,
}

impl MetricComputationData {
    /// Wrap an ordered main-thread event sequence.
    #[must_use]
    pub fn new(main_thread_events: Vec<TraceEvent>) -> Self {
        Self { main_thread_events }
    }
}

// =============================================================================
// TESTS
// =============================================================================
