//! # shiftscore-core
//!
//! Deterministic extraction of the Cumulative Layout Shift (CLS) metric from
//! browser main-thread trace events.
//!
//! The engine is a filter-then-reduce pipeline:
//!
//! ```text
//! mainThreadEvents ──► name == "LayoutShift" ──► args.data.is_main_frame
//!                                                       │
//!                        none left ◄──────────┬─────────┘
//!                        timing = 0           │ last event
//!                                             ▼
//!                              args.data.cumulative_score
//!                              present ─► timing = score
//!                              missing ─► NO_LAYOUT_SHIFT
//! ```
//!
//! ## Modules
//!
//! - [`trace`]: trace event model and metric input
//! - [`metric`]: the `Metric` capability trait and audit settings
//! - [`layout_shift`]: the Cumulative Layout Shift implementation
//! - [`cache`]: LRU memoization of computed metrics
//! - [`report`]: structured, printable metric reports
//!
//! ## Example
//!
//! ```
//! use shiftscore_core::{CumulativeLayoutShift, Metric, MetricComputationData};
//!
//! let data = MetricComputationData::default();
//! let result = CumulativeLayoutShift.compute_observed(&data).unwrap();
//! assert_eq!(result.timing, 0.0);
//! ```

pub mod cache;
pub mod layout_shift;
pub mod metric;
pub mod report;
pub mod trace;

pub use cache::{ArtifactKey, CacheStats, ComputedMetric, LruCache};
pub use layout_shift::{
    CumulativeLayoutShift, LAYOUT_SHIFT_EVENT, is_time_ordered, main_frame_layout_shifts,
};
pub use metric::{AuditContext, Metric, Settings, ThrottlingMethod, ThrottlingSettings};
pub use report::{MetricReport, Outcome};
pub use trace::{EventArgs, EventData, MetricComputationData, TraceEvent};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// METRIC RESULT
// =============================================================================

/// The value produced by a metric computation.
///
/// `timing` is the field name shared by every metric result. For Cumulative
/// Layout Shift it holds a unitless score, not a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// The metric value.
    pub timing: f64,
}

impl MetricResult {
    /// Create a result with the given value.
    #[must_use]
    pub fn new(timing: f64) -> Self {
        Self { timing }
    }

    /// The result reported when a page had nothing to measure.
    #[must_use]
    pub fn zero() -> Self {
        Self { timing: 0.0 }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised while computing a metric.
#[derive(Debug, Error)]
pub enum MetricError {
    /// Main-frame layout shifts were present but the last one had no
    /// `cumulative_score`. A page without any shifts is not an error.
    #[error("expected layout-shift data was missing from the trace")]
    NoLayoutShift,

    /// A throttling method name could not be parsed.
    #[error("unknown throttling method: {0}")]
    InvalidThrottlingMethod(String),

    /// The metric input could not be encoded into a cache key.
    #[error("failed to encode cache key: {0}")]
    CacheKey(#[from] postcard::Error),
}

impl MetricError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoLayoutShift => "NO_LAYOUT_SHIFT",
            Self::InvalidThrottlingMethod(_) => "INVALID_THROTTLING_METHOD",
            Self::CacheKey(_) => "CACHE_KEY_ENCODING",
        }
    }

    /// Whether the failure should be reported as a run-level error of the
    /// whole audit rather than an input problem.
    #[must_use]
    pub fn is_runtime_error(&self) -> bool {
        matches!(self, Self::NoLayoutShift)
    }
}

// =============================================================================
// TESTS
// =============================================================================
