//! # Layout Shift Module
//!
//! Cumulative Layout Shift (CLS) from main-thread trace events.
//!
//! The renderer emits a `LayoutShift` event for every shift it records and
//! stamps each one with the running `cumulative_score`. Scores never
//! decrease over a page load, so the final main-frame event already carries
//! the page's total. Shifts inside iframes are excluded.
//!
//! No events at all is a normal outcome: many pages never shift, and the
//! renderer then emits nothing. That case reports 0. Main-frame shifts
//! without a score are reported as [`MetricError::NoLayoutShift`].

use crate::metric::{AuditContext, Metric};
use crate::trace::{MetricComputationData, TraceEvent};
use crate::{MetricError, MetricResult};

/// Trace event name of a layout-shift notification.
pub const LAYOUT_SHIFT_EVENT: &str = "LayoutShift";

/// Main-frame layout-shift events, in sequence order.
pub fn main_frame_layout_shifts(events: &[TraceEvent]) -> impl Iterator<Item = &TraceEvent> {
    events
        .iter()
        .filter(|event| event.name == LAYOUT_SHIFT_EVENT)
        .filter(|event| event.is_main_frame())
}

/// Whether the timestamps of `events` never decrease.
///
/// Events without a timestamp are skipped.
pub fn is_time_ordered<'a>(events: impl IntoIterator<Item = &'a TraceEvent>) -> bool {
    let mut last: Option<f64> = None;
    for ts in events.into_iter().filter_map(|event| event.ts) {
        if last.is_some_and(|prev| ts < prev) {
            return false;
        }
        last = Some(ts);
    }
    true
}

/// The Cumulative Layout Shift metric.
///
/// The score does not depend on network or CPU throttling, so there is no
/// separate simulated model: the simulated computation is the observed one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CumulativeLayoutShift;

impl CumulativeLayoutShift {
    /// Identifier used in reports and routes.
    pub const NAME: &'static str = "cumulative-layout-shift";
}

impl Metric for CumulativeLayoutShift {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn compute_simulated(
        &self,
        data: &MetricComputationData,
        _context: &AuditContext,
    ) -> Result<MetricResult, MetricError> {
        self.compute_observed(data)
    }

    /// Relies on `main_thread_events` being in occurrence order.
    fn compute_observed(&self, data: &MetricComputationData) -> Result<MetricResult, MetricError> {
        let Some(final_shift) = main_frame_layout_shifts(&data.main_thread_events).last() else {
            return Ok(MetricResult::zero());
        };

        final_shift
            .data()
            .and_then(|payload| payload.cumulative_score)
            .map(MetricResult::new)
            .ok_or(MetricError::NoLayoutShift)
    }
}

// =============================================================================
// TESTS
// =============================================================================
