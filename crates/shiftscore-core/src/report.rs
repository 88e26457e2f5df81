//! # Report Module
//!
//! Structured output for a computed metric.
//!
//! A report keeps the two legitimate outcomes apart: a page that shifted
//! (`measured`) and a page where the renderer recorded no main-frame
//! layout shifts at all (`no_layout_shifts`). Both carry a score; only the
//! outcome tells them apart.

use crate::layout_shift::main_frame_layout_shifts;
use crate::metric::{Metric, ThrottlingMethod};
use crate::trace::MetricComputationData;
use crate::MetricResult;
use serde::{Deserialize, Serialize};

/// How the reported score was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Read from the final main-frame layout-shift event.
    Measured,
    /// No main-frame layout shifts were recorded; the score is 0.
    NoLayoutShifts,
}

/// A metric result with the context needed to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    /// Metric identifier.
    pub metric: String,
    /// Throttling method the computation ran under.
    pub throttling_method: ThrottlingMethod,
    /// The metric value (a unitless score for layout shift).
    pub timing: f64,
    /// Number of main-frame layout-shift events in the input.
    pub layout_shift_events: usize,
    /// How the score was obtained.
    pub outcome: Outcome,
}

impl MetricReport {
    /// Build a report for a successful computation over `data`.
    pub fn new<M: Metric + ?Sized>(
        metric: &M,
        throttling_method: ThrottlingMethod,
        data: &MetricComputationData,
        result: MetricResult,
    ) -> Self {
        let layout_shift_events = main_frame_layout_shifts(&data.main_thread_events).count();
        let outcome = if layout_shift_events == 0 {
            Outcome::NoLayoutShifts
        } else {
            Outcome::Measured
        };

        Self {
            metric: metric.name().to_string(),
            throttling_method,
            timing: result.timing,
            layout_shift_events,
            outcome,
        }
    }

    /// The bare metric result.
    #[must_use]
    pub fn result(&self) -> MetricResult {
        MetricResult::new(self.timing)
    }

    /// Format as plain text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let outcome = match self.outcome {
            Outcome::Measured => "measured",
            Outcome::NoLayoutShifts => "no layout shifts recorded",
        };

        let mut output = String::new();
        output.push_str("┌─────────────────────────────────────┐\n");
        output.push_str(&format!("│ {:<35} │\n", self.metric));
        output.push_str("├─────────────────────────────────────┤\n");
        output.push_str(&format!("│ score       {:<23.4} │\n", self.timing));
        output.push_str(&format!("│ shifts      {:<23} │\n", self.layout_shift_events));
        output.push_str(&format!("│ throttling  {:<23} │\n", self.throttling_method.as_str()));
        output.push_str(&format!("│ outcome     {:<23} │\n", outcome));
        output.push_str("└─────────────────────────────────────┘\n");
        output
    }
}

// =============================================================================
// TESTS
// =============================================================================
