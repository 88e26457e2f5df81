//! # Metric Module
//!
//! The capability set shared by every page-load metric.
//!
//! A metric can be computed two ways:
//! - **observed**: read straight from the recorded trace
//! - **simulated**: estimated under a network/CPU throttling model
//!
//! Which one runs is decided by the audit's throttling method. Metrics whose
//! value does not depend on throttling implement `compute_simulated` by
//! delegating to `compute_observed`.

use crate::trace::MetricComputationData;
use crate::{MetricError, MetricResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// SETTINGS
// =============================================================================

/// How throttling was applied while the trace was recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrottlingMethod {
    /// Page loaded unthrottled; metrics are simulated afterwards.
    #[default]
    Simulate,
    /// Throttling applied through the browser's devtools protocol.
    Devtools,
    /// Throttling supplied by the environment (e.g. a shaped network).
    Provided,
}

impl ThrottlingMethod {
    /// All methods, in declaration order.
    pub const ALL: [Self; 3] = [Self::Simulate, Self::Devtools, Self::Provided];

    /// The lowercase wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulate => "simulate",
            Self::Devtools => "devtools",
            Self::Provided => "provided",
        }
    }
}

impl fmt::Display for ThrottlingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThrottlingMethod {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MetricError::InvalidThrottlingMethod(s.to_string()))
    }
}

/// Network and CPU throttling parameters.
///
/// Integer-only, like every other number the engine owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottlingSettings {
    /// Round-trip time in milliseconds.
    pub rtt_ms: u32,
    /// Downlink throughput in kilobits per second.
    pub throughput_kbps: u32,
    /// CPU slowdown factor.
    pub cpu_slowdown_multiplier: u32,
}

impl Default for ThrottlingSettings {
    /// Mobile slow 4G.
    fn default() -> Self {
        Self {
            rtt_ms: 150,
            throughput_kbps: 1638,
            cpu_slowdown_multiplier: 4,
        }
    }
}

/// Audit settings relevant to metric computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Selects the observed or simulated computation.
    #[serde(default)]
    pub throttling_method: ThrottlingMethod,
    /// Throttling parameters for simulation.
    #[serde(default)]
    pub throttling: ThrottlingSettings,
}

impl Settings {
    /// Default settings with the given throttling method.
    #[must_use]
    pub fn with_method(throttling_method: ThrottlingMethod) -> Self {
        Self {
            throttling_method,
            ..Self::default()
        }
    }
}

/// Context passed alongside the metric input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditContext {
    /// Audit settings.
    pub settings: Settings,
}

impl AuditContext {
    /// Create a context from settings.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

// =============================================================================
// METRIC TRAIT
// =============================================================================

/// A page-load metric.
///
/// Implementations are stateless: every method is a pure function of its
/// arguments, so a single instance can be shared across threads.
pub trait Metric: Send + Sync {
    /// Stable identifier, e.g. `cumulative-layout-shift`.
    fn name(&self) -> &'static str;

    /// Estimate the metric under the context's throttling model.
    fn compute_simulated(
        &self,
        data: &MetricComputationData,
        context: &AuditContext,
    ) -> Result<MetricResult, MetricError>;

    /// Read the metric from the recorded trace as-is.
    fn compute_observed(&self, data: &MetricComputationData) -> Result<MetricResult, MetricError>;

    /// Run the computation selected by the context's throttling method.
    fn compute(
        &self,
        data: &MetricComputationData,
        context: &AuditContext,
    ) -> Result<MetricResult, MetricError> {
        match context.settings.throttling_method {
            ThrottlingMethod::Simulate => self.compute_simulated(data, context),
            ThrottlingMethod::Devtools | ThrottlingMethod::Provided => {
                self.compute_observed(data)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
