//! Property tests for the layout-shift extractor.

#![allow(clippy::unwrap_used, clippy::panic)]

use proptest::prelude::*;
use shiftscore_core::{
    AuditContext, CumulativeLayoutShift, EventArgs, EventData, LAYOUT_SHIFT_EVENT, Metric,
    MetricComputationData, MetricResult, Settings, ThrottlingMethod, ThrottlingSettings,
    TraceEvent,
};

// =============================================================================
// STRATEGIES
// =============================================================================

fn score() -> impl Strategy<Value = f64> {
    0.0f64..5.0
}

/// Any event that is not a main-frame layout shift.
fn noise_event() -> impl Strategy<Value = TraceEvent> {
    let other_name = prop::sample::select(vec![
        "Paint",
        "Layout",
        "EvaluateScript",
        "layoutshift",
        "LayoutShiftRegion",
    ]);
    prop_oneof![
        (other_name, any::<bool>(), prop::option::of(score())).prop_map(
            |(name, main, cumulative_score)| {
                TraceEvent::named(name).with_data(EventData {
                    is_main_frame: Some(main),
                    cumulative_score,
                })
            }
        ),
        // Layout shifts outside the main frame.
        (prop::option::of(Just(false)), prop::option::of(score())).prop_map(
            |(is_main_frame, cumulative_score)| {
                TraceEvent::named(LAYOUT_SHIFT_EVENT).with_data(EventData {
                    is_main_frame,
                    cumulative_score,
                })
            }
        ),
        Just(TraceEvent::named(LAYOUT_SHIFT_EVENT)),
        Just(TraceEvent {
            name: LAYOUT_SHIFT_EVENT.to_string(),
            args: Some(EventArgs { data: None }),
            ..TraceEvent::default()
        }),
    ]
}

fn main_frame_shift() -> impl Strategy<Value = TraceEvent> {
    score().prop_map(|s| TraceEvent::named(LAYOUT_SHIFT_EVENT).with_data(EventData::main_frame(s)))
}

/// Mixed traces, with or without qualifying events.
fn any_trace() -> impl Strategy<Value = Vec<TraceEvent>> {
    prop::collection::vec(prop_oneof![3 => noise_event(), 1 => main_frame_shift()], 0..40)
}

fn any_context() -> impl Strategy<Value = AuditContext> {
    (
        prop::sample::select(ThrottlingMethod::ALL.to_vec()),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
    )
        .prop_map(|(throttling_method, rtt_ms, throughput_kbps, cpu)| {
            AuditContext::new(Settings {
                throttling_method,
                throttling: ThrottlingSettings {
                    rtt_ms,
                    throughput_kbps,
                    cpu_slowdown_multiplier: cpu,
                },
            })
        })
}

fn observed(events: Vec<TraceEvent>) -> Result<MetricResult, shiftscore_core::MetricError> {
    CumulativeLayoutShift.compute_observed(&MetricComputationData::new(events))
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn without_main_frame_shifts_score_is_zero(events in prop::collection::vec(noise_event(), 0..40)) {
        prop_assert_eq!(observed(events).unwrap(), MetricResult::zero());
    }

    #[test]
    fn last_qualifying_score_is_reported(
        events in any_trace(),
        final_score in score(),
        trailing in prop::collection::vec(noise_event(), 0..10),
    ) {
        let mut events = events;
        events.push(TraceEvent::named(LAYOUT_SHIFT_EVENT).with_data(EventData::main_frame(final_score)));
        events.extend(trailing);

        prop_assert_eq!(observed(events).unwrap().timing, final_score);
    }

    #[test]
    fn simulated_equals_observed(events in any_trace(), context in any_context()) {
        let data = MetricComputationData::new(events);
        let observed = CumulativeLayoutShift.compute_observed(&data);
        let simulated = CumulativeLayoutShift.compute_simulated(&data, &context);

        match (observed, simulated) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.code(), b.code()),
            (a, b) => prop_assert!(false, "observed {:?} but simulated {:?}", a, b),
        }
    }

    #[test]
    fn computation_is_idempotent_and_read_only(events in any_trace()) {
        let data = MetricComputationData::new(events);
        let before = data.clone();

        let first = CumulativeLayoutShift.compute_observed(&data).ok();
        let second = CumulativeLayoutShift.compute_observed(&data).ok();

        prop_assert_eq!(first, second);
        prop_assert_eq!(data, before);
    }
}

// =============================================================================
// FIXED CASES
// =============================================================================

#[test]
fn scores_are_not_summed_or_maxed() {
    let events = [0.02, 0.05, 0.13]
        .into_iter()
        .map(|s| TraceEvent::named(LAYOUT_SHIFT_EVENT).with_data(EventData::main_frame(s)))
        .collect();
    assert_eq!(observed(events).unwrap(), MetricResult::new(0.13));
}

#[test]
fn single_shift_without_score_fails() {
    let events = vec![TraceEvent::named(LAYOUT_SHIFT_EVENT).with_data(EventData {
        is_main_frame: Some(true),
        cumulative_score: None,
    })];
    let err = observed(events).unwrap_err();
    assert_eq!(err.code(), "NO_LAYOUT_SHIFT");
}

#[test]
fn metric_is_usable_as_trait_object() {
    let metrics: Vec<Box<dyn Metric>> = vec![Box::new(CumulativeLayoutShift)];
    let data = MetricComputationData::default();
    for metric in &metrics {
        assert_eq!(metric.name(), "cumulative-layout-shift");
        assert_eq!(
            metric.compute(&data, &AuditContext::default()).unwrap(),
            MetricResult::zero()
        );
    }
}

#[test]
fn concurrent_calls_do_not_interfere() {
    let traces: Vec<MetricComputationData> = (0..8u32)
        .map(|i| {
            let score = f64::from(i);
            MetricComputationData::new(vec![
                TraceEvent::named(LAYOUT_SHIFT_EVENT).with_data(EventData::main_frame(score)),
            ])
        })
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = traces
            .iter()
            .map(|data| scope.spawn(move || CumulativeLayoutShift.compute_observed(data).unwrap()))
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap().timing, f64::from(i as u32));
        }
    });
}
