//! Property-based tests for capacity controller bounds.
//!
//! Key invariants:
//! 1. Current capacity never leaves [min(baseline, max), max]
//! 2. Fixed mode never moves off the maximum
//! 3. Saturated intake always climbs to the ceiling
//! 4. Sustained silence always returns to baseline

use proptest::prelude::*;
use shoal_shared::{CapacityConfig, CapacityController};

// Strategy for a well-formed adaptive configuration
fn config_strategy() -> impl Strategy<Value = CapacityConfig> {
    (1usize..5_000, 1usize..50_000).prop_map(|(baseline_size, max_size)| CapacityConfig {
        adaptive_scaling: true,
        baseline_size,
        max_size,
    })
}

// Strategy for a per-call observed utilization trace
fn trace_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..60_000, 1..80)
}

proptest! {
    /// Whatever the trace does, capacity stays inside the configured band
    #[test]
    fn prop_capacity_stays_inside_the_configured_band(
        config in config_strategy(),
        trace in trace_strategy(),
    ) {
        let floor = config.baseline_size.min(config.max_size);
        let mut controller = CapacityController::new(&config, 0.0);
        let mut now = 0.0;

        // 0.6s steps mix sample-only calls with decision calls
        for observed in trace {
            now += 0.6;
            controller.update(observed, 4, now);
            prop_assert!(controller.current_capacity() >= floor);
            prop_assert!(controller.current_capacity() <= config.max_size);
        }
    }

    /// Fixed mode ignores the trace entirely
    #[test]
    fn prop_fixed_mode_never_moves(
        config in config_strategy(),
        trace in trace_strategy(),
    ) {
        let fixed = CapacityConfig {
            adaptive_scaling: false,
            ..config
        };
        let mut controller = CapacityController::new(&fixed, 0.0);
        let mut now = 0.0;

        for observed in trace {
            now += 1.1;
            controller.update(observed, 4, now);
            prop_assert_eq!(controller.current_capacity(), fixed.max_size);
        }
    }

    /// Saturated intake always climbs to the ceiling
    #[test]
    fn prop_saturated_load_reaches_the_maximum(
        config in config_strategy(),
    ) {
        let mut controller = CapacityController::new(&config, 0.0);
        let mut now = 0.0;

        for _ in 0..30 {
            now += 1.1;
            controller.update(config.max_size, 4, now);
        }
        prop_assert_eq!(controller.current_capacity(), config.max_size);
    }

    /// After any amount of growth, six quiet decisions return to baseline
    #[test]
    fn prop_sustained_silence_returns_to_baseline(
        config in config_strategy(),
    ) {
        let floor = config.baseline_size.min(config.max_size);
        let mut controller = CapacityController::new(&config, 0.0);
        let mut now = 0.0;

        for _ in 0..4 {
            now += 1.1;
            controller.update(config.max_size, 4, now);
        }
        for _ in 0..7 {
            now += 1.1;
            controller.update(0, 4, now);
        }
        prop_assert_eq!(controller.current_capacity(), floor);
    }
}
