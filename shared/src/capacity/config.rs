use std::default::Default;

/// Contains Config properties which will be used by a CapacityController
#[derive(Clone, Debug)]
pub struct CapacityConfig {
    /// Determines whether capacity floats between the baseline and the
    /// maximum in response to observed utilization. When false, capacity is
    /// pinned to `max_size` at all times.
    pub adaptive_scaling: bool,
    /// Capacity the controller starts from in adaptive mode, and the value
    /// it shrinks back to after a sustained quiet period. Clamped down to
    /// `max_size` if configured larger.
    pub baseline_size: usize,
    /// Hard ceiling capacity never exceeds, in either mode. Must be at
    /// least 1.
    pub max_size: usize,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            adaptive_scaling: true,
            baseline_size: 1000,
            max_size: 20000,
        }
    }
}
