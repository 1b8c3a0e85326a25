use log::{info, warn};

use crate::capacity::{config::CapacityConfig, error::CapacityConfigError};

/// Seconds that must elapse between scaling decisions. Calls inside the
/// window only sample.
const DECISION_INTERVAL_SECS: f64 = 1.0;
/// Peak utilization ratio above which capacity grows.
const SCALE_UP_THRESHOLD: f64 = 0.75;
/// Peak utilization ratio below which the quiet dwell accumulates.
const SCALE_DOWN_THRESHOLD: f64 = 0.25;
/// Seconds utilization must stay uninterrupted below the quiet threshold
/// before capacity drops back to the baseline.
const SCALE_DOWN_DELAY_SECS: f64 = 5.0;
const SCALE_UP_FACTOR: f64 = 1.5;
/// Floor on each growth step, so small capacities still make progress.
const MIN_SCALE_UP_INCREMENT: usize = 100;
/// Seconds between repeated at-the-ceiling warnings.
const CEILING_WARNING_THROTTLE_SECS: f64 = 10.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CapacityMode {
    /// Capacity pinned to the configured maximum.
    Fixed,
    /// Capacity floats within `[baseline, max]` following utilization.
    Adaptive,
}

/// Governs how much work the owning endpoint admits per tick.
///
/// The consumer loop reads [`CapacityController::current_capacity`] once per
/// tick to bound what it takes on, then reports what it actually processed
/// back through [`CapacityController::update`]. Every update folds into a
/// running peak; at most once per second that peak is compared against
/// current capacity and the controller grows aggressively (1.5x, at least
/// [`MIN_SCALE_UP_INCREMENT`] more) or, after a sustained quiet spell,
/// shrinks straight back to the baseline. Growing and shrinking on
/// different schedules is what keeps a bursty load from oscillating.
///
/// One owner thread only. Nothing in here locks, and the times passed to
/// [`CapacityController::update`] must come from a monotonic clock.
pub struct CapacityController {
    adaptive: bool,
    baseline: usize,
    max: usize,
    current: usize,
    peak_since_decision: usize,
    last_decision_at: f64,
    /// Time of the first in an unbroken run of sub-threshold decisions.
    /// Cleared by growth or by any decision at or above the threshold.
    low_since: Option<f64>,
    scale_up_count: u32,
    scale_down_count: u32,
    last_ceiling_warning_at: Option<f64>,
}

impl CapacityController {
    /// Builds a controller from `config`, seeding the decision window at
    /// `now`. Starts at the baseline in adaptive mode, at the maximum
    /// otherwise.
    pub fn try_new(config: &CapacityConfig, now: f64) -> Result<Self, CapacityConfigError> {
        let mut controller = Self {
            adaptive: false,
            baseline: 0,
            max: 0,
            current: 0,
            peak_since_decision: 0,
            last_decision_at: now,
            low_since: None,
            scale_up_count: 0,
            scale_down_count: 0,
            last_ceiling_warning_at: None,
        };
        controller.try_refresh_configuration(config)?;
        controller.current = if controller.adaptive {
            controller.baseline
        } else {
            controller.max
        };
        info!("Capacity controller initialized: {}", controller.diagnostics());
        Ok(controller)
    }

    /// Builds a controller from `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_size` is 0. Consider using `try_new` for
    /// non-panicking error handling.
    pub fn new(config: &CapacityConfig, now: f64) -> Self {
        Self::try_new(config, now)
            .expect("capacity controller requires a maximum capacity of at least 1")
    }

    /// Capacity the governed endpoint may use right now.
    pub fn current_capacity(&self) -> usize {
        self.current
    }

    pub fn mode(&self) -> CapacityMode {
        if self.adaptive {
            CapacityMode::Adaptive
        } else {
            CapacityMode::Fixed
        }
    }

    /// Feeds one utilization observation into the controller.
    ///
    /// Every call folds `observed_utilization` into the peak for the open
    /// decision window; a decision only happens once `now` is at least one
    /// second past the previous decision, so capacity never changes from a
    /// call inside the window. `connected_clients` is context for the log
    /// lines and does not enter the scaling arithmetic.
    pub fn update(&mut self, observed_utilization: usize, connected_clients: usize, now: f64) {
        self.peak_since_decision = self.peak_since_decision.max(observed_utilization);

        if now - self.last_decision_at < DECISION_INTERVAL_SECS {
            return;
        }

        let peak = self.peak_since_decision;
        self.peak_since_decision = 0;
        self.last_decision_at = now;

        if !self.adaptive {
            if self.current != self.max {
                info!(
                    "Capacity pinned at maximum {} with adaptive scaling disabled ({} clients connected)",
                    self.max, connected_clients
                );
                self.current = self.max;
            }
            self.low_since = None;
            return;
        }

        // a zero capacity cannot serve any peak, treat it as saturated
        let utilization_ratio = if self.current > 0 {
            peak as f64 / self.current as f64
        } else if peak > 0 {
            1.0
        } else {
            0.0
        };

        if utilization_ratio > SCALE_UP_THRESHOLD {
            self.low_since = None;
            self.scale_up(utilization_ratio, peak, connected_clients, now);
        } else if utilization_ratio < SCALE_DOWN_THRESHOLD {
            let low_since = *self.low_since.get_or_insert(now);
            if now - low_since >= SCALE_DOWN_DELAY_SECS {
                if self.current > self.baseline {
                    info!(
                        "Scaling down capacity {} -> baseline {} after {:.1}s of low utilization ({} clients connected)",
                        self.current,
                        self.baseline,
                        now - low_since,
                        connected_clients
                    );
                    self.current = self.baseline;
                    self.scale_down_count += 1;
                }
                self.low_since = None;
            }
        } else {
            // back inside the normal band, the quiet run is broken
            self.low_since = None;
        }
    }

    /// Re-reads `config`, clamping an oversized baseline down to the
    /// maximum and clamping current capacity down right away if the new
    /// maximum sits below it. Disabling adaptive scaling pins capacity to
    /// the maximum at the next decision; re-enabling it resumes from
    /// whatever capacity is current, with no reset to baseline.
    pub fn try_refresh_configuration(
        &mut self,
        config: &CapacityConfig,
    ) -> Result<(), CapacityConfigError> {
        if config.max_size == 0 {
            return Err(CapacityConfigError::ZeroMaxSize);
        }
        self.adaptive = config.adaptive_scaling;
        self.max = config.max_size;
        self.baseline = config.baseline_size;
        if self.baseline > self.max {
            warn!(
                "Baseline capacity {} exceeds maximum {}, clamping baseline down",
                self.baseline, self.max
            );
            self.baseline = self.max;
        }
        if self.current > self.max {
            self.current = self.max;
        }
        Ok(())
    }

    /// Re-reads `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_size` is 0. Consider using
    /// `try_refresh_configuration` for non-panicking error handling.
    pub fn refresh_configuration(&mut self, config: &CapacityConfig) {
        self.try_refresh_configuration(config)
            .expect("capacity controller requires a maximum capacity of at least 1")
    }

    /// One-line operational snapshot, for the host's own logging.
    pub fn diagnostics(&self) -> String {
        let mode = match self.mode() {
            CapacityMode::Adaptive => "ADAPTIVE",
            CapacityMode::Fixed => "FIXED",
        };
        format!(
            "Mode: {} | Current: {} | Baseline: {} | Max: {} | Scale-ups: {} | Scale-downs: {}",
            mode, self.current, self.baseline, self.max, self.scale_up_count, self.scale_down_count
        )
    }

    fn scale_up(&mut self, utilization_ratio: f64, peak: usize, connected_clients: usize, now: f64) {
        if self.current >= self.max {
            let should_warn = match self.last_ceiling_warning_at {
                Some(last) => now - last >= CEILING_WARNING_THROTTLE_SECS,
                None => true,
            };
            if should_warn {
                warn!(
                    "Capacity stuck at maximum {} under {:.0}% utilization (peak {}, {} clients connected)",
                    self.max,
                    utilization_ratio * 100.0,
                    peak,
                    connected_clients
                );
                self.last_ceiling_warning_at = Some(now);
            }
            return;
        }

        let grown = (self.current as f64 * SCALE_UP_FACTOR).ceil() as usize;
        let new_capacity = grown
            .max(self.current.saturating_add(MIN_SCALE_UP_INCREMENT))
            .min(self.max);
        info!(
            "Scaling up capacity {} -> {} at {:.0}% utilization (peak {}, {} clients connected)",
            self.current,
            new_capacity,
            utilization_ratio * 100.0,
            peak,
            connected_clients
        );
        self.current = new_capacity;
        self.scale_up_count += 1;
    }
}
