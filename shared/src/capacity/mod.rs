//! Adaptive capacity governance for a packet-processing loop.
//!
//! A [`CapacityController`] watches how much of its current capacity the
//! owning endpoint actually uses and, once per second at most, grows the
//! ceiling aggressively under pressure or shrinks it back to the baseline
//! after a sustained quiet period. Operators who want a fixed budget
//! disable adaptive scaling and the controller pins to the maximum.

mod config;
mod controller;
mod error;

pub use config::CapacityConfig;
pub use controller::{CapacityController, CapacityMode};
pub use error::CapacityConfigError;
