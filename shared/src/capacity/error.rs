use thiserror::Error;

/// Errors that can occur when applying a CapacityConfig
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityConfigError {
    /// A zero maximum would leave the governed endpoint unable to admit
    /// any work at all
    #[error("Maximum capacity must be at least 1, configuration asked for 0")]
    ZeroMaxSize,
}
