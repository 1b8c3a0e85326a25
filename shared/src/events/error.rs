use thiserror::Error;

use crate::types::SubscriptionId;

/// Errors that can occur when enqueueing onto the deferred event queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredPublishError {
    /// The owning event bus (and with it the queue) has been dropped
    #[error("Deferred event queue no longer exists, the owning EventBus was dropped")]
    BusDropped,
    /// The queue mutex was poisoned by a panicking producer
    #[error("Deferred event queue lock is poisoned")]
    QueuePoisoned,
}

/// Errors that can occur when operating on a SubscriptionHandle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The subscription was already removed from the registry
    #[error("Subscription {id} is no longer active")]
    NotActive { id: SubscriptionId },
    /// The owning event bus has been dropped
    #[error("Subscription {id} outlived its EventBus")]
    BusDropped { id: SubscriptionId },
}

/// A fault raised by a subscriber callback. Faults are contained per handler:
/// the bus counts them into the publish return value and moves on to the
/// remaining handlers. The bus itself never logs or re-raises them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Event handler fault: {reason}")]
pub struct HandlerFault {
    pub reason: String,
}

impl HandlerFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// What a subscriber callback returns: `Ok(())` on success, `Err` to report
/// a contained fault.
pub type HandlerResult = Result<(), HandlerFault>;
