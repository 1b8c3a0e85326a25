//! # Shoal Shared
//! The middleware core a shoal host runs on: the typed event bus game
//! systems coordinate through, the adaptive capacity controller that
//! governs per-tick packet intake, and the packet buffer pool the
//! intake loop draws from.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod buffer_pool;
mod capacity;
mod events;
mod types;

pub use buffer_pool::{BufferPool, PooledBuffer};
pub use capacity::{CapacityConfig, CapacityConfigError, CapacityController, CapacityMode};
pub use events::{
    DeferredPublishError, DeferredPublisher, Event, EventBus, EventEnvelope, EventKind, EventKinds,
    HandlerFault, HandlerResult, LocalOnlyEvent, PersistentEvent, SubscriptionError,
    SubscriptionHandle, TransientEvent,
};
pub use types::{AuthorityId, EventPriority, SubscriptionId, AUTHORITY_ID_UNSET};
