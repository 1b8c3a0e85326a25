//! Typed publish/subscribe for game middleware hosts.
//!
//! One [`EventBus`] per host, living on the simulation thread. Events are
//! plain structs implementing [`Event`]; handlers subscribe by concrete
//! type or by any declared capability kind and run in ascending
//! (priority, registration order) per publish. Other threads feed the bus
//! through a [`DeferredPublisher`]; the simulation thread drains those
//! entries whenever it calls [`EventBus::publish_deferred_events`].

mod bus;
mod envelope;
mod error;
mod event;
mod subscription;

pub use bus::{DeferredPublisher, EventBus};
pub use envelope::EventEnvelope;
pub use error::{DeferredPublishError, HandlerFault, HandlerResult, SubscriptionError};
pub use event::{Event, EventKind, EventKinds, LocalOnlyEvent, PersistentEvent, TransientEvent};
pub use subscription::SubscriptionHandle;
