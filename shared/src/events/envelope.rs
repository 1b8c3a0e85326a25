use crate::{
    events::event::{Event, EventKind},
    types::AuthorityId,
};

/// Immutable wrapper around one published event, handed to every handler and
/// filter of a single dispatch. A fresh envelope is built per publish call;
/// it borrows the event and carries the delivery metadata as plain values so
/// handlers can inspect it without touching the bus.
pub struct EventEnvelope<'e> {
    event: &'e dyn Event,
    event_kind: EventKind,
    source_authority_id: AuthorityId,
    is_source_remote: bool,
    is_transient: bool,
    is_persistent: bool,
    is_local_only: bool,
}

impl<'e> EventEnvelope<'e> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        event: &'e dyn Event,
        event_kind: EventKind,
        source_authority_id: AuthorityId,
        is_source_remote: bool,
        is_transient: bool,
        is_persistent: bool,
        is_local_only: bool,
    ) -> Self {
        Self {
            event,
            event_kind,
            source_authority_id,
            is_source_remote,
            is_transient,
            is_persistent,
            is_local_only,
        }
    }

    pub fn event(&self) -> &dyn Event {
        self.event
    }

    /// Narrows to a concrete event type. Returns `None` when the published
    /// event is of some other concrete type.
    pub fn event_as<E: Event>(&self) -> Option<&E> {
        self.event.as_any().downcast_ref::<E>()
    }

    /// The concrete kind of the published event.
    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    pub fn occurred_at(&self) -> f64 {
        self.event.occurred_at()
    }

    /// Authority id of the host the event originated from.
    pub fn source_authority_id(&self) -> AuthorityId {
        self.source_authority_id
    }

    /// Whether the event was ingested from a remote host rather than
    /// published locally.
    pub fn is_source_remote(&self) -> bool {
        self.is_source_remote
    }

    /// Always the opposite of [`EventEnvelope::is_source_remote`].
    pub fn is_from_me(&self) -> bool {
        !self.is_source_remote
    }

    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn is_persistent(&self) -> bool {
        self.is_persistent
    }

    /// Whether the event must stay on this host. The relay collaborator
    /// consults this flag before transmitting; the bus only preserves it.
    pub fn is_local_only(&self) -> bool {
        self.is_local_only
    }
}
