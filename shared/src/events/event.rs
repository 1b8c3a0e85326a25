use std::any::{Any, TypeId};

/// Identity of a subscription target: a concrete event type or a capability
/// trait object, e.g. `EventKind::of::<TickSkipped>()` or
/// `EventKind::of::<dyn TransientEvent>()`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EventKind(TypeId);

impl From<TypeId> for EventKind {
    fn from(type_id: TypeId) -> Self {
        Self(type_id)
    }
}

impl EventKind {
    pub fn of<E: ?Sized + 'static>() -> Self {
        Self(TypeId::of::<E>())
    }

    /// The root kind every published event satisfies.
    pub fn any_event() -> Self {
        Self::of::<dyn Event>()
    }

    pub fn transient() -> Self {
        Self::of::<dyn TransientEvent>()
    }

    pub fn persistent() -> Self {
        Self::of::<dyn PersistentEvent>()
    }

    pub fn local_only() -> Self {
        Self::of::<dyn LocalOnlyEvent>()
    }
}

/// The supertype kinds an event type declares beyond its own concrete kind:
/// built-in capabilities plus any user hierarchy traits, chained with
/// [`EventKinds::and`]. The bus appends the root `dyn Event` kind itself, so
/// an event with nothing to declare uses [`EventKinds::none`].
#[derive(Clone, Debug, Default)]
pub struct EventKinds(Vec<EventKind>);

impl EventKinds {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn transient() -> Self {
        Self(vec![EventKind::transient()])
    }

    pub fn persistent() -> Self {
        Self(vec![EventKind::persistent()])
    }

    /// Adds one more kind, typically a user hierarchy trait:
    /// `EventKinds::transient().and::<dyn ConnectionEvent>()`.
    pub fn and<T: ?Sized + 'static>(mut self) -> Self {
        self.0.push(EventKind::of::<T>());
        self
    }

    pub fn and_kind(mut self, kind: EventKind) -> Self {
        self.0.push(kind);
        self
    }

    pub fn contains(&self, kind: &EventKind) -> bool {
        self.0.contains(kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventKind> {
        self.0.iter()
    }
}

/// A domain event.
///
/// Every value published through the bus implements this. Events are plain
/// data: they carry the monotonic time (in seconds) at which they occurred
/// and declare, via [`Event::supertype_kinds`], which capability and
/// hierarchy kinds they can be delivered as. Rust cannot enumerate a type's
/// trait impls at runtime, so an event that implements [`TransientEvent`]
/// must also say so in its declared set (`EventKinds::transient()`), and
/// likewise for every other non-concrete subscription target it should reach.
pub trait Event: Any + Send {
    /// Seconds since an agreed epoch (typically process start) at which the
    /// event occurred. Supplied by the constructor; the bus never rewrites it.
    fn occurred_at(&self) -> f64;

    /// Kinds this event satisfies beyond its concrete kind. The root
    /// `dyn Event` kind is implied and need not be listed.
    fn supertype_kinds(&self) -> EventKinds {
        EventKinds::none()
    }

    fn as_any(&self) -> &dyn Any;
}

/// Capability: the event is not retained for late joiners.
pub trait TransientEvent: Event {
    /// Relay metadata: whether the transport should deliver this event to a
    /// single targeted recipient rather than broadcasting it.
    fn is_singular_recipient_only(&self) -> bool {
        false
    }
}

/// Capability: the event is tagged for the persistent replay log that late
/// joiners receive. The log itself lives outside this crate; the bus only
/// routes and flags consistently.
pub trait PersistentEvent: Event {}

/// Capability: the event must never leave the local host. The relay
/// collaborator checks this flag (via the envelope) before transmitting.
pub trait LocalOnlyEvent: Event {}
