use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    mem,
    rc::Rc,
    sync::{Arc, Mutex, Weak},
};

use crate::{
    events::{
        envelope::EventEnvelope,
        error::{DeferredPublishError, HandlerResult},
        event::{Event, EventKind},
        subscription::SubscriptionHandle,
    },
    types::{AuthorityId, EventPriority, SubscriptionId, AUTHORITY_ID_UNSET},
};

type SharedHandler = Rc<dyn Fn(&EventEnvelope) -> HandlerResult>;
type SharedFilter = Rc<dyn Fn(&EventEnvelope) -> bool>;

/// One registered handler, owned by the bus registry. Callers only ever hold
/// a [`SubscriptionHandle`] pointing back at it.
#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    priority: EventPriority,
    handler: SharedHandler,
    filter: Option<SharedFilter>,
}

/// An event captured on a producer thread, waiting for the consumer thread
/// to drain it. Entries without an explicit source resolve to the bus's own
/// authority id at dispatch time.
struct DeferredEntry {
    event: Box<dyn Event>,
    source_authority_id: Option<AuthorityId>,
}

/// Typed publish/subscribe bus for a single consumer thread.
///
/// Handlers subscribe to a concrete event type or to any kind the event
/// declares through [`Event::supertype_kinds`], and a publish invokes every
/// matching handler in ascending (priority, registration order) across the
/// whole matched set. Each handler runs inside its own fault boundary:
/// a handler returning an error never stops delivery to the rest, it only
/// bumps the fault count `publish` reports back.
///
/// The bus itself must stay on the thread that created it. Producer threads
/// hand events over through [`EventBus::deferred_publisher`]; the consumer
/// thread delivers those by calling [`EventBus::publish_deferred_events`]
/// at its own cadence.
///
/// Cloning is shallow: clones share one registry and one deferred queue,
/// which is how a handler gets a bus of its own to publish re-entrantly.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
    deferred: Arc<Mutex<VecDeque<DeferredEntry>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner::new())),
            deferred: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Authority id published events are stamped with when no explicit
    /// source is given. Starts as [`AUTHORITY_ID_UNSET`].
    pub fn authority_id(&self) -> AuthorityId {
        self.inner.borrow().authority_id
    }

    pub fn set_authority_id(&self, authority_id: AuthorityId) {
        self.inner.borrow_mut().authority_id = authority_id;
    }

    /// Registers `handler` for every published event whose concrete type is
    /// `E`. New subscriptions start at priority 0; use the returned handle
    /// to change that or to unsubscribe.
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionHandle
    where
        E: Event,
        F: Fn(&EventEnvelope, &E) -> HandlerResult + 'static,
    {
        self.register(EventKind::of::<E>(), Self::narrowing_handler(handler), None)
    }

    /// Like [`EventBus::subscribe`], with a predicate consulted before every
    /// delivery. The handler only runs when `filter` returns true.
    pub fn subscribe_filtered<E, F, P>(&self, handler: F, filter: P) -> SubscriptionHandle
    where
        E: Event,
        F: Fn(&EventEnvelope, &E) -> HandlerResult + 'static,
        P: Fn(&EventEnvelope, &E) -> bool + 'static,
    {
        let filter: SharedFilter = Rc::new(move |envelope: &EventEnvelope| {
            match envelope.event_as::<E>() {
                Some(event) => filter(envelope, event),
                None => false,
            }
        });
        self.register(
            EventKind::of::<E>(),
            Self::narrowing_handler(handler),
            Some(filter),
        )
    }

    /// Registers `handler` for every published event that resolves to
    /// `target_kind`. This is the way to subscribe to a capability trait or
    /// to [`EventKind::any_event`]; the handler narrows through the envelope
    /// when it needs a concrete type.
    pub fn subscribe_to_kind<F>(&self, target_kind: EventKind, handler: F) -> SubscriptionHandle
    where
        F: Fn(&EventEnvelope) -> HandlerResult + 'static,
    {
        self.register(target_kind, Rc::new(handler), None)
    }

    /// Like [`EventBus::subscribe_to_kind`], with a predicate consulted
    /// before every delivery.
    pub fn subscribe_to_kind_filtered<F, P>(
        &self,
        target_kind: EventKind,
        handler: F,
        filter: P,
    ) -> SubscriptionHandle
    where
        F: Fn(&EventEnvelope) -> HandlerResult + 'static,
        P: Fn(&EventEnvelope) -> bool + 'static,
    {
        self.register(target_kind, Rc::new(handler), Some(Rc::new(filter)))
    }

    /// Dispatches `event` to every matching active subscription, in
    /// ascending (priority, registration order) across the whole matched
    /// set. Returns the number of handlers that faulted; faults are never
    /// re-raised and never logged here, the count is the caller's to act on.
    ///
    /// Publishing with no matching subscription is a cheap no-op returning 0.
    pub fn publish<E: Event>(&self, event: &E) -> usize {
        self.dispatch(event, None)
    }

    /// Same as [`EventBus::publish`], stamping the envelope with the
    /// authority id of the remote host the event originated from.
    pub fn publish_from<E: Event>(&self, event: &E, source_authority_id: AuthorityId) -> usize {
        self.dispatch(event, Some(source_authority_id))
    }

    /// Enqueues `event` for delivery during the next
    /// [`EventBus::publish_deferred_events`] call. No handler runs now.
    ///
    /// # Panics
    ///
    /// Panics if the deferred queue mutex was poisoned by a panicked
    /// producer thread.
    pub fn publish_asap<E: Event>(&self, event: E) {
        let Ok(mut queue) = self.deferred.lock() else {
            panic!("deferred event queue mutex poisoned by a panicked producer thread");
        };
        queue.push_back(DeferredEntry {
            event: Box::new(event),
            source_authority_id: None,
        });
    }

    /// Returns a cloneable, thread-safe producer handle for the deferred
    /// queue. Publishing through it fails once every clone of the bus has
    /// been dropped.
    pub fn deferred_publisher(&self) -> DeferredPublisher {
        DeferredPublisher {
            queue: Arc::downgrade(&self.deferred),
        }
    }

    /// Drains the deferred queue as of the start of the call and dispatches
    /// each drained event exactly as [`EventBus::publish`] would. Events
    /// enqueued while the drain is running wait for the next call. Returns
    /// the number of events dispatched; handler faults are fire-and-forget
    /// here. Safe to call with an empty queue.
    pub fn try_publish_deferred_events(&self) -> Result<usize, DeferredPublishError> {
        let drained = {
            let Ok(mut queue) = self.deferred.lock() else {
                return Err(DeferredPublishError::QueuePoisoned);
            };
            Vec::from(mem::take(&mut *queue))
        };
        let drained_count = drained.len();
        for entry in drained {
            self.dispatch(entry.event.as_ref(), entry.source_authority_id);
        }
        Ok(drained_count)
    }

    /// Drains and dispatches the deferred queue.
    ///
    /// # Panics
    ///
    /// Panics if the deferred queue mutex was poisoned by a panicked
    /// producer thread. Consider using `try_publish_deferred_events` for
    /// non-panicking error handling.
    pub fn publish_deferred_events(&self) -> usize {
        self.try_publish_deferred_events()
            .expect("deferred event queue mutex poisoned by a panicked producer thread")
    }

    fn register(
        &self,
        target_kind: EventKind,
        handler: SharedHandler,
        filter: Option<SharedFilter>,
    ) -> SubscriptionHandle {
        let id = self
            .inner
            .borrow_mut()
            .register(target_kind, handler, filter);
        SubscriptionHandle::new(id, target_kind, Rc::downgrade(&self.inner))
    }

    fn narrowing_handler<E, F>(handler: F) -> SharedHandler
    where
        E: Event,
        F: Fn(&EventEnvelope, &E) -> HandlerResult + 'static,
    {
        Rc::new(move |envelope: &EventEnvelope| {
            match envelope.event_as::<E>() {
                Some(event) => handler(envelope, event),
                // a kind collision would be a registry bug; stay silent
                // rather than fault a handler that never ran
                None => Ok(()),
            }
        })
    }

    fn dispatch(&self, event: &dyn Event, source: Option<AuthorityId>) -> usize {
        let event_kind = EventKind::from(event.as_any().type_id());

        // Snapshot phase. The registry borrow is released before any handler
        // runs, so handlers are free to subscribe, unsubscribe, and publish
        // again from inside this dispatch.
        let (mut matched, source_authority_id, is_source_remote, is_transient, is_persistent, is_local_only) = {
            let mut inner = self.inner.borrow_mut();
            if inner.subscribers.is_empty() {
                return 0;
            }
            let closure = inner.kind_closure(event_kind, event);
            let mut matched: Vec<Subscriber> = Vec::new();
            for kind in &closure {
                if let Some(bucket) = inner.subscribers.get(kind) {
                    matched.extend(bucket.iter().cloned());
                }
            }
            if matched.is_empty() {
                return 0;
            }
            let own_authority_id = inner.authority_id;
            let source_authority_id = source.unwrap_or(own_authority_id);
            (
                matched,
                source_authority_id,
                source_authority_id != own_authority_id,
                closure.contains(&EventKind::transient()),
                closure.contains(&EventKind::persistent()),
                closure.contains(&EventKind::local_only()),
            )
        };

        matched.sort_unstable_by_key(|subscriber| (subscriber.priority, subscriber.id));

        let envelope = EventEnvelope::new(
            event,
            event_kind,
            source_authority_id,
            is_source_remote,
            is_transient,
            is_persistent,
            is_local_only,
        );

        let mut fault_count = 0;
        for subscriber in &matched {
            // skip subscriptions an earlier handler removed mid-dispatch
            if !self.inner.borrow().is_subscription_active(subscriber.id) {
                continue;
            }
            if let Some(filter) = &subscriber.filter {
                if !filter(&envelope) {
                    continue;
                }
            }
            if (subscriber.handler)(&envelope).is_err() {
                fault_count += 1;
            }
        }
        fault_count
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer-side handle for [`EventBus::publish_asap`]-style publishing from
/// other threads. Clone one per producer; entries from a single producer
/// are delivered in the order that producer enqueued them.
#[derive(Clone)]
pub struct DeferredPublisher {
    queue: Weak<Mutex<VecDeque<DeferredEntry>>>,
}

impl DeferredPublisher {
    /// Enqueues `event` for the consumer thread's next drain.
    pub fn try_publish<E: Event>(&self, event: E) -> Result<(), DeferredPublishError> {
        self.try_enqueue(Box::new(event), None)
    }

    /// Enqueues `event` stamped with the authority id of the remote host it
    /// originated from.
    pub fn try_publish_from<E: Event>(
        &self,
        event: E,
        source_authority_id: AuthorityId,
    ) -> Result<(), DeferredPublishError> {
        self.try_enqueue(Box::new(event), Some(source_authority_id))
    }

    /// Enqueues `event` for the consumer thread's next drain.
    ///
    /// # Panics
    ///
    /// Panics if the bus has been dropped or the queue mutex is poisoned.
    /// Consider using `try_publish` for non-panicking error handling.
    pub fn publish<E: Event>(&self, event: E) {
        self.try_publish(event)
            .expect("deferred publish failed, bus dropped or queue poisoned")
    }

    /// Enqueues `event` with an explicit remote source authority id.
    ///
    /// # Panics
    ///
    /// Panics if the bus has been dropped or the queue mutex is poisoned.
    /// Consider using `try_publish_from` for non-panicking error handling.
    pub fn publish_from<E: Event>(&self, event: E, source_authority_id: AuthorityId) {
        self.try_publish_from(event, source_authority_id)
            .expect("deferred publish failed, bus dropped or queue poisoned")
    }

    fn try_enqueue(
        &self,
        event: Box<dyn Event>,
        source_authority_id: Option<AuthorityId>,
    ) -> Result<(), DeferredPublishError> {
        let Some(queue) = self.queue.upgrade() else {
            return Err(DeferredPublishError::BusDropped);
        };
        let Ok(mut queue) = queue.lock() else {
            return Err(DeferredPublishError::QueuePoisoned);
        };
        queue.push_back(DeferredEntry {
            event,
            source_authority_id,
        });
        Ok(())
    }
}

pub(crate) struct BusInner {
    subscribers: HashMap<EventKind, Vec<Subscriber>>,
    // subscription id -> target kind, for O(1) liveness checks
    index: HashMap<SubscriptionId, EventKind>,
    // concrete kind -> full resolved kind set, built once per event type
    kind_closures: HashMap<EventKind, Vec<EventKind>>,
    next_subscription_id: SubscriptionId,
    authority_id: AuthorityId,
}

impl BusInner {
    fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            index: HashMap::new(),
            kind_closures: HashMap::new(),
            next_subscription_id: 0,
            authority_id: AUTHORITY_ID_UNSET,
        }
    }

    fn register(
        &mut self,
        target_kind: EventKind,
        handler: SharedHandler,
        filter: Option<SharedFilter>,
    ) -> SubscriptionId {
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.subscribers
            .entry(target_kind)
            .or_default()
            .push(Subscriber {
                id,
                priority: 0,
                handler,
                filter,
            });
        self.index.insert(id, target_kind);
        id
    }

    pub(crate) fn is_subscription_active(&self, id: SubscriptionId) -> bool {
        self.index.contains_key(&id)
    }

    pub(crate) fn deactivate_subscription(
        &mut self,
        id: SubscriptionId,
        target_kind: EventKind,
    ) -> bool {
        if self.index.remove(&id).is_none() {
            return false;
        }
        if let Some(bucket) = self.subscribers.get_mut(&target_kind) {
            bucket.retain(|subscriber| subscriber.id != id);
            if bucket.is_empty() {
                self.subscribers.remove(&target_kind);
            }
        }
        true
    }

    pub(crate) fn set_subscription_priority(
        &mut self,
        id: SubscriptionId,
        target_kind: EventKind,
        priority: EventPriority,
    ) -> bool {
        let Some(bucket) = self.subscribers.get_mut(&target_kind) else {
            return false;
        };
        let Some(subscriber) = bucket.iter_mut().find(|subscriber| subscriber.id == id) else {
            return false;
        };
        subscriber.priority = priority;
        true
    }

    /// Full set of kinds `event` resolves to: its concrete kind, every kind
    /// it declares through [`Event::supertype_kinds`], and the any-event
    /// root kind, deduplicated so no subscription can match twice. Built
    /// once per concrete type, then served from cache.
    fn kind_closure(&mut self, event_kind: EventKind, event: &dyn Event) -> Vec<EventKind> {
        if let Some(closure) = self.kind_closures.get(&event_kind) {
            return closure.clone();
        }
        let declared = event.supertype_kinds();
        let mut closure: Vec<EventKind> = Vec::with_capacity(declared.len() + 2);
        closure.push(event_kind);
        for kind in declared.iter() {
            if !closure.contains(kind) {
                closure.push(*kind);
            }
        }
        let root = EventKind::any_event();
        if !closure.contains(&root) {
            closure.push(root);
        }
        self.kind_closures.insert(event_kind, closure.clone());
        closure
    }
}
