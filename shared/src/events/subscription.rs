use std::{cell::RefCell, rc::Weak};

use crate::{
    events::{
        bus::BusInner,
        error::SubscriptionError,
        event::EventKind,
    },
    types::{EventPriority, SubscriptionId},
};

/// Handle returned by every subscribe call, used to manage the subscription
/// for as long as it should stay active. Dropping the handle does NOT
/// unsubscribe; call [`SubscriptionHandle::unsubscribe`] (or
/// [`SubscriptionHandle::dispose`]) when deliveries should stop.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    target_kind: EventKind,
    bus: Weak<RefCell<BusInner>>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        id: SubscriptionId,
        target_kind: EventKind,
        bus: Weak<RefCell<BusInner>>,
    ) -> Self {
        Self {
            id,
            target_kind,
            bus,
        }
    }

    /// Identifier of the subscription, unique for the lifetime of the bus
    /// that issued it. Also the tie-breaker between handlers of equal
    /// priority: lower ids registered earlier and run earlier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The kind the subscription was registered against.
    pub fn target_kind(&self) -> EventKind {
        self.target_kind
    }

    /// Returns whether the subscription still receives events. False after
    /// [`SubscriptionHandle::unsubscribe`], or once the bus itself has been
    /// dropped.
    pub fn is_active(&self) -> bool {
        let Some(bus) = self.bus.upgrade() else {
            return false;
        };
        let active = bus.borrow().is_subscription_active(self.id);
        active
    }

    /// Removes the subscription from the bus. Returns true if this call is
    /// the one that deactivated it, false if it was already inactive or the
    /// bus is gone. Safe to call repeatedly, and safe to call from inside a
    /// handler mid-dispatch: the current dispatch skips the handler from
    /// that point on.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(bus) = self.bus.upgrade() else {
            return false;
        };
        let deactivated = bus
            .borrow_mut()
            .deactivate_subscription(self.id, self.target_kind);
        deactivated
    }

    /// Changes the subscription's priority. Lower values run earlier; the
    /// default for new subscriptions is 0. Takes effect from the next
    /// publish call, never mid-dispatch.
    ///
    /// Returns an error if the subscription is no longer active or the bus
    /// has been dropped.
    pub fn try_set_priority(
        &mut self,
        priority: EventPriority,
    ) -> Result<(), SubscriptionError> {
        let Some(bus) = self.bus.upgrade() else {
            return Err(SubscriptionError::BusDropped { id: self.id });
        };
        let updated =
            bus.borrow_mut()
                .set_subscription_priority(self.id, self.target_kind, priority);
        if updated {
            Ok(())
        } else {
            Err(SubscriptionError::NotActive { id: self.id })
        }
    }

    /// Changes the subscription's priority. Lower values run earlier.
    ///
    /// # Panics
    ///
    /// Panics if the subscription is no longer active or the bus has been
    /// dropped. Consider using `try_set_priority` for non-panicking error
    /// handling.
    pub fn set_priority(&mut self, priority: EventPriority) {
        self.try_set_priority(priority)
            .expect("set_priority called on an inactive subscription")
    }

    /// Unsubscribes and consumes the handle, for callers that are done with
    /// the subscription for good.
    pub fn dispose(mut self) {
        self.unsubscribe();
    }
}
