//! Property-based tests for event bus dispatch invariants.
//!
//! Key invariants:
//! 1. Delivery order is (priority, registration order) across the whole
//!    matched set, regardless of which kind key each subscription used
//! 2. The publish return value counts exactly the faulting handlers
//! 3. Filters narrow delivery without disturbing relative order
//! 4. The deferred queue preserves enqueue order through a drain

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use shoal_shared::{EventBus, EventKind, HandlerFault};
use shoal_test::{PeerJoined, StateDelta};

// Strategy for a batch of subscriptions: (priority, use the root kind?)
fn subscription_plan_strategy() -> impl Strategy<Value = Vec<(i16, bool)>> {
    prop::collection::vec((-100i16..100, any::<bool>()), 1..12)
}

proptest! {
    /// Delivery order is global across kind buckets: priority ascending,
    /// ties broken by registration order
    #[test]
    fn prop_dispatch_order_is_priority_then_registration(
        plan in subscription_plan_strategy(),
    ) {
        let bus = EventBus::new();
        let order: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

        for (index, (priority, use_root_kind)) in plan.iter().enumerate() {
            let seen = order.clone();
            let mut handle = if *use_root_kind {
                bus.subscribe_to_kind(EventKind::any_event(), move |_| {
                    seen.borrow_mut().push(index);
                    Ok(())
                })
            } else {
                bus.subscribe::<PeerJoined, _>(move |_, _| {
                    seen.borrow_mut().push(index);
                    Ok(())
                })
            };
            handle.set_priority(*priority);
        }

        prop_assert_eq!(bus.publish(&PeerJoined { peer: 1, at: 0.0 }), 0);

        let mut expected: Vec<usize> = (0..plan.len()).collect();
        expected.sort_by_key(|index| plan[*index].0);
        prop_assert_eq!(order.borrow().clone(), expected);
    }

    /// The publish return value is exactly the number of faulting handlers,
    /// and a fault never stops later handlers from running
    #[test]
    fn prop_fault_count_matches_faulting_handlers(
        outcomes in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0usize));

        for faults in outcomes.clone() {
            let tally = calls.clone();
            bus.subscribe::<PeerJoined, _>(move |_, _| {
                tally.set(tally.get() + 1);
                if faults {
                    Err(HandlerFault::new("induced"))
                } else {
                    Ok(())
                }
            });
        }

        let expected_faults = outcomes.iter().filter(|faulted| **faulted).count();
        prop_assert_eq!(bus.publish(&PeerJoined { peer: 1, at: 0.0 }), expected_faults);
        prop_assert_eq!(calls.get(), outcomes.len());
    }

    /// Filters drop exactly the rejected deliveries and nothing else
    #[test]
    fn prop_filters_drop_exactly_the_rejected_deliveries(
        gates in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        let bus = EventBus::new();
        let order: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

        for (index, open) in gates.iter().copied().enumerate() {
            let seen = order.clone();
            bus.subscribe_filtered::<PeerJoined, _, _>(
                move |_, _| {
                    seen.borrow_mut().push(index);
                    Ok(())
                },
                move |_, _| open,
            );
        }

        bus.publish(&PeerJoined { peer: 1, at: 0.0 });

        let expected: Vec<usize> = gates
            .iter()
            .enumerate()
            .filter_map(|(index, open)| open.then_some(index))
            .collect();
        prop_assert_eq!(order.borrow().clone(), expected);
    }

    /// A drain hands back every enqueued event in enqueue order
    #[test]
    fn prop_drain_preserves_enqueue_order(
        values in prop::collection::vec(any::<i64>(), 0..40),
    ) {
        let bus = EventBus::new();
        let order: Rc<RefCell<Vec<i64>>> = Rc::new(RefCell::new(Vec::new()));

        let seen = order.clone();
        bus.subscribe::<StateDelta, _>(move |_, event| {
            seen.borrow_mut().push(event.value);
            Ok(())
        });

        for value in &values {
            bus.publish_asap(StateDelta { key: "k", value: *value, at: 0.0 });
        }

        prop_assert_eq!(bus.try_publish_deferred_events(), Ok(values.len()));
        prop_assert_eq!(order.borrow().clone(), values);
    }
}
