//! End-to-end: a simulated host main loop wiring the deferred event queue
//! into the capacity controller, the way a server would report per-tick
//! intake against its budget.

use std::thread;

use shoal_shared::CapacityConfig;
use shoal_test::{shared_counter, StateDelta, TickLoop};

#[test]
fn burst_of_deferred_traffic_grows_intake_then_quiet_shrinks_it() {
    let config = CapacityConfig {
        adaptive_scaling: true,
        baseline_size: 200,
        max_size: 2000,
    };
    let mut host = TickLoop::new(&config, 6);
    assert_eq!(host.controller.current_capacity(), 200);

    let delivered = shared_counter();
    let tally = delivered.clone();
    host.bus.subscribe::<StateDelta, _>(move |_, _| {
        tally.set(tally.get() + 1);
        Ok(())
    });

    // a worker floods the queue before the next tick drains it
    let publisher = host.bus.deferred_publisher();
    let worker = thread::spawn(move || {
        for step in 0..180 {
            publisher
                .try_publish(StateDelta {
                    key: "pos",
                    value: step,
                    at: 0.0,
                })
                .unwrap();
        }
    });
    worker.join().unwrap();

    assert_eq!(host.tick(1.1), 180);
    // 180 of 200 is a 90% window peak, the controller reacts at once
    assert_eq!(host.controller.current_capacity(), 300);
    assert_eq!(delivered.get(), 180);

    // quiet ticks: the dwell arms on the first and fires on the sixth
    for _ in 0..6 {
        host.tick(1.1);
    }
    assert_eq!(host.controller.current_capacity(), 200);
    assert_eq!(delivered.get(), 180);
}

#[test]
fn intake_counts_come_from_each_ticks_drain() {
    let config = CapacityConfig {
        adaptive_scaling: true,
        baseline_size: 100,
        max_size: 1000,
    };
    let mut host = TickLoop::new(&config, 2);

    for step in 0..95 {
        host.bus.publish_asap(StateDelta {
            key: "hp",
            value: step,
            at: 0.0,
        });
    }
    assert_eq!(host.tick(1.1), 95);
    // 95 of 100: grow, with the minimum increment beating the 1.5x factor
    assert_eq!(host.controller.current_capacity(), 200);

    for step in 0..60 {
        host.bus.publish_asap(StateDelta {
            key: "hp",
            value: step,
            at: 0.0,
        });
    }
    assert_eq!(host.tick(1.1), 60);
    // 60 of 200 sits in the hold band, nothing moves
    assert_eq!(host.controller.current_capacity(), 200);
}
