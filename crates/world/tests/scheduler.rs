//! Cooperative scheduler tests: tie-breaking, completion semantics, waits.

use anyhow::anyhow;
use clock::{Clock, ManualClock};
use conduit::Reader;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use world::{named, ControlLoop, Step, StopReader, World, WorldError};

fn manual_world() -> (ManualClock, World) {
    let clock = ManualClock::new();
    let world = World::with_clock(Arc::new(clock.clone()));
    (clock, world)
}

/// Loops due at the same instant are serviced in strict registration
/// order, round after round.
#[test]
fn same_instant_ties_resolve_in_registration_order() {
    let (_clock, world) = manual_world();
    let order = Arc::new(Mutex::new(Vec::new()));

    let recorder = |tag: &'static str| {
        let order = Arc::clone(&order);
        named(
            tag,
            move |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
                order.lock().push(tag);
                Ok(Step::Sleep(Duration::ZERO))
            },
        )
    };

    let loops: Vec<Box<dyn ControlLoop>> =
        vec![Box::new(recorder("a")), Box::new(recorder("b"))];
    let mut sched = world.interleave(loops);
    for _ in 0..6 {
        sched
            .next()
            .expect("both loops still scheduled")
            .expect("no loop failure");
    }

    assert_eq!(*order.lock(), vec!["a", "b", "a", "b", "a", "b"]);
}

/// One loop finishing sets the stop flag without force-cancelling its
/// siblings; they keep getting scheduled and exit by observing the flag.
#[test]
fn completion_sets_stop_but_keeps_scheduling_siblings() {
    let (_clock, world) = manual_world();

    let polite = |steps: &Arc<AtomicU32>| {
        let steps = Arc::clone(steps);
        move |stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
            steps.fetch_add(1, Ordering::SeqCst);
            let stopping = stop.read().map(|m| m.data).unwrap_or(false);
            if stopping {
                Ok(Step::Done)
            } else {
                Ok(Step::Sleep(Duration::ZERO))
            }
        }
    };

    let a_steps = Arc::new(AtomicU32::new(0));
    let b_steps = Arc::new(AtomicU32::new(0));
    let c_steps = Arc::new(AtomicU32::new(0));

    let finite = {
        let b_steps = Arc::clone(&b_steps);
        move |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
            let step = b_steps.fetch_add(1, Ordering::SeqCst) + 1;
            if step <= 2 {
                Ok(Step::Sleep(Duration::ZERO))
            } else {
                Ok(Step::Done)
            }
        }
    };

    let loops: Vec<Box<dyn ControlLoop>> = vec![
        Box::new(named("a", polite(&a_steps))),
        Box::new(named("b", finite)),
        Box::new(named("c", polite(&c_steps))),
    ];
    let mut sched = world.interleave(loops);

    // Seven waits come out before the finite loop's third step: two full
    // rounds of three plus the first loop of round three.
    for _ in 0..7 {
        assert!(!world.should_stop());
        sched
            .next()
            .expect("loops still scheduled")
            .expect("no loop failure");
    }

    // The finite loop finishes inside the next advance; the siblings are
    // stepped afterwards, observe the flag, and finish too.
    assert!(sched.next().is_none(), "heap drained in the final advance");
    assert!(world.should_stop());
    assert_eq!(b_steps.load(Ordering::SeqCst), 3);
    assert_eq!(a_steps.load(Ordering::SeqCst), 4);
    assert_eq!(c_steps.load(Ordering::SeqCst), 3);
}

/// Yielded waits equal the gap to the next due loop under a frozen clock.
#[test]
fn waits_reflect_time_until_next_due_loop() {
    let (_clock, world) = manual_world();

    let sleeper = |pause: Duration| {
        move |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
            Ok(Step::Sleep(pause))
        }
    };

    let loops: Vec<Box<dyn ControlLoop>> = vec![
        Box::new(named("fast", sleeper(Duration::from_millis(10)))),
        Box::new(named("slow", sleeper(Duration::from_millis(30)))),
    ];
    let mut sched = world.interleave(loops);

    // First loop reschedules 10ms out; the second is still due now.
    assert_eq!(sched.next().unwrap().unwrap(), Duration::ZERO);
    // Second loop reschedules 30ms out; the first is due in 10ms.
    assert_eq!(sched.next().unwrap().unwrap(), Duration::from_millis(10));
    assert_eq!(sched.remaining(), 2);
}

/// A failing loop surfaces its name and is not rescheduled.
#[test]
fn loop_failure_carries_loop_name() {
    let (_clock, world) = manual_world();

    let flaky = named(
        "flaky",
        |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
            Err(anyhow!("sensor offline"))
        },
    );

    let loops: Vec<Box<dyn ControlLoop>> = vec![Box::new(flaky)];
    let mut sched = world.interleave(loops);

    match sched.next() {
        Some(Err(WorldError::LoopFailed { name, source })) => {
            assert_eq!(name, "flaky");
            assert_eq!(source.to_string(), "sensor offline");
        }
        other => panic!("expected LoopFailed, got {other:?}"),
    }
    assert!(sched.next().is_none(), "failed loop is dropped");
}

/// End-to-end: a finite loop finishing flips the stop flag, the other loop
/// observes it, and `run` returns once both are done.
#[test]
fn run_returns_after_all_loops_finish() {
    let world = World::new();
    let ticks = Arc::new(AtomicU32::new(0));

    let finite = {
        let ticks = Arc::clone(&ticks);
        named(
            "counter",
            move |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
                if ticks.fetch_add(1, Ordering::SeqCst) + 1 < 10 {
                    Ok(Step::Sleep(Duration::from_millis(1)))
                } else {
                    Ok(Step::Done)
                }
            },
        )
    };

    let follower = named(
        "follower",
        |stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
            let stopping = stop.read().map(|m| m.data).unwrap_or(false);
            if stopping {
                Ok(Step::Done)
            } else {
                Ok(Step::Sleep(Duration::from_millis(2)))
            }
        },
    );

    let loops: Vec<Box<dyn ControlLoop>> = vec![Box::new(finite), Box::new(follower)];
    world.run(loops).expect("no loop failure");

    assert!(world.should_stop());
    assert_eq!(ticks.load(Ordering::SeqCst), 10);
}
