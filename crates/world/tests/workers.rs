//! Worker lifecycle tests: stop propagation, escalating shutdown, slots.

use anyhow::anyhow;
use clock::Clock;
use std::time::{Duration, Instant};
use world::{named, ControlLoop, Step, StopReader, World};

/// Polls `world.should_stop()` until it flips or the deadline passes.
fn wait_for_stop(world: &World, deadline: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if world.should_stop() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    world.should_stop()
}

/// A worker finishing normally signals the whole group to stop.
#[test]
fn worker_completion_sets_stop_flag() {
    let mut world = World::new();
    let one_shot = named(
        "one-shot",
        |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> { Ok(Step::Done) },
    );

    world.start_workers(vec![Box::new(one_shot) as Box<dyn ControlLoop>]);
    assert!(wait_for_stop(&world, Duration::from_secs(2)));
    world.exit();
}

/// A worker failure is contained: the parent observes the stop flag, not a
/// propagated panic.
#[test]
fn worker_failure_is_contained_and_sets_stop_flag() {
    let mut world = World::new();
    let crashing = named(
        "crashing",
        |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
            Err(anyhow!("actuator fault"))
        },
    );

    world.start_workers(vec![Box::new(crashing) as Box<dyn ControlLoop>]);
    assert!(wait_for_stop(&world, Duration::from_secs(2)));
    world.exit();
}

/// A worker that never checks the stop flag but sleeps between steps is
/// interrupted by the terminate tier: exit takes the 3s graceful window
/// but not the full 5s escalation.
#[test]
fn sleeping_worker_is_terminated_in_second_tier() {
    let mut world = World::new();
    let oblivious = named(
        "oblivious",
        |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
            Ok(Step::Sleep(Duration::from_secs(60)))
        },
    );

    world.start_workers(vec![Box::new(oblivious) as Box<dyn ControlLoop>]);
    // Give the worker time to enter its long sleep.
    std::thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    world.exit();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "graceful tier ran: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "terminate tier interrupted the sleep: {elapsed:?}");
}

/// A worker stuck inside a step cannot be interrupted; exit abandons it
/// after both escalation windows instead of blocking forever.
#[test]
fn stuck_worker_is_abandoned_in_third_tier() {
    let mut world = World::new();
    let stuck = named(
        "stuck",
        |_stop: &mut StopReader, _clock: &dyn Clock| -> anyhow::Result<Step> {
            // Spin well past both escalation windows, then bail out so the
            // detached thread does not outlive the test binary by much.
            let start = Instant::now();
            while start.elapsed() < Duration::from_secs(15) {
                std::hint::spin_loop();
            }
            Ok(Step::Done)
        },
    );

    world.start_workers(vec![Box::new(stuck) as Box<dyn ControlLoop>]);
    std::thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    world.exit();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(5), "both tiers ran: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(8), "exit did not block on the stuck step: {elapsed:?}");
}

/// Allocating a shared slot before entering the world is a programmer
/// error.
#[test]
#[should_panic(expected = "entered")]
fn shared_slot_requires_entered_world() {
    let mut world = World::new();
    let _ = world.shared_slot::<Vec<u8>>();
}

/// Slots allocated by a world are closed when it exits; later emits fail.
#[test]
fn exit_closes_allocated_slots() {
    use conduit::{Emitter, Reader};

    let mut world = World::new();
    world.enter();
    let (mut emitter, mut reader) = world.shared_slot::<u32>();

    assert!(emitter.emit(3));
    assert_eq!(reader.read().map(|m| m.data), Some(3));

    world.exit();
    assert!(!emitter.emit(4), "closed slot rejects writes");
    assert_eq!(reader.read().map(|m| m.data), Some(3));
}
