//! Cooperative interleaving of control loops in the calling thread.
//!
//! The scheduler is single-threaded and non-preemptive: only one loop
//! executes at a time and suspension is exactly the pause a step reports.
//! A min-heap keyed on due time picks the loop to advance; exact ties
//! resolve by a monotonically increasing sequence number, so loops that
//! repeatedly come due at the same instant are serviced in registration
//! order.

use crate::control::{ControlLoop, Step};
use crate::error::WorldError;
use crate::signal::{StopReader, StopSignal};
use clock::Clock;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

struct Entry {
    due_ns: u64,
    seq: u64,
    name: String,
    control_loop: Box<dyn ControlLoop>,
    stop_reader: StopReader,
}

impl Entry {
    fn key(&self) -> (u64, u64) {
        (self.due_ns, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Iterator produced by [`World::interleave`](crate::World::interleave).
///
/// Each `next` advances the loop that is due soonest and returns how long
/// the caller should sleep before driving the iterator again; the iterator
/// itself never sleeps. A loop finishing naturally sets the world's stop
/// flag but does not force its siblings to stop — they observe the flag
/// through their own [`StopReader`] and must exit on their own for the
/// iterator to become exhausted.
pub struct Interleave {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    stop: StopSignal,
    clock: Arc<dyn Clock>,
}

impl Interleave {
    pub(crate) fn new(
        loops: Vec<Box<dyn ControlLoop>>,
        stop: StopSignal,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let start_ns = clock.now_ns();
        let mut heap = BinaryHeap::with_capacity(loops.len());
        let mut next_seq = 0;
        for control_loop in loops {
            heap.push(Reverse(Entry {
                due_ns: start_ns,
                seq: next_seq,
                name: control_loop.name(),
                stop_reader: stop.reader(Arc::clone(&clock)),
                control_loop,
            }));
            next_seq += 1;
        }
        Self {
            heap,
            next_seq,
            stop,
            clock,
        }
    }

    /// Number of loops still scheduled.
    pub fn remaining(&self) -> usize {
        self.heap.len()
    }
}

impl Iterator for Interleave {
    type Item = Result<Duration, WorldError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Reverse(mut entry) = self.heap.pop()?;
            match entry
                .control_loop
                .step(&mut entry.stop_reader, self.clock.as_ref())
            {
                Ok(Step::Sleep(pause)) => {
                    let now_ns = self.clock.now_ns();
                    entry.due_ns =
                        now_ns.saturating_add(pause.as_nanos().min(u64::MAX as u128) as u64);
                    entry.seq = self.next_seq;
                    self.next_seq += 1;
                    self.heap.push(Reverse(entry));
                    let next_due = self
                        .heap
                        .peek()
                        .map(|Reverse(head)| head.due_ns)
                        .expect("heap holds the entry just pushed");
                    let wait_ns = next_due.saturating_sub(self.clock.now_ns());
                    return Some(Ok(Duration::from_nanos(wait_ns)));
                }
                Ok(Step::Done) => {
                    // One loop finishing asks the whole group to wind
                    // down; siblings are never force-cancelled.
                    self.stop.set();
                }
                Err(source) => {
                    return Some(Err(WorldError::LoopFailed {
                        name: entry.name,
                        source,
                    }));
                }
            }
        }
    }
}
