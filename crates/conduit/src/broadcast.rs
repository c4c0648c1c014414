//! One-to-many fan-out over independent downstream channels.

use crate::local::{local_pipe, LocalReader};
use crate::message::Emitter;
use crate::worker::{worker_pipe, WorkerReader};
use clock::Clock;
use smallvec::SmallVec;
use std::sync::Arc;

/// Emitter that forwards every write to a set of downstream emitters.
///
/// All sinks are attempted on every call, regardless of earlier failures in
/// the same call; the overall result is the logical AND of the individual
/// results. No ordering is guaranteed among the downstream writes.
pub struct BroadcastEmitter<T> {
    sinks: SmallVec<[Box<dyn Emitter<T>>; 4]>,
    clock: Arc<dyn Clock>,
}

impl<T: Clone + Send> BroadcastEmitter<T> {
    /// Composes the given emitters into one fan-out emitter.
    pub fn new(
        sinks: impl IntoIterator<Item = Box<dyn Emitter<T>>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sinks: sinks.into_iter().collect(),
            clock,
        }
    }

    /// Number of downstream emitters.
    pub fn fan_out(&self) -> usize {
        self.sinks.len()
    }
}

impl<T: Clone + Send> Emitter<T> for BroadcastEmitter<T> {
    fn emit(&mut self, data: T) -> bool {
        // Stamp once so every downstream copy carries the same timestamp.
        let ts_ns = self.clock.now_ns();
        self.emit_at(data, ts_ns)
    }

    fn emit_at(&mut self, data: T, ts_ns: u64) -> bool {
        let mut accepted = true;
        for sink in &mut self.sinks {
            accepted &= sink.emit_at(data.clone(), ts_ns);
        }
        accepted
    }
}

/// Builds `n_readers` independent local channels fed by one broadcast
/// emitter.
///
/// Each reader owns its own bounded queue, so a slow reader cannot block or
/// starve the others.
pub fn local_fanout<T: Clone + Send + 'static>(
    n_readers: usize,
    capacity: usize,
    clock: Arc<dyn Clock>,
) -> (BroadcastEmitter<T>, Vec<LocalReader<T>>) {
    let mut sinks: SmallVec<[Box<dyn Emitter<T>>; 4]> = SmallVec::new();
    let mut readers = Vec::with_capacity(n_readers);
    for _ in 0..n_readers {
        let (emitter, reader) = local_pipe(capacity, Arc::clone(&clock));
        sinks.push(Box::new(emitter));
        readers.push(reader);
    }
    (BroadcastEmitter { sinks, clock }, readers)
}

/// Builds `n_readers` independent cross-thread channels fed by one broadcast
/// emitter.
pub fn worker_fanout<T: Clone + Send + 'static>(
    n_readers: usize,
    capacity: usize,
    clock: Arc<dyn Clock>,
) -> (BroadcastEmitter<T>, Vec<WorkerReader<T>>) {
    let mut sinks: SmallVec<[Box<dyn Emitter<T>>; 4]> = SmallVec::new();
    let mut readers = Vec::with_capacity(n_readers);
    for _ in 0..n_readers {
        let (emitter, reader) = worker_pipe(capacity, Arc::clone(&clock));
        sinks.push(Box::new(emitter));
        readers.push(reader);
    }
    (BroadcastEmitter { sinks, clock }, readers)
}
