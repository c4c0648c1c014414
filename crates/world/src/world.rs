//! World lifecycle: stop signal, channel factories, workers, scheduler.

use crate::control::ControlLoop;
use crate::error::WorldError;
use crate::sched::Interleave;
use crate::signal::{StopReader, StopSignal};
use crate::worker::{spawn_worker, WorkerHandle};
use clock::{Clock, MonotonicClock};
use conduit::{
    local_fanout, local_pipe, slot_pipe, worker_fanout, worker_pipe, BroadcastEmitter,
    LocalEmitter, LocalReader, SlotEmitter, SlotHandle, SlotReader, WorkerEmitter, WorkerReader,
};
use std::sync::Arc;

/// Owner of the stop signal, spawned workers, and shared-slot channels.
///
/// Lifecycle: created → entered → running → stopping → exited. Entering
/// enables shared-slot allocation; exiting sets the stop flag, shuts every
/// worker down through the escalating tiers, and closes every slot channel
/// this world allocated. Dropping an un-exited world exits it.
pub struct World {
    stop: StopSignal,
    clock: Arc<dyn Clock>,
    workers: Vec<WorkerHandle>,
    slots: Vec<SlotHandle>,
    entered: bool,
    exited: bool,
}

impl World {
    /// Creates a world backed by a [`MonotonicClock`].
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    /// Creates a world using the given clock; tests pass a manual clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            stop: StopSignal::new(),
            clock,
            workers: Vec::new(),
            slots: Vec::new(),
            entered: false,
            exited: false,
        }
    }

    /// The clock shared by everything this world wires together.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Enables shared-slot allocation. Must precede any
    /// [`shared_slot`](Self::shared_slot) call.
    pub fn enter(&mut self) {
        self.entered = true;
    }

    /// Whether shutdown has been requested.
    pub fn should_stop(&self) -> bool {
        self.stop.is_set()
    }

    /// Requests shutdown of every loop attached to this world.
    pub fn stop(&self) {
        self.stop.set();
    }

    /// Creates a pollable reader over the world's stop flag.
    pub fn stop_reader(&self) -> StopReader {
        self.stop.reader(self.clock())
    }

    /// Bounded same-process pipe; overflow evicts the oldest message.
    pub fn local_pipe<T: Send>(&self, capacity: usize) -> (LocalEmitter<T>, LocalReader<T>) {
        local_pipe(capacity, self.clock())
    }

    /// Bounded cross-thread pipe; overflow evicts one message and retries
    /// once.
    pub fn worker_pipe<T: Send>(&self, capacity: usize) -> (WorkerEmitter<T>, WorkerReader<T>) {
        worker_pipe(capacity, self.clock())
    }

    /// One-to-many local pipe: `n_readers` independent channels behind one
    /// broadcast emitter.
    pub fn local_fanout<T: Clone + Send + 'static>(
        &self,
        n_readers: usize,
        capacity: usize,
    ) -> (BroadcastEmitter<T>, Vec<LocalReader<T>>) {
        local_fanout(n_readers, capacity, self.clock())
    }

    /// One-to-many cross-thread pipe.
    pub fn worker_fanout<T: Clone + Send + 'static>(
        &self,
        n_readers: usize,
        capacity: usize,
    ) -> (BroadcastEmitter<T>, Vec<WorkerReader<T>>) {
        worker_fanout(n_readers, capacity, self.clock())
    }

    /// Single-slot coalescing channel for large payloads.
    ///
    /// The world retains the close handle and closes the channel at exit.
    /// Calling this before [`enter`](Self::enter) is a programmer error.
    pub fn shared_slot<T: Send>(&mut self) -> (SlotEmitter<T>, SlotReader<T>) {
        assert!(
            self.entered,
            "shared_slot requires an entered world; call enter() first"
        );
        let (emitter, reader, handle) = slot_pipe(self.clock());
        self.slots.push(handle);
        (emitter, reader)
    }

    /// Spawns one worker thread per loop, each wired to the shared stop
    /// flag.
    ///
    /// Any worker finishing — normally, by failing, or by panicking — sets
    /// the stop flag, so the rest of the system notices it is gone.
    pub fn start_workers(&mut self, loops: Vec<Box<dyn ControlLoop>>) {
        for control_loop in loops {
            self.workers
                .push(spawn_worker(control_loop, self.stop.clone(), self.clock()));
        }
    }

    /// Multiplexes the given loops in the calling thread.
    ///
    /// Returns an iterator of wait durations; the caller performs the
    /// sleeps. See [`Interleave`] for the scheduling contract.
    pub fn interleave(&self, loops: Vec<Box<dyn ControlLoop>>) -> Interleave {
        Interleave::new(loops, self.stop.clone(), self.clock())
    }

    /// Drives [`interleave`](Self::interleave) to exhaustion, sleeping for
    /// each returned wait.
    ///
    /// Returns when every loop has finished; a loop failure surfaces
    /// immediately as [`WorldError::LoopFailed`].
    pub fn run(&self, loops: Vec<Box<dyn ControlLoop>>) -> Result<(), WorldError> {
        for wait in self.interleave(loops) {
            std::thread::sleep(wait?);
        }
        Ok(())
    }

    /// Sets the stop flag, shuts down every worker, and closes every slot
    /// channel. Idempotent; also invoked from `Drop`.
    pub fn exit(&mut self) {
        if self.exited {
            return;
        }
        self.stop.set();
        for worker in self.workers.drain(..) {
            worker.shutdown();
        }
        for slot in self.slots.drain(..) {
            slot.close();
        }
        self.entered = false;
        self.exited = true;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.exit();
    }
}
