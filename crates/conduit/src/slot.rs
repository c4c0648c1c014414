//! Single-slot coalescing channel for large payloads.
//!
//! The slot keeps only the newest message: a write overwrites whatever the
//! reader has not consumed yet and bumps a write sequence the reader uses to
//! detect fresh data. Payloads move by ownership transfer, never by copy. An
//! auxiliary bounded control queue records coalesced writes so a consumer
//! can observe backpressure without inspecting payloads.

use crate::message::{Emitter, Message, Reader};
use clock::Clock;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const CONTROL_QUEUE_CAPACITY: usize = 16;

struct SlotState<T> {
    value: Option<Message<T>>,
    write_seq: u64,
}

struct Shared<T> {
    state: Mutex<SlotState<T>>,
    closed: Arc<AtomicBool>,
}

/// Write half of a [`slot_pipe`].
pub struct SlotEmitter<T> {
    shared: Arc<Shared<T>>,
    clock: Arc<dyn Clock>,
    coalesced_tx: Sender<u64>,
}

/// Read half of a [`slot_pipe`].
pub struct SlotReader<T> {
    shared: Arc<Shared<T>>,
    latest: Option<Message<T>>,
    seen_seq: u64,
    coalesced_rx: Receiver<u64>,
}

/// Close handle retained by the owning world.
///
/// Closing is one-way: further emits on the channel report failure. Only the
/// world that allocated the slot may close it.
#[derive(Clone)]
pub struct SlotHandle {
    closed: Arc<AtomicBool>,
}

impl SlotHandle {
    /// Marks the channel closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Creates a single-slot coalescing emitter/reader pair plus the close
/// handle for the owning world.
pub fn slot_pipe<T: Send>(clock: Arc<dyn Clock>) -> (SlotEmitter<T>, SlotReader<T>, SlotHandle) {
    let closed = Arc::new(AtomicBool::new(false));
    let shared = Arc::new(Shared {
        state: Mutex::new(SlotState {
            value: None,
            write_seq: 0,
        }),
        closed: Arc::clone(&closed),
    });
    let (coalesced_tx, coalesced_rx) = bounded(CONTROL_QUEUE_CAPACITY);
    let emitter = SlotEmitter {
        shared: Arc::clone(&shared),
        clock,
        coalesced_tx,
    };
    let reader = SlotReader {
        shared,
        latest: None,
        seen_seq: 0,
        coalesced_rx,
    };
    (emitter, reader, SlotHandle { closed })
}

impl<T: Send> Emitter<T> for SlotEmitter<T> {
    fn emit(&mut self, data: T) -> bool {
        let ts_ns = self.clock.now_ns();
        self.emit_at(data, ts_ns)
    }

    fn emit_at(&mut self, data: T, ts_ns: u64) -> bool {
        if self.shared.closed.load(Ordering::Acquire) {
            return false;
        }
        let coalesced = {
            let mut state = self.shared.state.lock();
            let coalesced = state.value.is_some();
            state.value = Some(Message::new(data, ts_ns));
            state.write_seq += 1;
            coalesced
        };
        if coalesced {
            // Best-effort backpressure note; dropped when the control
            // queue itself is full.
            let _ = self.coalesced_tx.try_send(ts_ns);
        }
        true
    }
}

impl<T: Send> Reader<T> for SlotReader<T> {
    fn read(&mut self) -> Option<&Message<T>> {
        {
            let mut state = self.shared.state.lock();
            if state.write_seq != self.seen_seq {
                self.seen_seq = state.write_seq;
                if let Some(message) = state.value.take() {
                    self.latest = Some(message);
                }
            }
        }
        self.latest.as_ref()
    }
}

impl<T> SlotReader<T> {
    /// Drains the control queue and returns how many writes were coalesced
    /// since the last call.
    pub fn coalesced_writes(&self) -> usize {
        self.coalesced_rx.try_iter().count()
    }
}
