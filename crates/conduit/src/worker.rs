//! Cross-thread bounded channel with evict-then-retry-once overflow.

use crate::message::{Emitter, Message, Reader};
use clock::Clock;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::Arc;

/// Write half of a [`worker_pipe`].
pub struct WorkerEmitter<T> {
    tx: Sender<Message<T>>,
    evict_rx: Receiver<Message<T>>,
    clock: Arc<dyn Clock>,
}

/// Read half of a [`worker_pipe`].
pub struct WorkerReader<T> {
    rx: Receiver<Message<T>>,
    latest: Option<Message<T>>,
}

/// Creates a bounded emitter/reader pair whose halves may live on different
/// threads.
///
/// On overflow the emitter pops one stale message and retries once; if the
/// queue is refilled by a racing producer before the retry lands, the emit
/// reports failure instead of blocking. The policy is deliberately
/// best-effort and is not strengthened under contention.
pub fn worker_pipe<T: Send>(
    capacity: usize,
    clock: Arc<dyn Clock>,
) -> (WorkerEmitter<T>, WorkerReader<T>) {
    assert!(capacity > 0, "worker pipe capacity must be positive");
    let (tx, rx) = bounded(capacity);
    let emitter = WorkerEmitter {
        tx,
        evict_rx: rx.clone(),
        clock,
    };
    let reader = WorkerReader { rx, latest: None };
    (emitter, reader)
}

impl<T: Send> Emitter<T> for WorkerEmitter<T> {
    fn emit(&mut self, data: T) -> bool {
        let ts_ns = self.clock.now_ns();
        self.emit_at(data, ts_ns)
    }

    fn emit_at(&mut self, data: T, ts_ns: u64) -> bool {
        match self.tx.try_send(Message::new(data, ts_ns)) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(_)) => false,
            Err(TrySendError::Full(message)) => {
                // Evict the oldest unread message and retry exactly once.
                let _ = self.evict_rx.try_recv();
                self.tx.try_send(message).is_ok()
            }
        }
    }
}

impl<T: Send> Reader<T> for WorkerReader<T> {
    fn read(&mut self) -> Option<&Message<T>> {
        if let Ok(message) = self.rx.try_recv() {
            self.latest = Some(message);
        }
        self.latest.as_ref()
    }
}
