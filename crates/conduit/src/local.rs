//! In-process bounded channel with drop-oldest overflow.

use crate::message::{Emitter, Message, Reader};
use clock::Clock;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct Shared<T> {
    queue: Mutex<VecDeque<Message<T>>>,
    capacity: usize,
}

/// Write half of a [`local_pipe`].
pub struct LocalEmitter<T> {
    shared: Arc<Shared<T>>,
    clock: Arc<dyn Clock>,
}

/// Read half of a [`local_pipe`].
pub struct LocalReader<T> {
    shared: Arc<Shared<T>>,
    latest: Option<Message<T>>,
}

/// Creates a bounded emitter/reader pair for a same-process producer and
/// consumer.
///
/// Pushing past `capacity` evicts the oldest unread message, so emits on a
/// local pipe always report success.
pub fn local_pipe<T: Send>(
    capacity: usize,
    clock: Arc<dyn Clock>,
) -> (LocalEmitter<T>, LocalReader<T>) {
    assert!(capacity > 0, "local pipe capacity must be positive");
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        capacity,
    });
    let emitter = LocalEmitter {
        shared: Arc::clone(&shared),
        clock,
    };
    let reader = LocalReader {
        shared,
        latest: None,
    };
    (emitter, reader)
}

impl<T: Send> Emitter<T> for LocalEmitter<T> {
    fn emit(&mut self, data: T) -> bool {
        let ts_ns = self.clock.now_ns();
        self.emit_at(data, ts_ns)
    }

    fn emit_at(&mut self, data: T, ts_ns: u64) -> bool {
        let mut queue = self.shared.queue.lock();
        if queue.len() == self.shared.capacity {
            queue.pop_front();
        }
        queue.push_back(Message::new(data, ts_ns));
        true
    }
}

impl<T: Send> Reader<T> for LocalReader<T> {
    fn read(&mut self) -> Option<&Message<T>> {
        if let Some(message) = self.shared.queue.lock().pop_front() {
            self.latest = Some(message);
        }
        self.latest.as_ref()
    }
}
