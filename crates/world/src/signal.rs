//! Level-triggered stop signal shared by every loop in a world.

use clock::Clock;
use conduit::{Message, Reader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared boolean requesting cooperative shutdown.
///
/// There is exactly one per [`World`](crate::World) and it is one-way:
/// once set it stays set. Cancellation is cooperative; loops poll the flag
/// through a [`StopReader`] and choose to exit.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates a cleared signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether shutdown has been requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Creates a pollable reader over the flag.
    pub fn reader(&self, clock: Arc<dyn Clock>) -> StopReader {
        StopReader {
            flag: Arc::clone(&self.flag),
            clock,
            latest: None,
        }
    }
}

/// Pollable view of a [`StopSignal`].
///
/// Every read reports the flag's current state stamped at the current clock
/// time. The signal is level-triggered: repeated reads while the flag is set
/// all report `true`.
pub struct StopReader {
    flag: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
    latest: Option<Message<bool>>,
}

impl StopReader {
    /// Convenience accessor for loops that only need the boolean.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Reader<bool> for StopReader {
    fn read(&mut self) -> Option<&Message<bool>> {
        let state = self.flag.load(Ordering::Acquire);
        self.latest = Some(Message::new(state, self.clock.now_ns()));
        self.latest.as_ref()
    }
}
