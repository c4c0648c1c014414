//! Message shape and the emitter/reader contract every channel satisfies.

use serde::{Deserialize, Serialize};

/// Timestamped payload carried by every channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message<T> {
    /// Payload handed to the emitter.
    pub data: T,
    /// Monotonic nanosecond timestamp stamped at emit time.
    pub ts_ns: u64,
}

impl<T> Message<T> {
    /// Pairs a payload with its emit timestamp.
    pub fn new(data: T, ts_ns: u64) -> Self {
        Self { data, ts_ns }
    }
}

/// Write half of a channel.
///
/// Emits are best-effort and never block or panic. A `true` result means the
/// message entered the channel, even when an older unread message had to be
/// evicted to make room. `false` means the channel could not accept the
/// write after one eviction attempt; only the cross-thread variant can
/// report it.
pub trait Emitter<T>: Send {
    /// Stamps `data` with the emitter's clock and offers it to the channel.
    fn emit(&mut self, data: T) -> bool;

    /// Offers `data` with an explicit timestamp.
    fn emit_at(&mut self, data: T, ts_ns: u64) -> bool;
}

/// Read half of a channel.
pub trait Reader<T>: Send {
    /// Non-blocking sticky read.
    ///
    /// Consumes and returns the oldest unread message if one is queued;
    /// otherwise returns the message handed out last time. `None` only
    /// before the first message was ever available.
    fn read(&mut self) -> Option<&Message<T>>;
}
