#![deny(missing_docs)]
//! Timestamped message channels for control loops.
//!
//! Producers and consumers are decoupled through bounded emitter/reader
//! pairs that prefer freshness over completeness: emits never block and may
//! evict the oldest unread message, reads never block and latch the last
//! value seen. Variants:
//!
//! * [`local_pipe`] – in-process bounded queue, drop-oldest on overflow.
//! * [`worker_pipe`] – cross-thread bounded queue, evict-then-retry-once.
//! * [`BroadcastEmitter`] – fans one write out to N independent channels.
//! * [`slot_pipe`] – single-slot coalescing channel for large payloads.

mod broadcast;
mod local;
mod message;
mod slot;
mod worker;

pub use broadcast::{local_fanout, worker_fanout, BroadcastEmitter};
pub use local::{local_pipe, LocalEmitter, LocalReader};
pub use message::{Emitter, Message, Reader};
pub use slot::{slot_pipe, SlotEmitter, SlotHandle, SlotReader};
pub use worker::{worker_pipe, WorkerEmitter, WorkerReader};
