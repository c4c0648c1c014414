#![deny(missing_docs)]
//! Cooperative scheduling and lifecycle orchestration for control loops.
//!
//! A [`World`] owns the shared stop signal, the worker threads it spawned,
//! and the shared-slot channels it allocated. Control loops either run on
//! their own threads ([`World::start_workers`]) or are multiplexed in the
//! calling thread by the [`interleave`](World::interleave) scheduler, which
//! always advances the loop that is due soonest and tells the caller how
//! long to sleep between activations.

mod control;
mod error;
mod sched;
mod signal;
mod worker;
mod world;

pub use control::{named, ControlLoop, Named, Step};
pub use error::WorldError;
pub use sched::Interleave;
pub use signal::{StopReader, StopSignal};
pub use world::World;
