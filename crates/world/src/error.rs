//! Error surface for the scheduling crate.
//!
//! The surface is deliberately small: channels report overflow through
//! boolean results and precondition violations assert, so the only runtime
//! error a caller handles is a control loop failing inside the cooperative
//! scheduler.

use thiserror::Error;

/// Errors surfaced by the cooperative scheduler.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A control loop's step returned an error inside `interleave`/`run`.
    ///
    /// The loop is not rescheduled; sibling loops in the same group stop
    /// advancing because the caller's drive of the iterator decides what
    /// happens next.
    #[error("control loop '{name}' failed")]
    LoopFailed {
        /// Name of the failing loop.
        name: String,
        /// Underlying failure reported by the loop.
        #[source]
        source: anyhow::Error,
    },
}
