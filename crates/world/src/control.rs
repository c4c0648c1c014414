//! Control-loop stepping contract.

use crate::signal::StopReader;
use clock::Clock;
use std::time::Duration;

/// Command returned by one control-loop step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Run again after the given pause.
    Sleep(Duration),
    /// The loop finished its work.
    Done,
}

/// A unit of repeatable work driven by the scheduler or a worker thread.
///
/// Each step performs a slice of work and reports how long until the next
/// activation. Loops observe shutdown requests through the provided
/// [`StopReader`] and return [`Step::Done`] to finish; an `Err` is treated
/// as the loop crashing. Closures become loops via [`named`].
pub trait ControlLoop: Send {
    /// Human-readable name used in logs and error reports.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Performs one activation.
    fn step(&mut self, stop: &mut StopReader, clock: &dyn Clock) -> anyhow::Result<Step>;
}

/// Adapts a step closure into a named control loop.
pub fn named<F>(name: impl Into<String>, step: F) -> Named<F>
where
    F: FnMut(&mut StopReader, &dyn Clock) -> anyhow::Result<Step> + Send,
{
    Named {
        name: name.into(),
        step,
    }
}

/// A named control loop built from a closure. See [`named`].
pub struct Named<F> {
    name: String,
    step: F,
}

impl<F> ControlLoop for Named<F>
where
    F: FnMut(&mut StopReader, &dyn Clock) -> anyhow::Result<Step> + Send,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn step(&mut self, stop: &mut StopReader, clock: &dyn Clock) -> anyhow::Result<Step> {
        (self.step)(stop, clock)
    }
}
