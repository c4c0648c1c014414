//! Background worker threads driving control loops to completion.
//!
//! Each worker runs one control loop on its own OS thread, wired to the
//! world's shared stop signal plus a per-worker terminate token. Shutdown
//! escalates through three tiers: a graceful wait on the stop flag, the
//! terminate token (which interrupts sleeps and halts stepping), and
//! finally abandoning the thread — threads cannot be killed, so a step
//! stuck in user code is detached rather than blocking exit forever.

use crate::control::{ControlLoop, Step};
use crate::signal::StopSignal;
use clock::Clock;
use log::{error, info, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Grace period for a worker to notice the stop flag on its own.
pub(crate) const GRACEFUL_WAIT: Duration = Duration::from_secs(3);
/// Additional wait after the terminate token fires.
pub(crate) const TERMINATE_WAIT: Duration = Duration::from_secs(2);

/// One-shot token observed by worker sleeps and the step-driving wrapper.
#[derive(Clone, Default)]
pub(crate) struct Token {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl Token {
    pub(crate) fn fire(&self) {
        let mut fired = self.inner.fired.lock();
        *fired = true;
        self.inner.cond.notify_all();
    }

    pub(crate) fn is_fired(&self) -> bool {
        *self.inner.fired.lock()
    }

    /// Blocks up to `timeout`, waking early if the token fires. Returns
    /// whether the token fired.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let mut fired = self.inner.fired.lock();
        if *fired {
            return true;
        }
        self.inner.cond.wait_for(&mut fired, timeout);
        *fired
    }
}

/// Handle to a spawned worker, owned exclusively by its world.
pub(crate) struct WorkerHandle {
    name: String,
    thread: Option<JoinHandle<()>>,
    terminate: Token,
    finished: Token,
}

/// Spawns a worker thread driving `control_loop` until it finishes, fails,
/// or shutdown is requested.
pub(crate) fn spawn_worker(
    control_loop: Box<dyn ControlLoop>,
    stop: StopSignal,
    clock: Arc<dyn Clock>,
) -> WorkerHandle {
    let name = control_loop.name();
    let terminate = Token::default();
    let finished = Token::default();
    let thread = {
        let name = name.clone();
        let stop = stop.clone();
        let terminate = terminate.clone();
        let finished = finished.clone();
        std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_main(control_loop, name, stop, terminate, finished, clock))
            .expect("spawn worker thread")
    };
    info!("worker '{name}' started");
    WorkerHandle {
        name,
        thread: Some(thread),
        terminate,
        finished,
    }
}

/// Sets the stop flag and the finished token on every exit path, including
/// panic unwinds, so siblings always observe this loop being gone.
struct ExitGuard {
    stop: StopSignal,
    finished: Token,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.stop.set();
        self.finished.fire();
    }
}

fn worker_main(
    mut control_loop: Box<dyn ControlLoop>,
    name: String,
    stop: StopSignal,
    terminate: Token,
    finished: Token,
    clock: Arc<dyn Clock>,
) {
    let _guard = ExitGuard {
        stop: stop.clone(),
        finished,
    };
    let mut stop_reader = stop.reader(Arc::clone(&clock));
    while !terminate.is_fired() {
        match control_loop.step(&mut stop_reader, clock.as_ref()) {
            Ok(Step::Sleep(pause)) => {
                if terminate.wait(pause) {
                    break;
                }
            }
            Ok(Step::Done) => {
                info!("worker '{name}' finished");
                break;
            }
            Err(err) => {
                report_failure(&name, &err);
                break;
            }
        }
    }
}

/// Logs the failure and prints a framed block to stderr. The worker runs
/// detached from the caller's normal output, so the `=`-delimited frame
/// keeps crashes loudly visible and greppable.
fn report_failure(name: &str, err: &anyhow::Error) {
    error!("worker '{name}' failed: {err:#}");
    let frame = "=".repeat(60);
    eprintln!("{frame}");
    eprintln!("worker '{name}' failed:");
    eprintln!("{err:?}");
    eprintln!("{frame}");
}

impl WorkerHandle {
    /// Escalating shutdown: graceful wait, terminate token, then abandon.
    ///
    /// Callers must have set the stop flag first; the graceful tier only
    /// waits for the loop to notice it.
    pub(crate) fn shutdown(mut self) {
        if self.finished.wait(GRACEFUL_WAIT) {
            self.reap();
            return;
        }
        warn!(
            "worker '{}' ignored stop for {:?}; terminating",
            self.name, GRACEFUL_WAIT
        );
        self.terminate.fire();
        if self.finished.wait(TERMINATE_WAIT) {
            self.reap();
            return;
        }
        // A step stuck in user code cannot be interrupted; detach the
        // thread instead of blocking shutdown forever.
        error!(
            "worker '{}' unresponsive after terminate; abandoning thread",
            self.name
        );
        drop(self.thread.take());
    }

    fn reap(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("worker '{}' panicked", self.name);
            }
        }
    }
}
