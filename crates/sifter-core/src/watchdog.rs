//! Match watchdog: one-shot idle timer over a scanning worker
//!
//! A [`Watchdog`] guards a worker that may block inside an unbounded
//! match attempt.  The driving code calls [`Watchdog::touch`] between
//! independent attempts to signal forward progress; if no touch arrives
//! within the idle timeout, the watchdog sets the shared [`CancelToken`]
//! exactly once and exits.  The interruptible text view picks the token
//! up at the next byte access, so the blocked attempt unwinds cleanly.
//!
//! The watchdog itself never raises errors — it only signals.  A fire
//! that races normal completion is harmless: the scan owner clears the
//! token after [`Watchdog::join`], before any unrelated match runs.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::interrupt::CancelToken;

#[derive(Debug)]
struct State {
    last_touch: Instant,
    stop: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another watchdog accessor panicked;
        // the state itself is a timestamp and a flag, both always valid.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// One-shot idle timer bound to exactly one scanning worker.
///
/// Lifecycle: [`Watchdog::spawn`] → any number of [`Watchdog::touch`]
/// calls → either expiry (token set once, thread exits) or
/// [`Watchdog::request_stop`] + [`Watchdog::join`].  After a stop request
/// the watchdog delivers no further cancellation.
#[derive(Debug)]
pub struct Watchdog {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start a watchdog that cancels `token` after `idle_timeout` without
    /// a touch.
    #[must_use]
    pub fn spawn(token: CancelToken, idle_timeout: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                last_touch: Instant::now(),
                stop: false,
            }),
            cond: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            run_timer(&thread_shared, &token, idle_timeout);
        });
        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Reset the idle countdown.
    ///
    /// Called by the driving code between independent match attempts so
    /// that many fast, successful matches never trip the timer.
    pub fn touch(&self) {
        self.shared.lock().last_touch = Instant::now();
    }

    /// Ask the watchdog to stop without firing.  Idempotent; harmless if
    /// the timer has already expired.
    pub fn request_stop(&self) {
        self.shared.lock().stop = true;
        self.shared.cond.notify_all();
    }

    /// Wait for the timer thread to exit.
    ///
    /// The caller clears residual cancellation state on its token after
    /// this returns; a fire that raced normal completion must not leak
    /// into later operations.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.request_stop();
        self.join();
    }
}

fn run_timer(shared: &Shared, token: &CancelToken, idle_timeout: Duration) {
    let mut guard = shared.lock();
    loop {
        if guard.stop {
            return;
        }
        let Some(deadline) = guard.last_touch.checked_add(idle_timeout) else {
            // Deadline beyond what the clock can represent: the timer
            // can never expire, so only a stop request ends the wait.
            guard = shared
                .cond
                .wait(guard)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            continue;
        };
        let now = Instant::now();
        if now >= deadline {
            debug!(
                idle_timeout_ms = idle_timeout.as_millis() as u64,
                "match watchdog expired, cancelling in-progress match"
            );
            token.cancel();
            return; // one interruption per watchdog lifetime
        }
        let (next, _timed_out) = shared
            .cond
            .wait_timeout(guard, deadline - now)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard = next;
    }
}
