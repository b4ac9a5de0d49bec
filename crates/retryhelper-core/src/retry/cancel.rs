//! Cooperative cancellation for the backoff wait.
//!
//! The signal is level-triggered: once [`CancelToken::cancel`] is called it
//! stays set until [`CancelToken::reset`], so a cancellation that a
//! non-interruptible wait ignored is still visible to the caller afterwards.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

const UNBOUNDED_WAIT_SLICE: Duration = Duration::from_secs(3600);

/// How a backoff wait reacts to cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Stop waiting as soon as the token is cancelled.
    Interruptible,
    /// Finish the wait; leave the signal set for the caller.
    Uninterruptible,
}

/// Outcome of one backoff wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    /// Cancelled during an interruptible wait.
    Cancelled,
    /// Cancellation was seen during an uninterruptible wait and left pending.
    Deferred,
}

#[derive(Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Shared cancellation signal. Clones refer to the same signal.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake any waiter.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the signal (the caller has handled it).
    pub fn reset(&self) {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Block for `duration` unless cancelled in [`WaitMode::Interruptible`] mode.
    pub fn wait(&self, duration: Duration, mode: WaitMode) -> WaitOutcome {
        // None: the deadline is past what Instant can represent.
        let deadline = Instant::now().checked_add(duration);
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut observed = false;
        loop {
            if *cancelled {
                if mode == WaitMode::Interruptible {
                    return WaitOutcome::Cancelled;
                }
                observed = true;
            }
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    deadline - now
                }
                None => UNBOUNDED_WAIT_SLICE,
            };
            let (guard, _) = self
                .inner
                .cond
                .wait_timeout(cancelled, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }
        if observed {
            WaitOutcome::Deferred
        } else {
            WaitOutcome::Elapsed
        }
    }
}
