//! ACK rendezvous
//!
//! A producer records the id of the last completed operation and signals;
//! the executor blocks until the id it is waiting for shows up, the wait
//! times out, or the mission is interrupted.
//!
//! # Wakeup protocol
//!
//! The waiter checks the interrupt predicate while holding the record lock,
//! and a stopper raises its flag *before* taking the record lock to notify.
//! Either the waiter sees the flag, or it is already parked on the condvar
//! when the notification arrives. No wakeup can be lost.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Result of waiting on an [`AckRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Expected completion observed
    Acked,
    /// Producer reported failure for the expected id
    Failed,
    /// Deadline passed first
    TimedOut,
    /// Stop (or shutdown) observed first
    Stopped,
}

/// Capture completion recorded by an image capture task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done(i32),
    Failed(i32),
}

/// Last completed id plus its wake signal
pub struct AckRecord<T> {
    last: Mutex<Option<T>>,
    signal: Condvar,
}

impl<T: Copy> AckRecord<T> {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
            signal: Condvar::new(),
        }
    }

    /// Record a completion and wake all waiters
    pub fn record(&self, value: T) {
        *self.last.lock() = Some(value);
        self.signal.notify_all();
    }

    /// Forget the last completion
    pub fn reset(&self) {
        *self.last.lock() = None;
    }

    pub fn last(&self) -> Option<T> {
        *self.last.lock()
    }

    /// Wake waiters without recording anything so they re-check interrupts
    pub fn wake(&self) {
        let _guard = self.last.lock();
        self.signal.notify_all();
    }

    /// Block until `classify` maps the recorded value to an outcome
    ///
    /// `classify` returns `None` while the recorded value is not the one
    /// being waited for. `interrupted` is re-checked on every wake.
    pub fn wait_until(
        &self,
        timeout: Duration,
        classify: impl Fn(T) -> Option<AckOutcome>,
        interrupted: impl Fn() -> bool,
    ) -> AckOutcome {
        let deadline = Instant::now() + timeout;
        let mut last = self.last.lock();
        loop {
            if let Some(outcome) = (*last).and_then(&classify) {
                return outcome;
            }
            if interrupted() {
                return AckOutcome::Stopped;
            }
            if self.signal.wait_until(&mut last, deadline).timed_out() {
                // Final re-check: the completion may have raced the deadline
                if let Some(outcome) = (*last).and_then(&classify) {
                    return outcome;
                }
                return AckOutcome::TimedOut;
            }
        }
    }
}

impl<T: Copy> Default for AckRecord<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl AckRecord<u32> {
    /// Wait for a motion-controller ACK carrying `id`
    pub fn wait_for_id(
        &self,
        id: u32,
        timeout: Duration,
        interrupted: impl Fn() -> bool,
    ) -> AckOutcome {
        self.wait_until(
            timeout,
            |last| (last == id).then_some(AckOutcome::Acked),
            interrupted,
        )
    }
}

impl AckRecord<Completion> {
    /// Wait for the capture of obstacle `id` to complete
    pub fn wait_for_capture(
        &self,
        id: i32,
        timeout: Duration,
        interrupted: impl Fn() -> bool,
    ) -> AckOutcome {
        self.wait_until(
            timeout,
            |last| match last {
                Completion::Done(done) if done == id => Some(AckOutcome::Acked),
                Completion::Failed(failed) if failed == id => Some(AckOutcome::Failed),
                _ => None,
            },
            interrupted,
        )
    }
}
