#[cfg(test)]
mod condition_test;

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::mutex::MutexGuard;
use crate::rtos::Semaphore;

/// Outcome of a timed wait.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WaitTimeoutResult(bool);

impl WaitTimeoutResult {
    pub fn timed_out(&self) -> bool {
        self.0
    }
}

/// Condition variable for a kernel without one.
///
/// A waiter registers itself in `waiters` before releasing the mutex, then
/// blocks on a counting semaphore. A signaler claims one registered waiter
/// by decrementing `waiters` with a compare-and-swap and only then posts a
/// unit, so every posted unit has exactly one waiter owed it. A waiter that
/// times out withdraws its registration the same way; if it finds nobody
/// left to withdraw, a signaler already claimed it and the owed unit is
/// consumed instead of being left for an unrelated waiter.
pub struct Condition {
    waiters: AtomicU32,
    signal: Semaphore,
}

impl Default for Condition {
    fn default() -> Self {
        Self::new()
    }
}

impl Condition {
    pub fn new() -> Self {
        Self {
            waiters: AtomicU32::new(0),
            signal: Semaphore::counting(u32::MAX, 0),
        }
    }

    /// Blocks until signaled. The mutex is released while blocked and held
    /// again on return.
    pub fn wait<'a, T: ?Sized>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        self.wait_inner(guard, None).0
    }

    /// Like [`wait`](Self::wait) but gives up after `ms` milliseconds.
    /// `0` waits forever.
    pub fn timed_wait<'a, T: ?Sized>(
        &self,
        guard: MutexGuard<'a, T>,
        ms: u32,
    ) -> (MutexGuard<'a, T>, WaitTimeoutResult) {
        let timeout = if ms == 0 {
            None
        } else {
            Some(Duration::from_millis(u64::from(ms)))
        };
        self.wait_inner(guard, timeout)
    }

    fn wait_inner<'a, T: ?Sized>(
        &self,
        guard: MutexGuard<'a, T>,
        timeout: Option<Duration>,
    ) -> (MutexGuard<'a, T>, WaitTimeoutResult) {
        let snapshot = self.waiters.fetch_add(1, Ordering::AcqRel) + 1;
        let mutex = MutexGuard::mutex(&guard);
        drop(guard);

        let signaled = self.signal.take(timeout) || !self.withdraw(snapshot);

        (mutex.lock(), WaitTimeoutResult(!signaled))
    }

    /// Removes one registration after a timeout. Returns `false` when the
    /// counter was already drained by signalers, in which case the unit owed
    /// to this waiter is consumed.
    fn withdraw(&self, snapshot: u32) -> bool {
        let mut current = snapshot;
        loop {
            if current == 0 {
                // Claimed between our timeout and now; the unit is being posted.
                self.signal.take(None);
                return false;
            }
            match self.waiters.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Wakes one waiter. Returns whether a waiter was claimed; with no
    /// waiter registered nothing is posted.
    pub fn signal(&self) -> bool {
        let mut current = self.waiters.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return false;
            }
            match self.waiters.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.signal.give();
                    return true;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Wakes every waiter registered at the time of the call. Returns how
    /// many were woken.
    pub fn broadcast(&self) -> u32 {
        let registered = self.waiters.load(Ordering::Acquire);
        let mut woken = 0;
        while woken < registered && self.signal() {
            woken += 1;
        }
        woken
    }

    /// Waiters currently registered and not yet claimed by a signal.
    pub fn waiters(&self) -> u32 {
        self.waiters.load(Ordering::Acquire)
    }
}
