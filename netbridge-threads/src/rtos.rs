//! Host rendition of the RTOS kernel services the primitives are built on.
//!
//! The target kernel offers counting/binary semaphores, tasks that can be
//! deleted by another task, and a way to suspend the scheduler around a
//! short critical section. It has no condition variable. This module
//! provides exactly those services on a hosted OS so the primitives above
//! it can be exercised unchanged.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use shared::error::{Error, Result};

/// Highest task priority the kernel accepts.
pub const MAX_PRIORITIES: u8 = 32;

static SCHEDULER: Mutex<()> = Mutex::new(());

/// Counting semaphore.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<u32>,
    available: Condvar,
    max: u32,
}

impl Semaphore {
    pub fn counting(max: u32, initial: u32) -> Self {
        Self {
            count: Mutex::new(initial.min(max)),
            available: Condvar::new(),
            max,
        }
    }

    /// Binary semaphore, created empty.
    pub fn binary() -> Self {
        Self::counting(1, 0)
    }

    /// Takes one unit, blocking until one is available or `timeout` elapses.
    /// `None` blocks forever. Returns `false` on timeout.
    pub fn take(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut count = self.count.lock();
        while *count == 0 {
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut count, deadline).timed_out() && *count == 0 {
                        return false;
                    }
                }
                None => self.available.wait(&mut count),
            }
        }
        *count -= 1;
        true
    }

    pub fn try_take(&self) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            false
        } else {
            *count -= 1;
            true
        }
    }

    /// Posts one unit. Returns `false` if the semaphore is already full.
    pub fn give(&self) -> bool {
        let mut count = self.count.lock();
        if *count >= self.max {
            return false;
        }
        *count += 1;
        self.available.notify_one();
        true
    }

    pub fn count(&self) -> u32 {
        *self.count.lock()
    }
}

/// Scheduler suspended for as long as the guard lives.
pub struct SchedulerGuard {
    _guard: MutexGuard<'static, ()>,
}

/// Suspends task switching among kernel-managed critical sections.
pub fn suspend_all() -> SchedulerGuard {
    SchedulerGuard {
        _guard: SCHEDULER.lock(),
    }
}

/// A kernel task.
///
/// When its entry function returns, the task suspends itself until another
/// task deletes it; only then are its resources released.
pub struct Task {
    name: String,
    delete: std::sync::Arc<Semaphore>,
    handle: Option<JoinHandle<()>>,
}

impl Task {
    pub fn spawn<F>(name: &str, stack_size: Option<usize>, priority: u8, entry: F) -> Result<Task>
    where
        F: FnOnce() + Send + 'static,
    {
        if priority >= MAX_PRIORITIES {
            return Err(Error::ErrInvalidConfig(format!(
                "task priority {priority} exceeds {}",
                MAX_PRIORITIES - 1
            )));
        }

        let delete = std::sync::Arc::new(Semaphore::binary());
        let suspended = std::sync::Arc::clone(&delete);

        let mut builder = thread::Builder::new().name(name.to_owned());
        if let Some(stack_size) = stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || {
                entry();
                suspended.take(None);
            })
            .map_err(|err| {
                log::error!("failed to create task: {err}");
                Error::ErrTaskCreate
            })?;

        log::trace!("task {name} created with priority {priority}");
        Ok(Task {
            name: name.to_owned(),
            delete,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deletes a task that has suspended itself.
    pub fn delete(mut self) {
        self.delete.give();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("task {} panicked", self.name);
        }
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if self.handle.is_some() {
            // Release the task so it does not stay suspended forever.
            self.delete.give();
        }
    }
}
