#[cfg(test)]
mod thread_test;

use std::sync::Arc;

use shared::error::{Error, Result};

use crate::rtos::{self, Semaphore, Task};

/// ThreadConfig is used to configure a joinable thread.
#[derive(Debug, Clone)]
pub struct ThreadConfig {
    /// Task name as shown by the kernel.
    pub name: String,

    /// Stack size hint in bytes. `None` uses the kernel default.
    pub stack_size: Option<usize>,

    pub priority: u8,
}

pub const DEFAULT_THREAD_NAME: &str = "netbridge";
pub const DEFAULT_THREAD_PRIORITY: u8 = 4;

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
            priority: DEFAULT_THREAD_PRIORITY,
        }
    }
}

impl ThreadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// A kernel task that can be joined.
///
/// The task posts `join_barrier` as soon as its entry function returns and
/// then suspends itself; the joiner deletes it after observing the barrier.
/// `join_mutex` is taken with a non-blocking try, so of two concurrent
/// joins the second returns immediately. Joining from the thread itself is
/// not supported.
pub struct Thread {
    config: ThreadConfig,
    task: parking_lot::Mutex<Option<Task>>,
    join_mutex: Semaphore,
    join_barrier: Arc<Semaphore>,
}

impl Thread {
    pub fn new(config: ThreadConfig) -> Self {
        Self {
            config,
            task: parking_lot::Mutex::new(None),
            join_mutex: Semaphore::counting(1, 1),
            join_barrier: Arc::new(Semaphore::binary()),
        }
    }

    /// Starts `entry` on a new task.
    pub fn run<F>(&self, entry: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut task = self.task.lock();
        if task.is_some() {
            return Err(Error::ErrThreadAlreadyRunning);
        }

        let barrier = Arc::clone(&self.join_barrier);
        *task = Some(Task::spawn(
            &self.config.name,
            self.config.stack_size,
            self.config.priority,
            move || {
                entry();
                barrier.give();
            },
        )?);
        Ok(())
    }

    /// Waits for the entry function to return, then releases the task.
    pub fn join(&self) {
        if !self.join_mutex.try_take() {
            log::debug!("thread {} is already being joined", self.config.name);
            return;
        }
        if !self.is_running() {
            self.join_mutex.give();
            return;
        }

        self.join_barrier.take(None);
        {
            let _suspended = rtos::suspend_all();
            if let Some(task) = self.task.lock().take() {
                log::trace!("deleting task {}", task.name());
                task.delete();
            }
        }

        self.join_mutex.give();
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}
