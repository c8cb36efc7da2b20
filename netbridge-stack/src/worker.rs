use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use shared::error::{Error, Result};
use threads::{Condition, Thread, ThreadConfig};

use crate::config::StackConfig;
use crate::netcore::Core;

/// Scoped hold on the core lock.
pub type CoreGuard<'a> = MutexGuard<'a, Core>;

/// How long an idle worker sleeps before checking for shutdown.
const WORKER_POLL_MS: u32 = 50;

/// Wakes the worker when events are queued.
pub(crate) struct Doorbell {
    rung: threads::Mutex<bool>,
    cond: Condition,
}

impl Doorbell {
    fn new() -> Self {
        Self {
            rung: threads::Mutex::new(false),
            cond: Condition::new(),
        }
    }

    pub(crate) fn ring(&self) {
        *self.rung.lock() = true;
        self.cond.signal();
    }

    /// Blocks until rung or `ms` elapse, then clears the bell.
    fn wait(&self, ms: u32) {
        let mut rung = self.rung.lock();
        if !*rung {
            rung = self.cond.timed_wait(rung, ms).0;
        }
        *rung = false;
    }
}

struct Worker {
    thread: Thread,
    running: Arc<AtomicBool>,
}

/// The network stack: the core lock and the worker context that runs
/// callbacks.
///
/// Every stack call goes through [`Stack::lock`]. Queued input, timers
/// and answers are processed either by an explicit [`Stack::process`]
/// call or by a worker task started with [`Stack::start`].
pub struct Stack {
    core: Mutex<Core>,
    doorbell: Arc<Doorbell>,
    worker: Mutex<Option<Worker>>,
}

impl Stack {
    pub fn new(config: StackConfig) -> Self {
        let doorbell = Arc::new(Doorbell::new());
        Self {
            core: Mutex::new(Core::new(config, Arc::clone(&doorbell))),
            doorbell,
            worker: Mutex::new(None),
        }
    }

    /// Acquires the core lock. Released when the guard drops.
    pub fn lock(&self) -> CoreGuard<'_> {
        self.core.lock()
    }

    /// Runs every queued event in the caller's context, under the core
    /// lock. Returns how many events ran.
    pub fn process(&self) -> usize {
        self.core.lock().process()
    }

    /// Starts a worker task that processes events as they are queued.
    pub fn start(self: &Arc<Self>, config: ThreadConfig) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(Error::ErrThreadAlreadyRunning);
        }

        let thread = Thread::new(config);
        let running = Arc::new(AtomicBool::new(true));
        let stack: Weak<Stack> = Arc::downgrade(self);
        let doorbell = Arc::clone(&self.doorbell);
        let keep_running = Arc::clone(&running);

        thread.run(move || {
            log::debug!("stack worker started");
            while keep_running.load(Ordering::Acquire) {
                doorbell.wait(WORKER_POLL_MS);
                match stack.upgrade() {
                    Some(stack) => {
                        stack.process();
                    }
                    None => break,
                }
            }
            log::debug!("stack worker stopped");
        })?;

        *worker = Some(Worker { thread, running });
        Ok(())
    }

    /// Stops and joins the worker task, if one runs.
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        worker.running.store(false, Ordering::Release);
        self.doorbell.ring();
        worker.thread.join();
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }
}
