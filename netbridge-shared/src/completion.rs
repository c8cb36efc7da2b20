//! One-shot completion events.
//!
//! A [`Completion`] stands for the device SDK's completion event: it is
//! handed to an adapter together with a request and resolved exactly once
//! with the outcome. Resolving consumes the value, so a second resolve of
//! the same event cannot be expressed.
//!
//! The resolve callback runs in whatever context performed the resolve,
//! possibly the stack's worker context with the core lock held. It must
//! hand the result off to the SDK's scheduler and return; it must not call
//! back into an adapter.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::NetResult;

type ResolveFn<T> = Box<dyn FnOnce(NetResult<T>) + Send + 'static>;

pub struct Completion<T = ()> {
    resolve: ResolveFn<T>,
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

impl<T> Completion<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(NetResult<T>) + Send + 'static,
    {
        Self {
            resolve: Box::new(f),
        }
    }

    /// Resolves the event, handing `result` back to the issuer.
    pub fn resolve(self, result: NetResult<T>) {
        (self.resolve)(result)
    }
}

impl<T: Send + 'static> Completion<T> {
    /// Adapts a completion expecting `U` into one accepting `T`.
    pub fn map_from<U, F>(self, f: F) -> Completion<U>
    where
        U: 'static,
        F: FnOnce(U) -> T + Send + 'static,
    {
        Completion::new(move |r: NetResult<U>| self.resolve(r.map(f)))
    }
}

struct RecorderState<T> {
    resolved: usize,
    last: Option<NetResult<T>>,
}

/// Records every resolve of the completions it hands out.
///
/// Used to observe exactly-once resolution in tests and demos.
pub struct Recorder<T = ()> {
    state: Arc<Mutex<RecorderState<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(RecorderState {
                resolved: 0,
                last: None,
            })),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completion(&self) -> Completion<T> {
        let state = Arc::clone(&self.state);
        Completion::new(move |r| {
            let mut s = state.lock();
            s.resolved += 1;
            s.last = Some(r);
        })
    }

    /// Number of times any completion from this recorder was resolved.
    pub fn resolved(&self) -> usize {
        self.state.lock().resolved
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved() > 0
    }

    pub fn result(&self) -> Option<NetResult<T>> {
        self.state.lock().last.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_recorder_counts_resolves() {
        let recorder: Recorder<u32> = Recorder::new();
        assert!(!recorder.is_resolved());

        recorder.completion().resolve(Ok(7));
        assert_eq!(recorder.resolved(), 1);
        assert_eq!(recorder.result(), Some(Ok(7)));

        recorder.completion().resolve(Err(ErrorCode::Aborted));
        assert_eq!(recorder.resolved(), 2);
        assert_eq!(recorder.result(), Some(Err(ErrorCode::Aborted)));
    }

    #[test]
    fn test_map_from() {
        let recorder: Recorder<usize> = Recorder::new();
        let c: Completion<Vec<u8>> = recorder.completion().map_from(|v: Vec<u8>| v.len());
        c.resolve(Ok(vec![1, 2, 3]));
        assert_eq!(recorder.result(), Some(Ok(3)));
    }
}
