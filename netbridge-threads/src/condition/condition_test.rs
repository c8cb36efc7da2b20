use super::*;
use crate::mutex::Mutex;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::thread;
use std::time::Instant;

#[test]
fn test_signal_without_waiter_is_not_posted() {
    let cond = Condition::new();
    assert!(!cond.signal());
    assert_eq!(cond.waiters(), 0);
    assert_eq!(cond.broadcast(), 0);
}

#[test]
fn test_timed_wait_times_out_and_withdraws() {
    let mutex = Mutex::new(0u32);
    let cond = Condition::new();

    let start = Instant::now();
    let guard = mutex.lock();
    let (guard, res) = cond.timed_wait(guard, 20);
    assert!(res.timed_out());
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(*guard, 0);
    drop(guard);

    assert_eq!(cond.waiters(), 0);
    // Nothing owed; a later signal must not find anyone.
    assert!(!cond.signal());
}

#[test]
fn test_wait_reacquires_mutex() {
    let shared = Arc::new((Mutex::new(false), Condition::new()));

    let waiter = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            let (mutex, cond) = &*shared;
            let mut ready = mutex.lock();
            while !*ready {
                ready = cond.wait(ready);
            }
            // Still holding the lock here.
            *ready = false;
        })
    };

    loop {
        let (mutex, cond) = &*shared;
        let mut ready = mutex.lock();
        if cond.waiters() == 1 {
            *ready = true;
            drop(ready);
            assert!(cond.signal());
            break;
        }
        drop(ready);
        thread::yield_now();
    }

    waiter.join().unwrap();
    assert!(!*shared.0.lock());
    assert_eq!(shared.1.waiters(), 0);
}

#[test]
fn test_broadcast_wakes_all_registered() {
    const WAITERS: usize = 4;
    let shared = Arc::new((Mutex::new(0usize), Condition::new()));

    let handles: Vec<_> = (0..WAITERS)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let (mutex, cond) = &*shared;
                let guard = mutex.lock();
                let mut guard = cond.wait(guard);
                *guard += 1;
            })
        })
        .collect();

    while shared.1.waiters() < WAITERS as u32 {
        thread::yield_now();
    }
    {
        let _guard = shared.0.lock();
        assert_eq!(shared.1.broadcast(), WAITERS as u32);
    }

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*shared.0.lock(), WAITERS);
    assert_eq!(shared.1.waiters(), 0);
}

#[test]
fn test_no_lost_signal_under_stress() {
    const WAITERS: usize = 4;
    const SIGNALERS: usize = 3;
    const ROUNDS: usize = 200;

    let mutex = Arc::new(Mutex::new(()));
    let cond = Arc::new(Condition::new());
    let wakeups = Arc::new(AtomicUsize::new(0));
    let claimed = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let (mutex, cond, wakeups) = (mutex.clone(), cond.clone(), wakeups.clone());
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let guard = mutex.lock();
                    let (_guard, res) = cond.timed_wait(guard, 1);
                    if !res.timed_out() {
                        wakeups.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    let signalers: Vec<_> = (0..SIGNALERS)
        .map(|_| {
            let (cond, claimed, stop) = (cond.clone(), claimed.clone(), stop.clone());
            thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    if cond.signal() {
                        claimed.fetch_add(1, Ordering::SeqCst);
                    }
                    thread::yield_now();
                }
            })
        })
        .collect();

    for w in waiters {
        w.join().unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    for s in signalers {
        s.join().unwrap();
    }

    assert_eq!(cond.waiters(), 0);
    assert_eq!(
        wakeups.load(Ordering::SeqCst),
        claimed.load(Ordering::SeqCst),
        "every claimed signal must wake exactly one waiter"
    );
}
