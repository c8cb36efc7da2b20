use super::*;
use crate::mutex::Mutex;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[test]
fn test_run_and_join() {
    let thread = Thread::new(ThreadConfig::new().with_name("worker"));
    let (tx, rx) = crossbeam_channel::bounded(1);

    thread
        .run(move || {
            tx.send(42u32).unwrap();
        })
        .unwrap();
    assert!(thread.is_running());

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    thread.join();
    assert!(!thread.is_running());
}

#[test]
fn test_join_waits_for_entry() {
    let done = Arc::new(AtomicUsize::new(0));
    let thread = Thread::new(ThreadConfig::default());

    let d = Arc::clone(&done);
    thread
        .run(move || {
            std::thread::sleep(Duration::from_millis(30));
            d.store(1, Ordering::SeqCst);
        })
        .unwrap();

    thread.join();
    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[test]
fn test_second_join_is_noop() {
    let thread = Thread::new(ThreadConfig::default());
    thread.run(|| {}).unwrap();
    thread.join();
    thread.join();
    assert!(!thread.is_running());
    assert_eq!(thread.join_barrier.count(), 0);
}

#[test]
fn test_join_after_rerun_waits_for_second_entry() {
    let thread = Arc::new(Thread::new(ThreadConfig::default()));
    thread.run(|| {}).unwrap();
    thread.join();

    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
    let finished = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&finished);
    thread
        .run(move || {
            let _ = release_rx.recv();
            f.store(1, Ordering::SeqCst);
        })
        .unwrap();

    let joiner = {
        let thread = Arc::clone(&thread);
        std::thread::spawn(move || thread.join())
    };
    while thread.join_mutex.count() != 0 {
        std::thread::yield_now();
    }
    std::thread::sleep(Duration::from_millis(50));

    // The joiner is still parked on the barrier, outside the scheduler section.
    let (sched_tx, sched_rx) = crossbeam_channel::bounded::<()>(1);
    std::thread::spawn(move || {
        let _suspended = rtos::suspend_all();
        let _ = sched_tx.send(());
    });
    assert!(sched_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    assert!(thread.is_running());
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    release_tx.send(()).unwrap();
    joiner.join().unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(!thread.is_running());
}

#[test]
fn test_join_never_started() {
    let thread = Thread::new(ThreadConfig::default());
    thread.join();
    assert!(!thread.is_running());
}

#[test]
fn test_concurrent_join_first_wins() {
    let thread = Arc::new(Thread::new(ThreadConfig::default()));
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
    thread
        .run(move || {
            let _ = release_rx.recv();
        })
        .unwrap();

    let first = {
        let thread = Arc::clone(&thread);
        std::thread::spawn(move || thread.join())
    };
    // The first joiner holds the join lock while blocked on the barrier.
    while thread.join_mutex.count() != 0 {
        std::thread::yield_now();
    }
    thread.join();
    assert!(thread.is_running());

    release_tx.send(()).unwrap();
    first.join().unwrap();
    assert!(!thread.is_running());
}

#[test]
fn test_run_twice_is_rejected() {
    let thread = Thread::new(ThreadConfig::default());
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
    thread
        .run(move || {
            let _ = release_rx.recv();
        })
        .unwrap();

    assert_eq!(thread.run(|| {}), Err(Error::ErrThreadAlreadyRunning));

    release_tx.send(()).unwrap();
    thread.join();
}

#[test]
fn test_invalid_priority() {
    let thread = Thread::new(ThreadConfig::default().with_priority(rtos::MAX_PRIORITIES));
    assert!(matches!(thread.run(|| {}), Err(Error::ErrInvalidConfig(_))));
}

#[test]
fn test_mutex_excludes() {
    let counter = Arc::new(Mutex::new(0usize));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    *counter.lock() += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*counter.lock(), 4000);

    let guard = counter.lock();
    assert!(counter.try_lock().is_none());
    drop(guard);
    assert!(counter.try_lock().is_some());
}
