use std::collections::VecDeque;
use std::sync::Arc;

use netbridge_threads::{Condition, Mutex, Thread, ThreadConfig};

struct Queue {
    items: Mutex<VecDeque<u32>>,
    not_empty: Condition,
}

#[test]
fn test_producer_consumer_on_joinable_thread() {
    let _ = env_logger::builder().is_test(true).try_init();

    let queue = Arc::new(Queue {
        items: Mutex::new(VecDeque::new()),
        not_empty: Condition::new(),
    });
    let received = Arc::new(Mutex::new(Vec::new()));

    let consumer = Thread::new(ThreadConfig::new().with_name("consumer"));
    {
        let queue = Arc::clone(&queue);
        let received = Arc::clone(&received);
        consumer
            .run(move || {
                loop {
                    let mut items = queue.items.lock();
                    while items.is_empty() {
                        items = queue.not_empty.wait(items);
                    }
                    let Some(item) = items.pop_front() else {
                        continue;
                    };
                    drop(items);
                    if item == 0 {
                        break;
                    }
                    received.lock().push(item);
                }
            })
            .unwrap();
    }

    for item in (1..=100).chain(std::iter::once(0)) {
        queue.items.lock().push_back(item);
        queue.not_empty.signal();
    }

    consumer.join();
    assert!(!consumer.is_running());
    assert_eq!(*received.lock(), (1..=100).collect::<Vec<u32>>());
}
