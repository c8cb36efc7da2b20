#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod condition;
pub mod mutex;
pub mod rtos;
pub mod thread;

pub use condition::{Condition, WaitTimeoutResult};
pub use mutex::{Mutex, MutexGuard};
pub use thread::{Thread, ThreadConfig};
