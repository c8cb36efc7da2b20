use std::sync::Arc;

use shared::interfaces::Timestamp;
use stack::Stack;

/// Milliseconds from the stack's clock. Wraps like `sys_now`.
pub struct StackTimestamp {
    stack: Arc<Stack>,
}

impl StackTimestamp {
    pub fn new(stack: Arc<Stack>) -> Self {
        Self { stack }
    }
}

impl Timestamp for StackTimestamp {
    fn now_ms(&self) -> u32 {
        self.stack.lock().sys_now()
    }
}
