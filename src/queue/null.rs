//! Backend that discards everything.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::QueueError;
use crate::motion::Instruction;

use super::MotionQueue;

/// Accepts and discards all instructions. Used for dry runs.
#[derive(Debug, Default)]
pub struct NullQueue {
    accepted: AtomicU64,
    shut_down: AtomicBool,
}

impl NullQueue {
    /// Create an open queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

impl MotionQueue for NullQueue {
    fn enqueue(&self, _instruction: Instruction) -> Result<(), QueueError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(QueueError::Shutdown);
        }
        self.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn shutdown(&self, _flush: bool) {
        self.shut_down.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discards_until_shutdown() {
        let queue = NullQueue::new();
        queue.enqueue(Instruction::Dwell(10)).unwrap();
        queue.enqueue(Instruction::MotorsEnable(true)).unwrap();
        assert_eq!(queue.accepted(), 2);
        assert!(queue.wait_queue_empty().is_ok());

        queue.shutdown(true);
        queue.shutdown(false);
        assert_eq!(
            queue.enqueue(Instruction::Dwell(1)),
            Err(QueueError::Shutdown)
        );
        assert_eq!(queue.accepted(), 2);
    }
}
