//! Blocking fixed-capacity FIFO between the session thread and a backend
//! consumer thread.

use std::sync::{Condvar, Mutex, MutexGuard};

use heapless::Deque;

use crate::error::QueueError;

struct State<T, const N: usize> {
    items: Deque<T, N>,
    /// Items popped but not yet reported done.
    in_flight: usize,
    closed: bool,
}

/// Bounded multi-producer FIFO with blocking `push` and `pop`.
///
/// Once closed, `push` fails with [`QueueError::Shutdown`] and `pop` returns
/// what is left, then `None`.
pub struct BoundedQueue<T, const N: usize> {
    state: Mutex<State<T, N>>,
    not_full: Condvar,
    not_empty: Condvar,
    drained: Condvar,
}

impl<T, const N: usize> BoundedQueue<T, N> {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: Deque::new(),
                in_flight: 0,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T, N>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append `item`, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Shutdown`] if the queue is or becomes closed.
    pub fn push(&self, item: T) -> Result<(), QueueError> {
        let mut state = self.lock();
        while state.items.is_full() && !state.closed {
            state = self.not_full.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        if state.closed {
            return Err(QueueError::Shutdown);
        }
        let pushed = state.items.push_back(item);
        debug_assert!(pushed.is_ok());
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the oldest item, blocking while the queue is empty and open.
    ///
    /// The item counts as in flight until [`task_done`](Self::task_done).
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                state.in_flight += 1;
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self.not_empty.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Mark the most recently popped item as fully processed.
    pub fn task_done(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.items.is_empty() && state.in_flight == 0 {
            self.drained.notify_all();
        }
    }

    /// Block until every pushed item was popped and processed.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Shutdown`] if the queue was closed with items
    /// still pending.
    pub fn wait_drained(&self) -> Result<(), QueueError> {
        let mut state = self.lock();
        loop {
            if state.items.is_empty() && state.in_flight == 0 {
                return Ok(());
            }
            if state.closed {
                return Err(QueueError::Shutdown);
            }
            state = self.drained.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Close the queue, optionally discarding pending items.
    ///
    /// Wakes every blocked caller. Returns the number of discarded items.
    pub fn close(&self, discard: bool) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let discarded = if discard {
            let count = state.items.len();
            state.items.clear();
            count
        } else {
            0
        };
        self.not_full.notify_all();
        self.not_empty.notify_all();
        self.drained.notify_all();
        discarded
    }

    /// True once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued items (not counting in-flight ones).
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for BoundedQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
