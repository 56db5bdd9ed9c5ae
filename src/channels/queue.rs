use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Unbounded FIFO queue shared between threads. One mutex guards the buffer,
/// one condvar wakes blocked receivers. The `try_` variants attempt the lock
/// instead of waiting on it, so a caller that must stay responsive never
/// blocks behind a concurrent operation.
pub struct Queue<T> {
    inner: Mutex<State<T>>,
    not_empty: Condvar,
}

struct State<T> {
    buf: VecDeque<T>,
    closed: bool,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State {
                buf: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueues an item. Blocks only for the lock; the item is never lost.
    /// Sending to a closed queue drops the item and returns false.
    pub fn send(&self, item: T) -> bool {
        let mut state = self.inner.lock().unwrap();
        if state.closed {
            return false;
        }
        state.buf.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Non-blocking send: returns false if the lock is contended or the queue
    /// is closed. Contention is not an error, the caller retries later.
    pub fn try_send(&self, item: T) -> bool {
        match self.inner.try_lock() {
            Ok(mut state) => {
                if state.closed {
                    return false;
                }
                state.buf.push_back(item);
                self.not_empty.notify_one();
                true
            }
            Err(_) => false,
        }
    }

    /// Blocks until an item is available. Returns None once the queue is
    /// closed and drained.
    pub fn recv(&self) -> Option<T> {
        let mut state = self.inner.lock().unwrap();
        loop {
            if let Some(item) = state.buf.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Blocks until an item is available or the timeout elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock().unwrap();
        loop {
            if let Some(item) = state.buf.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, result) = self.not_empty.wait_timeout(state, deadline - now).unwrap();
            state = guard;
            if result.timed_out() && state.buf.is_empty() {
                return None;
            }
        }
    }

    /// Non-blocking receive: returns None if the queue is empty or the lock
    /// is contended.
    pub fn try_recv(&self) -> Option<T> {
        match self.inner.try_lock() {
            Ok(mut state) => state.buf.pop_front(),
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes the queue and drains pending items. Blocked receivers wake up
    /// and observe None.
    pub fn close(&self) {
        let mut state = self.inner.lock().unwrap();
        state.closed = true;
        state.buf.clear();
        self.not_empty.notify_all();
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}
