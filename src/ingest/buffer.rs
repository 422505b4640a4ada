use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Bounded newest-wins buffer between the stream receiver and the fold
/// workers.
///
/// Producers never block: when the buffer is full the oldest reading is
/// evicted, since live traffic state only cares about recency. Consumers
/// block until a reading or close() arrives.
pub struct ReadingBuffer {
    state: Mutex<BufferState>,
    available: Condvar,
    capacity: usize,
}

struct BufferState {
    queue: VecDeque<String>,
    closed: bool,
}

impl ReadingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BufferState {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Enqueues a reading, evicting the oldest buffered one when full.
    /// Returns `true` if an eviction happened. Pushes after close are
    /// discarded (counted by the caller as overflow is not meaningful then).
    pub fn push(&self, line: String) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return false;
        }
        let evicted = if state.queue.len() >= self.capacity {
            state.queue.pop_front();
            true
        } else {
            false
        };
        state.queue.push_back(line);
        drop(state);
        self.available.notify_one();
        evicted
    }

    /// Blocks until a reading is available. `None` means the buffer was
    /// closed and fully drained; the consumer should exit.
    pub fn pop(&self) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(line) = state.queue.pop_front() {
                return Some(line);
            }
            if state.closed {
                return None;
            }
            state = self.available.wait(state).unwrap();
        }
    }

    /// Marks the end of the stream and wakes all blocked consumers.
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
