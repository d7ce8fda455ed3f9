//! A FIFO work queue with its own mutex and counting semaphore (spec §3
//! "Work queues"). Every element carries a monotonically increasing
//! sequence number; enqueue order is preserved and is all the ordering
//! guarantee the bus gives (spec §5 "Across queues there is no ordering
//! guarantee").

use parking_lot::Mutex;
use relaycast_core::sync::Semaphore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Envelope<T> {
    pub seq: u64,
    pub value: T,
}

pub struct WorkQueue<T> {
    items: Mutex<VecDeque<Envelope<T>>>,
    semaphore: Semaphore,
    next_seq: AtomicU64,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        WorkQueue {
            items: Mutex::new(VecDeque::new()),
            semaphore: Semaphore::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn push(&self, value: T) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.items.lock().push_back(Envelope { seq, value });
        self.semaphore.post();
    }

    /// Wait for an element, then pop and return it. Returns `None` if
    /// woken with nothing pending (can happen after `clear`).
    pub fn wait_and_pop(&self) -> Option<Envelope<T>> {
        self.semaphore.wait();
        self.items.lock().pop_front()
    }

    /// Drain every pending element (spec §4.D "Queues are cleared before
    /// the tasks are joined").
    pub fn clear(&self) -> Vec<Envelope<T>> {
        self.semaphore.drain();
        self.items.lock().drain(..).collect()
    }

    pub fn wake(&self) {
        self.semaphore.post();
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_enqueue_order() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.wait_and_pop().unwrap().value, 1);
        assert_eq!(queue.wait_and_pop().unwrap().value, 2);
        assert_eq!(queue.wait_and_pop().unwrap().value, 3);
    }

    #[test]
    fn clear_drains_pending_elements() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        queue.push(1);
        queue.push(2);
        let drained = queue.clear();
        assert_eq!(drained.len(), 2);
    }
}
