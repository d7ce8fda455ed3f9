//! A counting semaphore built on `parking_lot::{Mutex, Condvar}`.
//!
//! Stable `std` has no counting semaphore and none of this workspace's other
//! dependencies (thiserror, tracing, libc, socket2) provide one either, so
//! this is the one primitive the crate hand-rolls rather than importing.
//! Every producer/consumer pair in the engine (server sender, client
//! receiver, the three controller-bus tasks) waits on one of these.

use parking_lot::{Condvar, Mutex};

pub struct Semaphore {
    count: Mutex<u64>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new() -> Self {
        Semaphore {
            count: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// Increment the pending count and wake one waiter.
    pub fn post(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cond.notify_one();
    }

    /// Block until at least one pending post is available, then consume it.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.cond.wait(&mut count);
        }
        *count -= 1;
    }

    /// Block until either a post arrives or `timeout` elapses. Returns
    /// `true` if a post was consumed.
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            let result = self.cond.wait_for(&mut count, timeout);
            if result.timed_out() && *count == 0 {
                return false;
            }
        }
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Drain all pending posts to zero without waiting. Used by
    /// `suspendSender` to guarantee the sender task observes the suspended
    /// flag before any already-posted frame is dispatched.
    pub fn drain(&self) {
        let mut count = self.count.lock();
        *count = 0;
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn post_then_wait_does_not_block() {
        let sem = Semaphore::new();
        sem.post();
        sem.wait();
    }

    #[test]
    fn drain_clears_pending_posts() {
        let sem = Semaphore::new();
        sem.post();
        sem.post();
        sem.drain();
        assert!(!sem.wait_timeout(Duration::from_millis(50)));
    }

    #[test]
    fn wait_wakes_on_post_from_another_thread() {
        let sem = Arc::new(Semaphore::new());
        let sem2 = sem.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            sem2.post();
        });
        assert!(sem.wait_timeout(Duration::from_secs(2)));
        handle.join().unwrap();
    }
}
