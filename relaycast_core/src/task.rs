//! One OS thread per task, each given a descriptive name, plus the shared
//! `quit` flag every task body checks immediately after each suspension
//! point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A shared cancellation flag. Setting it and posting the relevant
/// semaphore (spec §5) is the universal shutdown signal.
#[derive(Clone, Default)]
pub struct QuitFlag(Arc<AtomicBool>);

impl QuitFlag {
    pub fn new() -> Self {
        QuitFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Spawn a named worker thread. Panics propagate to the caller's `join`
/// rather than being swallowed, matching the "no exceptions" design note:
/// task bodies return `Result`s internally and only panic on a genuine bug.
pub fn spawn_named<F>(name: impl Into<String>, body: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new().name(name.into()).spawn(body)
}
