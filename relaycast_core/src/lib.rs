//! Ambient stack shared by every relaycast crate: error taxonomy, the
//! counting semaphore and named-task helpers the concurrency model is built
//! on, the named-instance registry, Unix abstract-namespace naming, the
//! process-wide signal guard, and a handful of atomic counters.

pub mod error;
pub mod metrics;
pub mod naming;
pub mod registry;
pub mod signals;
pub mod sync;
pub mod task;

pub use error::ErrorKind;
