//! Lock-free connection/frame counters, exposed in atomics-only
//! Prometheus text format.

use std::sync::atomic::{AtomicU64, Ordering};

static CLIENTS_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static CLIENTS_DISCONNECTED: AtomicU64 = AtomicU64::new(0);
static FRAMES_SENT: AtomicU64 = AtomicU64::new(0);
static FRAMES_DROPPED: AtomicU64 = AtomicU64::new(0);
static BYTES_SENT: AtomicU64 = AtomicU64::new(0);

pub fn inc_clients_accepted() {
    CLIENTS_ACCEPTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_clients_disconnected() {
    CLIENTS_DISCONNECTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_frames_sent() {
    FRAMES_SENT.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_frames_dropped() {
    FRAMES_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn add_bytes_sent(n: u64) {
    BYTES_SENT.fetch_add(n, Ordering::Relaxed);
}

/// Render counters in Prometheus exposition format.
pub fn render() -> String {
    format!(
        "# TYPE relaycast_clients_accepted_total counter\nrelaycast_clients_accepted_total {}\n\
         # TYPE relaycast_clients_disconnected_total counter\nrelaycast_clients_disconnected_total {}\n\
         # TYPE relaycast_frames_sent_total counter\nrelaycast_frames_sent_total {}\n\
         # TYPE relaycast_frames_dropped_total counter\nrelaycast_frames_dropped_total {}\n\
         # TYPE relaycast_bytes_sent_total counter\nrelaycast_bytes_sent_total {}\n",
        CLIENTS_ACCEPTED.load(Ordering::Relaxed),
        CLIENTS_DISCONNECTED.load(Ordering::Relaxed),
        FRAMES_SENT.load(Ordering::Relaxed),
        FRAMES_DROPPED.load(Ordering::Relaxed),
        BYTES_SENT.load(Ordering::Relaxed),
    )
}
