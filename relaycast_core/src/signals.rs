//! Process-wide signal guard (spec §4.A, §9 "Global mutable state").
//!
//! Installed once via `std::sync::Once`.
//! This crate has no hot-reload concept; the guard exists purely so a
//! thread blocked in a
//! syscall (the rare case where a handshake read hasn't yet been switched
//! to non-blocking, or the initial `connect()`) can be interrupted with
//! `EINTR` instead of hanging past the point where `quit` was set. The
//! handler itself does nothing: receiving the signal is enough to unblock
//! the syscall, and every task loop re-checks its `quit` flag right after.
#![cfg(unix)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static TERM_INIT: Once = Once::new();
static TERMINATE: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_wake(_sig: libc::c_int) {}

extern "C" fn handle_term(_sig: libc::c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

/// Install a no-op handler for `SIGUSR1` so `wake_blocked_thread` can
/// interrupt a blocking syscall on another thread. Idempotent.
pub fn install_wake_signal() {
    INIT.call_once(|| unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_wake as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut());
    });
}

/// Send `SIGUSR1` to a specific thread to unblock a syscall it may be
/// stuck in. `tid` is a `libc::pthread_t` obtained via `libc::pthread_self()`
/// from within the target thread at startup.
pub fn wake_blocked_thread(tid: libc::pthread_t) {
    unsafe {
        libc::pthread_kill(tid, libc::SIGUSR1);
    }
}

/// Install SIGINT/SIGTERM handlers so the daemon's main loop can poll
/// `should_terminate` instead of relying on the default abrupt-exit
/// disposition. Idempotent.
pub fn install_term_signal() {
    TERM_INIT.call_once(|| unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_term as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut());
        libc::sigaction(libc::SIGTERM, &action, std::ptr::null_mut());
    });
}

pub fn should_terminate() -> bool {
    TERMINATE.load(Ordering::SeqCst)
}
