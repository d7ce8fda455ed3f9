//! Shared error taxonomy (spec §7). Each crate defines its own
//! `thiserror::Error` enum; every variant maps to one of these kinds so
//! callers that only care about the coarse category don't need to match on
//! every crate's concrete error type.

/// Coarse failure category, independent of which crate raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller passed a malformed envelope, unknown id, or missing field.
    Params,
    /// A module-level precondition was violated.
    State,
    /// A mutex/lock could not be acquired for the operation.
    Lock,
    /// The registry or a work queue could not be accessed.
    List,
    /// A socket operation failed (transient cases are handled internally
    /// and never surface as this kind; only permanent failures do).
    Io,
    /// A plug-in symbol could not be resolved, or its `init` failed.
    Lib,
    /// A worker thread could not be created or started.
    Task,
}

/// Implemented by every crate-local error enum so callers can ask "what kind
/// of failure is this" without matching on the concrete type.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
