//! The link helper (spec §4.A): stateless per-call wire framing, a
//! select-like readiness probe, and non-blocking-aware read/write helpers.
//! Shared by `relaycast_server` and `relaycast_client`.

pub mod addr;
pub mod error;
pub mod frame;
pub mod io;
pub mod readiness;
pub mod transport;

pub use addr::{LinkKind, LinkMode, Recipient};
pub use error::{IoOutcome, LinkError};
pub use transport::{RawSocket, SocketHandshakeRole};
