use relaycast_core::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("socket creation failed for every resolved address: {0}")]
    BindFailed(std::io::Error),
    #[error("i/o error on link: {0}")]
    Io(#[from] std::io::Error),
    #[error("handshake rejected by peer")]
    HandshakeRejected,
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),
    #[error("unsupported combination: HTTP mode requires an Inet stream link")]
    UnsupportedModeForKind,
}

impl Classify for LinkError {
    fn kind(&self) -> ErrorKind {
        match self {
            LinkError::BindFailed(_) | LinkError::Io(_) => ErrorKind::Io,
            LinkError::HandshakeRejected | LinkError::MalformedFrame(_) => ErrorKind::Params,
            LinkError::UnsupportedModeForKind => ErrorKind::Params,
        }
    }
}

/// Outcome of a non-blocking read/write attempt (spec §4.A).
#[derive(Debug)]
pub enum IoOutcome {
    /// Completed in full; carries the number of bytes transferred.
    Ok(usize),
    /// Would have blocked; carries the partial byte count already
    /// transferred before the transient condition was hit.
    Busy(usize),
}
