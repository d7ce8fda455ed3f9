//! A server-side accepted client: either an owned stream socket, or (for
//! datagram flavors) a peer address reachable through the server's shared
//! listening socket, plus the `AuthorizedFlag` of spec §3.

use relaycast_link::io::Peer;
use relaycast_link::RawSocket;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ClientEntry {
    pub id: u32,
    /// `Some` for connection-oriented clients (one socket per client).
    /// `None` for datagram clients, which share the server's listening
    /// socket and are addressed through `peer`.
    pub socket: Option<RawSocket>,
    pub peer: Option<Peer>,
    authorized: AtomicBool,
}

impl ClientEntry {
    pub fn new_stream(id: u32, socket: RawSocket, authorized: bool) -> Self {
        ClientEntry {
            id,
            socket: Some(socket),
            peer: None,
            authorized: AtomicBool::new(authorized),
        }
    }

    pub fn new_datagram(id: u32, peer: Peer, authorized: bool) -> Self {
        ClientEntry {
            id,
            socket: None,
            peer: Some(peer),
            authorized: AtomicBool::new(authorized),
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::Acquire)
    }

    pub fn set_authorized(&self, value: bool) {
        self.authorized.store(value, Ordering::Release);
    }

    /// Matches on datagram peer address identity; stream clients never
    /// match (each gets its own socket, so there is nothing to dedupe).
    pub fn matches_peer(&self, other: &Peer) -> bool {
        match &self.peer {
            Some(mine) => format!("{mine:?}") == format!("{other:?}"),
            None => false,
        }
    }
}
