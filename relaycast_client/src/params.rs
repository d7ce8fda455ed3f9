use relaycast_link::{LinkKind, LinkMode, Recipient};
use std::sync::Arc;

/// Invoked once per reassembled frame (spec §4.C receiver task step 3).
pub type FrameCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Invoked when the handshake fails to parse, or a stream read returns
/// zero bytes (spec §4.C watcher task step 2).
pub type LinkBrokenCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct ClientParams {
    pub name: String,
    pub recipient: Recipient,
    pub kind: LinkKind,
    pub mode: LinkMode,
    /// Configured maximum frame size; datagram/custom handshakes may
    /// replace this with the server-advertised value (spec §8 property 6).
    pub max_buffer_size: u32,
    /// Required when `mode == LinkMode::Http`.
    pub http_path: String,
    pub agent_name: String,
    pub agent_version: String,
    /// Local abstract-namespace bind name for datagram flavors; must be
    /// unique among clients of the same server (spec §6 `"c"` convention).
    pub local_name: String,
    pub on_frame: Option<FrameCallback>,
    pub on_link_broken: Option<LinkBrokenCallback>,
}

impl ClientParams {
    pub fn new(name: impl Into<String>, recipient: Recipient, kind: LinkKind, mode: LinkMode) -> Self {
        let name = name.into();
        ClientParams {
            local_name: name.clone(),
            name,
            recipient,
            kind,
            mode,
            max_buffer_size: 65536,
            http_path: "/".to_string(),
            agent_name: "relaycast".to_string(),
            agent_version: "1".to_string(),
            on_frame: None,
            on_link_broken: None,
        }
    }
}
