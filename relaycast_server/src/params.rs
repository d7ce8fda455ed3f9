use relaycast_link::{LinkKind, LinkMode, Recipient};
use std::sync::Arc;

/// Server-side accept policy (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptMode {
    Automatic,
    Manual,
}

/// Fired when a client connects or disconnects (spec §4.B step 3, §4.B
/// sender step 4). The out-of-scope graphics/video collaborators subscribe
/// through this callback rather than the server depending on them.
#[derive(Debug, Clone, Copy)]
pub enum ClientStateChange {
    Connected,
    Disconnected,
}

pub type ClientStateCallback = Arc<dyn Fn(u32, ClientStateChange) + Send + Sync>;

#[derive(Clone)]
pub struct ServerParams {
    pub name: String,
    pub recipient: Recipient,
    pub kind: LinkKind,
    pub mode: LinkMode,
    pub mime: String,
    pub max_buffer_size: u32,
    pub accept_mode: AcceptMode,
    /// Required path when `mode == LinkMode::Http`, e.g. `"/stream"`.
    pub http_path: String,
    pub agent_name: String,
    pub agent_version: String,
    pub max_clients: i32,
    pub on_client_state_changed: Option<ClientStateCallback>,
}

impl ServerParams {
    pub fn new(name: impl Into<String>, recipient: Recipient, kind: LinkKind, mode: LinkMode) -> Self {
        ServerParams {
            name: name.into(),
            recipient,
            kind,
            mode,
            mime: "application/octet-stream".to_string(),
            max_buffer_size: 65536,
            accept_mode: AcceptMode::Automatic,
            http_path: "/".to_string(),
            agent_name: "relaycast".to_string(),
            agent_version: "1".to_string(),
            max_clients: 128,
            on_client_state_changed: None,
        }
    }
}
