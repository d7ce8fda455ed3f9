//! `ClientInstance` (spec §3/§4.C): one outbound link plus the watcher and
//! receiver tasks that drive its handshake and delivery reassembly.

use crate::error::ClientError;
use crate::params::ClientParams;
use crate::{receiver, watcher};
use parking_lot::Mutex;
use relaycast_core::sync::Semaphore;
use relaycast_core::task::QuitFlag;
use relaycast_link::addr::LinkMode;
use relaycast_link::frame::{CustomHeader, HttpContentHeader, HttpGet};
use relaycast_link::transport::RawSocket;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Reassembly state, all of it mutated only under `ClientInstance::state`
/// (spec §3 `ClientInstance` invariant on `ackReceived`).
pub(crate) struct ClientState {
    pub ack_received: bool,
    pub max_buffer_size: u32,
    /// Raw bytes read but not yet attributed to a parsed `HttpContent`
    /// header (HTTP mode only).
    pub pending_header_bytes: Vec<u8>,
    /// In-progress HTTP body header, once parsed.
    pub http_header: Option<HttpContentHeader>,
    /// Body bytes accumulated so far for the in-progress HTTP frame.
    pub body_buf: Vec<u8>,
    /// Most recently completed frame, ready for the receiver task to copy
    /// out as `bufferOut` (spec §4.C receiver step 2).
    pub buffer_in: Option<Vec<u8>>,
}

pub struct ClientInstance {
    pub params: ClientParams,
    pub(crate) socket: RawSocket,
    pub(crate) state: Mutex<ClientState>,
    pub(crate) semaphore: Semaphore,
    pub(crate) quit: QuitFlag,
    watcher_handle: Mutex<Option<JoinHandle<()>>>,
    receiver_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ClientInstance {
    pub fn spawn(params: ClientParams) -> Result<Arc<ClientInstance>, ClientError> {
        let socket = relaycast_link::transport::connect_client(
            params.kind,
            params.mode,
            &params.recipient,
            &params.local_name,
        )?;

        // Standard mode has no handshake (spec §4.C `start`): the ack is
        // considered received immediately.
        let ack_received = params.mode == LinkMode::Standard;
        let max_buffer_size = params.max_buffer_size;

        Self::send_handshake_request(&socket, &params)?;

        let instance = Arc::new(ClientInstance {
            params,
            socket,
            state: Mutex::new(ClientState {
                ack_received,
                max_buffer_size,
                pending_header_bytes: Vec::new(),
                http_header: None,
                body_buf: Vec::new(),
                buffer_in: None,
            }),
            semaphore: Semaphore::new(),
            quit: QuitFlag::new(),
            watcher_handle: Mutex::new(None),
            receiver_handle: Mutex::new(None),
        });

        let watcher_instance = instance.clone();
        let watcher_name = format!("relaycast-client-watcher-{}", instance.params.name);
        let watcher_handle = relaycast_core::task::spawn_named(watcher_name, move || {
            watcher::run(&watcher_instance);
        })
        .map_err(ClientError::Task)?;

        let receiver_instance = instance.clone();
        let receiver_name = format!("relaycast-client-receiver-{}", instance.params.name);
        let receiver_handle = relaycast_core::task::spawn_named(receiver_name, move || {
            receiver::run(&receiver_instance);
        })
        .map_err(ClientError::Task)?;

        *instance.watcher_handle.lock() = Some(watcher_handle);
        *instance.receiver_handle.lock() = Some(receiver_handle);
        Ok(instance)
    }

    /// Sends the mode-specific handshake request before either task is
    /// spawned (spec §4.C `start`): `HttpGet` for HTTP, `CustomHeader` for
    /// Custom, nothing for Standard. The server's watcher blocks reading
    /// this request before it will reply with an ack.
    fn send_handshake_request(socket: &RawSocket, params: &ClientParams) -> Result<(), ClientError> {
        match params.mode {
            LinkMode::Http => {
                let (host, service) = params.recipient.as_inet().expect("HTTP client requires Recipient::Inet");
                let port: u16 = service.parse().unwrap_or(0);
                let request = HttpGet::prepare(&params.http_path, host, port, &params.agent_name, &params.agent_version);
                relaycast_link::io::write_data(socket, None, &request)?;
            }
            LinkMode::Custom => {
                relaycast_link::io::write_data(socket, None, &CustomHeader::prepare())?;
            }
            LinkMode::Standard => {}
        }
        Ok(())
    }

    /// `sendData` (spec §4.C): synchronous with respect to the caller, no
    /// queue. Partial writes ("busy") are not retried by this call.
    pub fn send_data(&self, buffer: &[u8]) -> Result<(), ClientError> {
        relaycast_link::io::write_data(&self.socket, None, buffer)?;
        Ok(())
    }

    pub(crate) fn report_link_broken(&self) {
        if let Some(cb) = &self.params.on_link_broken {
            cb();
        }
    }

    pub fn shutdown(&self) {
        self.quit.set();
        self.semaphore.post();
        if let Some(handle) = self.watcher_handle.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.receiver_handle.lock().take() {
            let _ = handle.join();
        }
    }
}
