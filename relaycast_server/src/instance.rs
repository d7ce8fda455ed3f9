//! `ServerInstance` (spec §3/§4.B): a listen socket, a dynamic client list,
//! and the watcher/sender task pair that drive them.

use crate::client_entry::ClientEntry;
use crate::error::ServerError;
use crate::params::{ClientStateChange, ServerParams};
use crate::{sender, watcher};
use relaycast_core::task::QuitFlag;
use relaycast_core::{metrics, sync::Semaphore};
use relaycast_link::transport::RawSocket;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

const LISTEN_BACKLOG: i32 = 128;

pub struct ServerInstance {
    pub params: ServerParams,
    pub(crate) socket: RawSocket,
    pub(crate) clients: Mutex<Vec<Arc<ClientEntry>>>,
    /// `bufferIn`: the current frame view, `None` iff nothing posted since
    /// the last drain (spec §3 `ServerInstance` invariant).
    pub(crate) buffer_in: Mutex<Option<Vec<u8>>>,
    pub(crate) semaphore: Semaphore,
    pub(crate) sender_suspended: AtomicBool,
    pub(crate) quit: QuitFlag,
    next_client_seq: AtomicU32,
    watcher_handle: Mutex<Option<JoinHandle<()>>>,
    sender_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ServerInstance {
    pub fn spawn(params: ServerParams) -> Result<Arc<ServerInstance>, ServerError> {
        let socket = relaycast_link::transport::bind_server(
            params.kind,
            params.mode,
            &params.recipient,
            LISTEN_BACKLOG,
        )?;

        let instance = Arc::new(ServerInstance {
            params,
            socket,
            clients: Mutex::new(Vec::new()),
            buffer_in: Mutex::new(None),
            semaphore: Semaphore::new(),
            sender_suspended: AtomicBool::new(false),
            quit: QuitFlag::new(),
            next_client_seq: AtomicU32::new(0),
            watcher_handle: Mutex::new(None),
            sender_handle: Mutex::new(None),
        });

        let watcher_instance = instance.clone();
        let watcher_name = format!("relaycast-server-watcher-{}", instance.params.name);
        let watcher_handle = relaycast_core::task::spawn_named(watcher_name, move || {
            watcher::run(&watcher_instance);
        })
        .map_err(ServerError::Task)?;

        let sender_instance = instance.clone();
        let sender_name = format!("relaycast-server-sender-{}", instance.params.name);
        let sender_handle = relaycast_core::task::spawn_named(sender_name, move || {
            sender::run(&sender_instance);
        })
        .map_err(ServerError::Task)?;

        *instance.watcher_handle.lock() = Some(watcher_handle);
        *instance.sender_handle.lock() = Some(sender_handle);
        Ok(instance)
    }

    /// Next `Link.id` (spec §3: `currentClientCount + wallClockSeconds`).
    pub(crate) fn next_client_id(&self) -> u32 {
        let seq = self.next_client_seq.fetch_add(1, Ordering::Relaxed);
        let wall_clock = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        seq.wrapping_add(wall_clock)
    }

    pub(crate) fn fire_state_change(&self, id: u32, change: ClientStateChange) {
        if let Some(cb) = &self.params.on_client_state_changed {
            cb(id, change);
        }
    }

    /// `addReceiver` (spec §4.B): flips the client's authorization flag on
    /// under the client-list lock.
    pub fn add_receiver(&self, client_id: u32) {
        let clients = self.clients.lock();
        if let Some(client) = clients.iter().find(|c| c.id == client_id) {
            client.set_authorized(true);
        }
    }

    /// `removeReceiver` (spec §4.B).
    pub fn remove_receiver(&self, client_id: u32) {
        let clients = self.clients.lock();
        if let Some(client) = clients.iter().find(|c| c.id == client_id) {
            client.set_authorized(false);
        }
    }

    /// `suspendSender` (spec §4.B): set `senderSuspended`, drain the
    /// semaphore, and clear `bufferIn` so the sender observes suspension
    /// before any already-posted frame is dispatched.
    pub fn suspend_sender(&self) {
        self.sender_suspended.store(true, Ordering::SeqCst);
        self.semaphore.drain();
        *self.buffer_in.lock() = None;
    }

    /// `resumeSender` (spec §4.B).
    pub fn resume_sender(&self) {
        self.sender_suspended.store(false, Ordering::SeqCst);
    }

    /// `disconnectClient` (spec §4.B): remove the client from the list,
    /// closing its socket and releasing it.
    pub fn disconnect_client(&self, client_id: u32) {
        let removed = {
            let mut clients = self.clients.lock();
            let position = clients.iter().position(|c| c.id == client_id);
            position.map(|idx| clients.remove(idx))
        };
        if removed.is_some() {
            metrics::inc_clients_disconnected();
            self.fire_state_change(client_id, ClientStateChange::Disconnected);
        }
    }

    /// `sendData` (spec §4.B): under the instance mutex, store the caller's
    /// buffer and post the semaphore if not suspended. A zero-length buffer
    /// is "nothing to send" (spec §8 Boundaries) and is not posted.
    pub fn send_data(&self, buffer: &[u8]) {
        if buffer.is_empty() {
            return;
        }
        if self.sender_suspended.load(Ordering::SeqCst) {
            return;
        }
        *self.buffer_in.lock() = Some(buffer.to_vec());
        self.semaphore.post();
    }

    /// `stop` (spec §4.B): set `quit`, post the sender semaphore so it
    /// wakes and observes `quit`, join both tasks, then empty the client
    /// list (closing each socket) and close the listen socket by dropping
    /// this instance.
    pub fn shutdown(&self) {
        self.quit.set();
        self.semaphore.post();
        if let Some(handle) = self.watcher_handle.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.sender_handle.lock().take() {
            let _ = handle.join();
        }
        self.clients.lock().clear();
    }
}
