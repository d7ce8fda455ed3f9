//! Server sender task (spec §4.B): one broadcast iteration per semaphore
//! wake, dropping frames to clients that are not currently writable.

use crate::client_entry::ClientEntry;
use crate::instance::ServerInstance;
use crate::params::ClientStateChange;
use relaycast_core::metrics;
use relaycast_link::addr::LinkMode;
use relaycast_link::frame::{Http200Ok, HttpContent};
use relaycast_link::io::write_data;
use relaycast_link::readiness::is_ready_for_writing;
use relaycast_link::IoOutcome;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

pub fn run(instance: &Arc<ServerInstance>) {
    loop {
        instance.semaphore.wait();
        if instance.quit.is_set() {
            return;
        }
        if instance.sender_suspended.load(std::sync::atomic::Ordering::SeqCst) {
            continue;
        }

        let buffer_out = instance.buffer_in.lock().take();
        let Some(buffer_out) = buffer_out else { continue };
        if buffer_out.is_empty() {
            continue;
        }

        let http_header = if instance.params.mode == LinkMode::Http {
            let boundary = Http200Ok::boundary(&instance.params.agent_name, &instance.params.agent_version);
            Some(HttpContent::prepare(&boundary, &instance.params.mime, buffer_out.len()))
        } else {
            None
        };

        let mut disconnected = Vec::new();
        {
            let mut clients = instance.clients.lock();
            let mut index = 0;
            while index < clients.len() {
                let client = clients[index].clone();
                if !client.is_authorized() || !is_writable(instance, &client) {
                    index += 1;
                    continue;
                }
                match deliver(instance, &client, http_header.as_deref(), &buffer_out) {
                    Ok(()) => {
                        metrics::inc_frames_sent();
                        metrics::add_bytes_sent(buffer_out.len() as u64);
                        index += 1;
                    }
                    Err(()) => {
                        disconnected.push(clients.remove(index));
                    }
                }
            }
        }

        for client in disconnected {
            metrics::inc_clients_disconnected();
            instance.fire_state_change(client.id, ClientStateChange::Disconnected);
        }
    }
}

/// Drop policy: a client not ready to accept a write within a zero timeout
/// is skipped this iteration, not disconnected. Datagram clients share the
/// listening socket, whose writability we don't probe per-client.
fn is_writable(instance: &ServerInstance, client: &ClientEntry) -> bool {
    match &client.socket {
        Some(socket) => is_ready_for_writing(socket.as_raw_fd(), 0),
        None => is_ready_for_writing(instance.socket.as_raw_fd(), 0),
    }
}

fn deliver(instance: &ServerInstance, client: &ClientEntry, http_header: Option<&[u8]>, body: &[u8]) -> Result<(), ()> {
    let (socket, peer) = match &client.socket {
        Some(socket) => (socket, None),
        None => (&instance.socket, client.peer.as_ref()),
    };
    if let Some(header) = http_header {
        if !matches!(write_data(socket, peer, header), Ok(IoOutcome::Ok(n)) if n == header.len()) {
            return Err(());
        }
    }
    match write_data(socket, peer, body) {
        Ok(IoOutcome::Ok(n)) if n == body.len() => Ok(()),
        _ => Err(()),
    }
}
