//! Server watcher task (spec §4.B): accepts new connections (or learns new
//! datagram peers) and runs the mode-specific handshake before the client
//! becomes eligible for broadcast.

use crate::client_entry::ClientEntry;
use crate::instance::ServerInstance;
use crate::params::{AcceptMode, ClientStateChange};
use relaycast_core::metrics;
use relaycast_link::addr::LinkMode;
use relaycast_link::frame::{CustomContent, CustomHeader, Http200Ok, Http400BadRequest, Http404NotFound, HttpGet};
use relaycast_link::io::{read_data, write_data, Peer};
use relaycast_link::readiness::is_ready_for_reading;
use relaycast_link::transport::RawSocket;
use relaycast_link::IoOutcome;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

const READY_TIMEOUT_MS: u64 = 2000;
const HANDSHAKE_TIMEOUT_MS: u64 = 2000;
const HANDSHAKE_SCRATCH: usize = 8192;

pub fn run(instance: &Arc<ServerInstance>) {
    loop {
        if instance.quit.is_set() {
            return;
        }
        let fd = instance.socket.as_raw_fd();
        if !is_ready_for_reading(fd, READY_TIMEOUT_MS) {
            continue;
        }
        if instance.quit.is_set() {
            return;
        }
        if instance.params.kind.is_connection_oriented() {
            accept_stream(instance);
        } else {
            accept_datagram(instance);
        }
    }
}

fn accept_stream(instance: &Arc<ServerInstance>) {
    let accepted = match &instance.socket {
        RawSocket::TcpListener(listener) => listener.accept().ok().map(|(s, _)| RawSocket::TcpStream(s)),
        RawSocket::UnixListener(listener) => listener.accept().ok().map(|(s, _)| RawSocket::UnixStream(s)),
        _ => None,
    };
    let Some(socket) = accepted else { return };
    if socket.set_nonblocking(true).is_err() {
        return;
    }

    match instance.params.mode {
        LinkMode::Standard => insert_stream_client(instance, socket),
        LinkMode::Custom => handshake_custom_stream(instance, socket),
        LinkMode::Http => handshake_http(instance, socket),
    }
}

fn accept_datagram(instance: &Arc<ServerInstance>) {
    let mut scratch = [0u8; HANDSHAKE_SCRATCH];
    let (outcome, peer) = match read_data(&instance.socket, &mut scratch) {
        Ok(result) => result,
        Err(_) => return,
    };
    let (IoOutcome::Ok(n), Some(peer)) = (outcome, peer) else {
        return;
    };
    if n == 0 {
        return;
    }

    {
        let clients = instance.clients.lock();
        if clients.iter().any(|c| c.matches_peer(&peer)) {
            return;
        }
    }

    match instance.params.mode {
        LinkMode::Http => {}
        LinkMode::Standard => insert_datagram_client(instance, peer),
        LinkMode::Custom => {
            if CustomHeader::parse(&scratch[..n]) {
                let reply = CustomContent::prepare(&instance.params.mime, instance.params.max_buffer_size);
                let _ = write_data(&instance.socket, Some(&peer), &reply);
                insert_datagram_client(instance, peer);
            }
        }
    }
}

fn handshake_custom_stream(instance: &Arc<ServerInstance>, socket: RawSocket) {
    if !is_ready_for_reading(socket.as_raw_fd(), HANDSHAKE_TIMEOUT_MS) {
        return;
    }
    let mut header = [0u8; 7];
    match read_data(&socket, &mut header) {
        Ok((IoOutcome::Ok(n), _)) if n == header.len() && CustomHeader::parse(&header) => {}
        _ => return,
    }
    let reply = CustomContent::prepare(&instance.params.mime, instance.params.max_buffer_size);
    if write_data(&socket, None, &reply).is_err() {
        return;
    }
    insert_stream_client(instance, socket);
}

fn handshake_http(instance: &Arc<ServerInstance>, socket: RawSocket) {
    if !is_ready_for_reading(socket.as_raw_fd(), HANDSHAKE_TIMEOUT_MS) {
        return;
    }
    let mut scratch = [0u8; HANDSHAKE_SCRATCH];
    let n = match read_data(&socket, &mut scratch) {
        Ok((IoOutcome::Ok(n), _)) if n > 0 => n,
        _ => return,
    };
    let (is_get, parsed) = HttpGet::parse(&scratch[..n]);
    let local_ip = "0.0.0.0";
    let local_port = 0u16;
    if !is_get || parsed.is_none() {
        let reply = Http400BadRequest::prepare(local_ip, local_port, &instance.params.http_path);
        let _ = write_data(&socket, None, &reply);
        return;
    }
    let request = parsed.unwrap();
    if request.path != instance.params.http_path {
        let reply = Http404NotFound::prepare(local_ip, local_port, &instance.params.http_path, &request.path);
        let _ = write_data(&socket, None, &reply);
        return;
    }
    let reply = Http200Ok::prepare(&instance.params.agent_name, &instance.params.agent_version);
    if write_data(&socket, None, &reply).is_err() {
        return;
    }
    insert_stream_client(instance, socket);
}

fn insert_stream_client(instance: &Arc<ServerInstance>, socket: RawSocket) {
    insert_client(instance, |id| ClientEntry::new_stream(id, socket, authorized_for(instance)));
}

fn insert_datagram_client(instance: &Arc<ServerInstance>, peer: Peer) {
    insert_client(instance, |id| ClientEntry::new_datagram(id, peer, authorized_for(instance)));
}

fn authorized_for(instance: &Arc<ServerInstance>) -> bool {
    instance.params.accept_mode == AcceptMode::Automatic
}

fn insert_client(instance: &Arc<ServerInstance>, build: impl FnOnce(u32) -> ClientEntry) {
    let id = instance.next_client_id();
    let entry = Arc::new(build(id));
    {
        let mut clients = instance.clients.lock();
        if instance.params.max_clients >= 0 && clients.len() as i32 >= instance.params.max_clients {
            return;
        }
        clients.push(entry);
    }
    metrics::inc_clients_accepted();
    instance.fire_state_change(id, ClientStateChange::Connected);
}
