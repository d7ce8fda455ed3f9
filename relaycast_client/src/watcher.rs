//! Client watcher task (spec §4.C): consumes the handshake ack, then
//! reassembles frames (HTTP multipart or a single read) into `bufferIn`.

use crate::instance::ClientInstance;
use relaycast_link::addr::LinkMode;
use relaycast_link::frame::{CustomContent, Http200Ok, HttpContent};
use relaycast_link::io::try_read_once;
use relaycast_link::readiness::is_ready_for_reading;
use relaycast_link::IoOutcome;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

const READY_TIMEOUT_MS: u64 = 2000;
const READ_CHUNK: usize = 8192;
/// Header accumulation past this size without finding a terminator is
/// treated as a malformed stream.
const MAX_PENDING_HEADER: usize = 65536;

pub fn run(instance: &Arc<ClientInstance>) {
    loop {
        if instance.quit.is_set() {
            return;
        }
        if !is_ready_for_reading(instance.socket.as_raw_fd(), READY_TIMEOUT_MS) {
            continue;
        }
        if instance.quit.is_set() {
            return;
        }

        let mut chunk = [0u8; READ_CHUNK];
        let n = match try_read_once(&instance.socket, &mut chunk) {
            Ok(IoOutcome::Ok(n)) => n,
            Ok(IoOutcome::Busy(_)) => continue,
            Err(_) => {
                instance.report_link_broken();
                return;
            }
        };

        if n == 0 && instance.params.kind.is_connection_oriented() {
            instance.report_link_broken();
            return;
        }

        let mut state = instance.state.lock();
        if !state.ack_received {
            handle_handshake_bytes(instance, &mut state, &chunk[..n]);
        } else {
            drop(state);
            handle_frame_bytes(instance, &chunk[..n]);
        }
    }
}

fn handle_handshake_bytes(instance: &Arc<ClientInstance>, state: &mut crate::instance::ClientState, bytes: &[u8]) {
    match instance.params.mode {
        LinkMode::Http => {
            if Http200Ok::parse(bytes) {
                state.ack_received = true;
            } else {
                drop_and_report(instance);
            }
        }
        LinkMode::Custom => match CustomContent::parse(bytes) {
            Some(content) => {
                state.ack_received = true;
                if content.max_buffer_size != state.max_buffer_size {
                    state.max_buffer_size = content.max_buffer_size;
                }
            }
            None => drop_and_report(instance),
        },
        LinkMode::Standard => {
            state.ack_received = true;
        }
    }
}

fn drop_and_report(instance: &Arc<ClientInstance>) {
    instance.report_link_broken();
    instance.quit.set();
}

fn handle_frame_bytes(instance: &Arc<ClientInstance>, bytes: &[u8]) {
    let mut state = instance.state.lock();
    let max_buffer_size = state.max_buffer_size as usize;

    if instance.params.mode == LinkMode::Http {
        if state.http_header.is_none() {
            state.pending_header_bytes.extend_from_slice(bytes);
            if state.pending_header_bytes.len() > MAX_PENDING_HEADER {
                state.pending_header_bytes.clear();
                return;
            }
            if let Some(header) = HttpContent::parse(&state.pending_header_bytes) {
                let leftover = state.pending_header_bytes[header.body_start..].to_vec();
                state.http_header = Some(header);
                state.body_buf = leftover;
                state.pending_header_bytes.clear();
            } else {
                return;
            }
        } else {
            state.body_buf.extend_from_slice(bytes);
        }

        let Some(header) = state.http_header.clone() else { return };
        if state.body_buf.len() < header.length {
            return;
        }
        let frame: Vec<u8> = state.body_buf.drain(..header.length).collect();
        state.http_header = None;
        // Any bytes past this frame's body already belong to the next
        // frame's boundary/header; keep them instead of discarding them.
        state.pending_header_bytes = std::mem::take(&mut state.body_buf);
        state.buffer_in = Some(frame);
    } else {
        let take = bytes.len().min(max_buffer_size);
        state.buffer_in = Some(bytes[..take].to_vec());
    }

    drop(state);
    instance.semaphore.post();
}
