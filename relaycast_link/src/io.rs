//! `readData`/`writeData` (spec §4.A): fill-to-length stream I/O with
//! `Busy`/`Ok`/`Error` outcomes, and single-datagram I/O that records or
//! targets a peer address.

use crate::error::{IoOutcome, LinkError};
use crate::transport::RawSocket;
use std::io::{Read, Write};
use std::net::SocketAddr as InetAddr;
use std::os::unix::net::SocketAddr as UnixAddr;

/// A datagram peer address, discovered by a server's `readData` call or
/// supplied to a client/server's `writeData` call.
#[derive(Debug, Clone)]
pub enum Peer {
    Inet(InetAddr),
    Unix(UnixAddr),
}

/// `send()`/`write()` block size once a single attempt reports the message
/// is too long for one datagram (spec §4.A "fixed block size"); kept well
/// under common path MTUs.
const DGRAM_BLOCK_SIZE: usize = 1200;

fn is_would_block(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
}

fn is_message_too_long(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::EMSGSIZE)
}

/// Fill `buffer` from a connection-oriented `src`, looping until full, EOF,
/// or a non-transient error. A zero-byte read before anything was filled is
/// orderly peer shutdown and is reported as `Ok(0)`.
fn read_stream_full<R: Read>(mut src: R, buffer: &mut [u8]) -> Result<IoOutcome, LinkError> {
    let mut filled = 0;
    while filled < buffer.len() {
        match src.read(&mut buffer[filled..]) {
            Ok(0) => return Ok(IoOutcome::Ok(filled)),
            Ok(n) => filled += n,
            Err(e) if is_would_block(&e) => return Ok(IoOutcome::Busy(filled)),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(LinkError::Io(e)),
        }
    }
    Ok(IoOutcome::Ok(filled))
}

fn write_stream_full<W: Write>(mut dst: W, buffer: &[u8]) -> Result<IoOutcome, LinkError> {
    let mut written = 0;
    while written < buffer.len() {
        match dst.write(&buffer[written..]) {
            Ok(0) => return Ok(IoOutcome::Ok(written)),
            Ok(n) => written += n,
            Err(e) if is_would_block(&e) => return Ok(IoOutcome::Busy(written)),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if is_message_too_long(&e) => {
                return write_in_blocks(|chunk| dst.write(chunk), &buffer[written..]).map(|n| match n {
                    IoOutcome::Ok(extra) => IoOutcome::Ok(written + extra),
                    IoOutcome::Busy(extra) => IoOutcome::Busy(written + extra),
                });
            }
            Err(e) => return Err(LinkError::Io(e)),
        }
    }
    Ok(IoOutcome::Ok(written))
}

fn write_in_blocks(
    mut send_one: impl FnMut(&[u8]) -> std::io::Result<usize>,
    buffer: &[u8],
) -> Result<IoOutcome, LinkError> {
    let mut written = 0;
    while written < buffer.len() {
        let end = (written + DGRAM_BLOCK_SIZE).min(buffer.len());
        match send_one(&buffer[written..end]) {
            Ok(0) => return Ok(IoOutcome::Ok(written)),
            Ok(n) => written += n,
            Err(e) if is_would_block(&e) => return Ok(IoOutcome::Busy(written)),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(LinkError::Io(e)),
        }
    }
    Ok(IoOutcome::Ok(written))
}

/// A single non-blocking read attempt, with no fill-to-length loop. Used by
/// the client's HTTP watcher, which must parse a variable-length header
/// that can arrive split across several readiness windows (spec §3
/// `ClientInstance.nbBodyRead`).
pub fn try_read_once(socket: &RawSocket, buffer: &mut [u8]) -> Result<IoOutcome, LinkError> {
    match socket {
        RawSocket::TcpStream(s) => match s.read(buffer) {
            Ok(n) => Ok(IoOutcome::Ok(n)),
            Err(e) if is_would_block(&e) => Ok(IoOutcome::Busy(0)),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(IoOutcome::Busy(0)),
            Err(e) => Err(LinkError::Io(e)),
        },
        RawSocket::UnixStream(s) => match s.read(buffer) {
            Ok(n) => Ok(IoOutcome::Ok(n)),
            Err(e) if is_would_block(&e) => Ok(IoOutcome::Busy(0)),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(IoOutcome::Busy(0)),
            Err(e) => Err(LinkError::Io(e)),
        },
        RawSocket::UdpSocket(s) => match s.recv(buffer) {
            Ok(n) => Ok(IoOutcome::Ok(n)),
            Err(e) if is_would_block(&e) => Ok(IoOutcome::Busy(0)),
            Err(e) => Err(LinkError::Io(e)),
        },
        RawSocket::UnixDatagram(s) => match s.recv(buffer) {
            Ok(n) => Ok(IoOutcome::Ok(n)),
            Err(e) if is_would_block(&e) => Ok(IoOutcome::Busy(0)),
            Err(e) => Err(LinkError::Io(e)),
        },
        RawSocket::TcpListener(_) | RawSocket::UnixListener(_) => {
            Err(LinkError::MalformedFrame("cannot read from a listening socket"))
        }
    }
}

/// Attempt to fill `buffer.len()` bytes from `socket`. For connection-
/// oriented sockets this loops to completion/EOF/Busy. For datagram
/// sockets a single message is read and the sender's address is returned.
pub fn read_data(socket: &RawSocket, buffer: &mut [u8]) -> Result<(IoOutcome, Option<Peer>), LinkError> {
    match socket {
        RawSocket::TcpStream(s) => Ok((read_stream_full(s, buffer)?, None)),
        RawSocket::UnixStream(s) => Ok((read_stream_full(s, buffer)?, None)),
        RawSocket::UdpSocket(s) => match s.recv_from(buffer) {
            Ok((n, peer)) => Ok((IoOutcome::Ok(n), Some(Peer::Inet(peer)))),
            Err(e) if is_would_block(&e) => Ok((IoOutcome::Busy(0), None)),
            Err(e) => Err(LinkError::Io(e)),
        },
        RawSocket::UnixDatagram(s) => match s.recv_from(buffer) {
            Ok((n, peer)) => Ok((IoOutcome::Ok(n), Some(Peer::Unix(peer)))),
            Err(e) if is_would_block(&e) => Ok((IoOutcome::Busy(0), None)),
            Err(e) => Err(LinkError::Io(e)),
        },
        RawSocket::TcpListener(_) | RawSocket::UnixListener(_) => {
            Err(LinkError::MalformedFrame("cannot read from a listening socket"))
        }
    }
}

/// Write `buffer` to `socket`. For datagram sockets not already `connect()`ed
/// to a single peer, `peer` selects the destination via `send_to`.
pub fn write_data(socket: &RawSocket, peer: Option<&Peer>, buffer: &[u8]) -> Result<IoOutcome, LinkError> {
    match socket {
        RawSocket::TcpStream(s) => write_stream_full(s, buffer),
        RawSocket::UnixStream(s) => write_stream_full(s, buffer),
        RawSocket::UdpSocket(s) => match peer {
            Some(Peer::Inet(addr)) => write_in_blocks(|chunk| s.send_to(chunk, addr), buffer),
            _ => write_in_blocks(|chunk| s.send(chunk), buffer),
        },
        RawSocket::UnixDatagram(s) => match peer {
            Some(Peer::Unix(addr)) => write_in_blocks(|chunk| s.send_to_addr(chunk, addr), buffer),
            _ => write_in_blocks(|chunk| s.send(chunk), buffer),
        },
        RawSocket::TcpListener(_) | RawSocket::UnixListener(_) => {
            Err(LinkError::MalformedFrame("cannot write to a listening socket"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};

    #[test]
    fn zero_byte_read_on_stream_is_orderly_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        drop(server_side);
        client.set_nonblocking(true).unwrap();
        // Give the FIN a moment to arrive.
        std::thread::sleep(std::time::Duration::from_millis(50));
        let mut buf = [0u8; 16];
        let outcome = read_stream_full(&client, &mut buf).unwrap();
        match outcome {
            IoOutcome::Ok(0) => {}
            other => panic!("expected Ok(0), got {other:?}"),
        }
    }
}
