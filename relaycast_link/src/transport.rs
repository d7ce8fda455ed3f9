//! Socket creation for the four `LinkKind`s: a getaddrinfo + `SO_REUSEADDR`
//! path for INET, and the Unix abstract-namespace naming convention of
//! spec §6.

use crate::addr::{LinkKind, LinkMode, Recipient};
use crate::error::LinkError;
use relaycast_core::naming::abstract_name;
use socket2::{Domain, Socket, Type};
use std::net::{TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::{UnixDatagram, UnixListener, UnixStream};

/// Which side of a handshake a freshly-created socket is on, used only to
/// decide the naming-convention prefix (`'s'` vs `'c'`) for Unix sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketHandshakeRole {
    Server,
    Client,
}

pub enum RawSocket {
    TcpStream(TcpStream),
    TcpListener(TcpListener),
    UdpSocket(UdpSocket),
    UnixStream(UnixStream),
    UnixListener(UnixListener),
    UnixDatagram(UnixDatagram),
}

impl RawSocket {
    pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
        match self {
            RawSocket::TcpStream(s) => s.set_nonblocking(nonblocking),
            RawSocket::TcpListener(s) => s.set_nonblocking(nonblocking),
            RawSocket::UdpSocket(s) => s.set_nonblocking(nonblocking),
            RawSocket::UnixStream(s) => s.set_nonblocking(nonblocking),
            RawSocket::UnixListener(s) => s.set_nonblocking(nonblocking),
            RawSocket::UnixDatagram(s) => s.set_nonblocking(nonblocking),
        }
    }

    pub fn is_connection_oriented(&self) -> bool {
        matches!(self, RawSocket::TcpStream(_) | RawSocket::UnixStream(_))
    }
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            RawSocket::TcpStream(s) => s.as_raw_fd(),
            RawSocket::TcpListener(s) => s.as_raw_fd(),
            RawSocket::UdpSocket(s) => s.as_raw_fd(),
            RawSocket::UnixStream(s) => s.as_raw_fd(),
            RawSocket::UnixListener(s) => s.as_raw_fd(),
            RawSocket::UnixDatagram(s) => s.as_raw_fd(),
        }
    }
}

fn unix_name(role: SocketHandshakeRole, kind: LinkKind, mode: LinkMode, socket_name: &str) -> String {
    let side = match role {
        SocketHandshakeRole::Server => 's',
        SocketHandshakeRole::Client => 'c',
    };
    abstract_name(side, kind.naming_code(), kind.naming_code(), mode.naming_code(), socket_name)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn unix_socket_addr(name: &str) -> std::io::Result<std::os::unix::net::SocketAddr> {
    use std::os::linux::net::SocketAddrExt;
    std::os::unix::net::SocketAddr::from_abstract_name(name.as_bytes())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn unix_socket_addr(name: &str) -> std::io::Result<std::os::unix::net::SocketAddr> {
    // Abstract namespace sockets are a Linux-only kernel feature; fall back
    // to a filesystem path under the system temp directory elsewhere.
    let path = std::env::temp_dir().join(format!("relaycast-{name}.sock"));
    let _ = std::fs::remove_file(&path);
    std::os::unix::net::SocketAddr::from_pathname(path)
}

/// Create and bind the server-side listening/receiving socket for `kind`,
/// setting it non-blocking and (INET only) enabling address reuse before
/// `listen()` for stream flavors.
pub fn bind_server(kind: LinkKind, mode: LinkMode, recipient: &Recipient, backlog: i32) -> Result<RawSocket, LinkError> {
    if !mode.is_valid_for(kind) {
        return Err(LinkError::UnsupportedModeForKind);
    }
    match kind {
        LinkKind::InetStream | LinkKind::InetDgram => {
            let (host, service) = recipient
                .as_inet()
                .expect("InetStream/InetDgram server requires a Recipient::Inet");
            let target = format!("{host}:{service}");
            let mut last_err = None;
            for candidate in target
                .to_socket_addrs()
                .map_err(LinkError::BindFailed)?
            {
                let domain = if candidate.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
                let ty = if kind == LinkKind::InetStream { Type::STREAM } else { Type::DGRAM };
                let socket = match Socket::new(domain, ty, None) {
                    Ok(s) => s,
                    Err(e) => {
                        last_err = Some(e);
                        continue;
                    }
                };
                if let Err(e) = socket.set_reuse_address(true) {
                    last_err = Some(e);
                    continue;
                }
                if let Err(e) = socket.bind(&candidate.into()) {
                    last_err = Some(e);
                    continue;
                }
                if kind == LinkKind::InetStream {
                    if let Err(e) = socket.listen(backlog) {
                        last_err = Some(e);
                        continue;
                    }
                    socket.set_nonblocking(true).map_err(LinkError::BindFailed)?;
                    return Ok(RawSocket::TcpListener(socket.into()));
                } else {
                    socket.set_nonblocking(true).map_err(LinkError::BindFailed)?;
                    return Ok(RawSocket::UdpSocket(socket.into()));
                }
            }
            Err(LinkError::BindFailed(
                last_err.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "no address resolved")),
            ))
        }
        LinkKind::UnixStream | LinkKind::UnixDgram => {
            let socket_name = recipient
                .as_unix_name()
                .expect("UnixStream/UnixDgram server requires a Recipient::Unix");
            let name = unix_name(SocketHandshakeRole::Server, kind, mode, socket_name);
            let address = unix_socket_addr(&name).map_err(LinkError::BindFailed)?;
            if kind == LinkKind::UnixStream {
                let listener = UnixListener::bind_addr(&address).map_err(LinkError::BindFailed)?;
                listener.set_nonblocking(true).map_err(LinkError::BindFailed)?;
                Ok(RawSocket::UnixListener(listener))
            } else {
                let socket = UnixDatagram::bind_addr(&address).map_err(LinkError::BindFailed)?;
                socket.set_nonblocking(true).map_err(LinkError::BindFailed)?;
                Ok(RawSocket::UnixDatagram(socket))
            }
        }
    }
}

/// Create the client-side socket for `kind`: a non-blocking `connect()` for
/// stream flavors, or a locally-bound abstract-namespace datagram socket
/// for datagram flavors (spec §4.C).
pub fn connect_client(kind: LinkKind, mode: LinkMode, recipient: &Recipient, local_name: &str) -> Result<RawSocket, LinkError> {
    if !mode.is_valid_for(kind) {
        return Err(LinkError::UnsupportedModeForKind);
    }
    match kind {
        LinkKind::InetStream => {
            let (host, service) = recipient.as_inet().expect("InetStream client requires Recipient::Inet");
            let target = format!("{host}:{service}");
            let addr = target
                .to_socket_addrs()
                .map_err(LinkError::BindFailed)?
                .next()
                .ok_or_else(|| LinkError::BindFailed(std::io::Error::new(std::io::ErrorKind::Other, "no address resolved")))?;
            let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
            let socket = Socket::new(domain, Type::STREAM, None).map_err(LinkError::BindFailed)?;
            socket.set_nonblocking(true).map_err(LinkError::BindFailed)?;
            match socket.connect(&addr.into()) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.raw_os_error() == Some(libc::EINPROGRESS) => {}
                Err(e) => return Err(LinkError::BindFailed(e)),
            }
            Ok(RawSocket::TcpStream(socket.into()))
        }
        LinkKind::InetDgram => {
            let (host, service) = recipient.as_inet().expect("InetDgram client requires Recipient::Inet");
            let target = format!("{host}:{service}");
            let addr = target
                .to_socket_addrs()
                .map_err(LinkError::BindFailed)?
                .next()
                .ok_or_else(|| LinkError::BindFailed(std::io::Error::new(std::io::ErrorKind::Other, "no address resolved")))?;
            let bind_addr = if addr.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
            let socket = UdpSocket::bind(bind_addr).map_err(LinkError::BindFailed)?;
            socket.connect(addr).map_err(LinkError::BindFailed)?;
            socket.set_nonblocking(true).map_err(LinkError::BindFailed)?;
            Ok(RawSocket::UdpSocket(socket))
        }
        LinkKind::UnixStream => {
            let socket_name = recipient.as_unix_name().expect("UnixStream client requires Recipient::Unix");
            let name = unix_name(SocketHandshakeRole::Server, kind, mode, socket_name);
            let server_addr = unix_socket_addr(&name).map_err(LinkError::BindFailed)?;
            let stream = UnixStream::connect_addr(&server_addr).map_err(LinkError::BindFailed)?;
            stream.set_nonblocking(true).map_err(LinkError::BindFailed)?;
            Ok(RawSocket::UnixStream(stream))
        }
        LinkKind::UnixDgram => {
            let socket_name = recipient.as_unix_name().expect("UnixDgram client requires Recipient::Unix");
            let server_name = unix_name(SocketHandshakeRole::Server, kind, mode, socket_name);
            let server_addr = unix_socket_addr(&server_name).map_err(LinkError::BindFailed)?;
            let local_addr = unix_socket_addr(&unix_name(SocketHandshakeRole::Client, kind, mode, local_name))
                .map_err(LinkError::BindFailed)?;
            let socket = UnixDatagram::bind_addr(&local_addr).map_err(LinkError::BindFailed)?;
            socket.connect_addr(&server_addr).map_err(LinkError::BindFailed)?;
            socket.set_nonblocking(true).map_err(LinkError::BindFailed)?;
            Ok(RawSocket::UnixDatagram(socket))
        }
    }
}
