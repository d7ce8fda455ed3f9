//! End-to-end server scenarios over real loopback sockets.

use relaycast_link::{LinkKind, LinkMode, Recipient};
use relaycast_server::params::ServerParams;
use relaycast_server::instance::ServerInstance;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::os::unix::net::UnixDatagram;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

fn free_tcp_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn read_available(stream: &mut TcpStream, deadline: Duration) -> Vec<u8> {
    stream.set_read_timeout(Some(deadline)).unwrap();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    buf
}

/// S1 — HTTP handshake happy path.
#[test]
fn http_handshake_happy_path() {
    let port = free_tcp_port();
    let params = http_params(port, "/stream");
    let instance = ServerInstance::spawn(params).unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    client
        .write_all(b"GET /stream HTTP/1.0\r\nHOST: 127.0.0.1:8080\r\nUser-Agent: x v1\r\nConnection: keep-alive\r\n\r\n")
        .unwrap();

    let response = read_available(&mut client, Duration::from_secs(2));
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.0 200 OK\r\n"), "got: {text}");
    assert!(text.contains("boundary=.-_."));

    instance.shutdown();
}

/// S2 — HTTP 404.
#[test]
fn http_unknown_path_returns_404() {
    let port = free_tcp_port();
    let params = http_params(port, "/stream");
    let instance = ServerInstance::spawn(params).unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    client
        .write_all(b"GET /other HTTP/1.0\r\nHOST: 127.0.0.1:8080\r\nUser-Agent: x v1\r\nConnection: keep-alive\r\n\r\n")
        .unwrap();

    let response = read_available(&mut client, Duration::from_secs(2));
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.0 404 Not Found\r\n"), "got: {text}");
    assert!(text.contains("/other"));
    assert!(text.contains("/stream"));

    instance.shutdown();
}

/// S3 — Custom datagram broadcast.
#[test]
fn custom_datagram_broadcast() {
    let socket_name = format!("feed-{}", unique_suffix());
    let params = ServerParams::new(
        format!("srv-{socket_name}"),
        Recipient::Unix { socket_name: socket_name.clone() },
        LinkKind::UnixDgram,
        LinkMode::Custom,
    );
    let mut params = params;
    params.mime = "application/octet-stream".to_string();
    params.max_buffer_size = 1024;
    let instance = ServerInstance::spawn(params).unwrap();

    let client_a = connect_datagram_client(&socket_name, "a");
    let client_b = connect_datagram_client(&socket_name, "b");

    client_a.send(b"HELLO\r\n").unwrap();
    let reply_a = recv_with_timeout(&client_a);
    assert_eq!(reply_a, b"Mime: application/octet-stream\r\nMaxBufferSize: 1024\r\n\r\n");

    client_b.send(b"HELLO\r\n").unwrap();
    let reply_b = recv_with_timeout(&client_b);
    assert_eq!(reply_b, b"Mime: application/octet-stream\r\nMaxBufferSize: 1024\r\n\r\n");

    // Give the watcher a moment to register both clients before broadcasting.
    std::thread::sleep(Duration::from_millis(100));

    instance.send_data(&[0xDE, 0xAD, 0xBE, 0xEF]);

    assert_eq!(recv_with_timeout(&client_a), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(recv_with_timeout(&client_b), vec![0xDE, 0xAD, 0xBE, 0xEF]);

    instance.shutdown();
}

/// S4 — Sender suspend+resume: the middle frame is dropped.
#[test]
fn suspend_and_resume_drops_the_suspended_frame() {
    let port = free_tcp_port();
    let params = http_params(port, "/stream");
    let instance = ServerInstance::spawn(params).unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    client
        .write_all(b"GET /stream HTTP/1.0\r\nHOST: 127.0.0.1:8080\r\nUser-Agent: x v1\r\nConnection: keep-alive\r\n\r\n")
        .unwrap();
    let _handshake = read_available(&mut client, Duration::from_secs(2));
    std::thread::sleep(Duration::from_millis(100));

    instance.send_data(b"AAAA");
    let first = read_available(&mut client, Duration::from_millis(500));
    assert!(String::from_utf8_lossy(&first).contains("AAAA"));

    instance.suspend_sender();
    instance.send_data(b"BBBB");
    instance.resume_sender();
    instance.send_data(b"CCCC");

    let second = read_available(&mut client, Duration::from_millis(500));
    let text = String::from_utf8_lossy(&second);
    assert!(text.contains("CCCC"));
    assert!(!text.contains("BBBB"));

    instance.shutdown();
}

fn http_params(port: u16, path: &str) -> ServerParams {
    let recipient = Recipient::Inet {
        host: "127.0.0.1".to_string(),
        service: port.to_string(),
    };
    let mut params = ServerParams::new(format!("http-{port}"), recipient, LinkKind::InetStream, LinkMode::Http);
    params.http_path = path.to_string();
    params.agent_name = "relaycast".to_string();
    params.agent_version = "1".to_string();
    params
}

fn unique_suffix() -> u32 {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn connect_datagram_client(server_socket_name: &str, local_tag: &str) -> UnixDatagram {
    let recipient = Recipient::Unix {
        socket_name: server_socket_name.to_string(),
    };
    // Uses the same client connector the production client crate will use,
    // so the test exercises the real abstract-namespace naming convention.
    match relaycast_link::transport::connect_client(LinkKind::UnixDgram, LinkMode::Custom, &recipient, local_tag).unwrap() {
        relaycast_link::transport::RawSocket::UnixDatagram(socket) => socket,
        _ => unreachable!(),
    }
}

/// `connect_client` sets the socket non-blocking, so reads must be polled
/// rather than relying on `SO_RCVTIMEO`.
fn recv_with_timeout(socket: &UnixDatagram) -> Vec<u8> {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut buf = [0u8; 4096];
    loop {
        match socket.recv(&mut buf) {
            Ok(n) => return buf[..n].to_vec(),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    panic!("timed out waiting for datagram");
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => panic!("recv failed: {e}"),
        }
    }
}
