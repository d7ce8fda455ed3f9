//! Client handshake and frame-delivery tests against a hand-rolled fake
//! server, since the real server crate lives in a sibling crate.

use relaycast_client::params::ClientParams;
use relaycast_client::instance::ClientInstance;
use relaycast_link::{LinkKind, LinkMode, Recipient};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn custom_handshake_adopts_server_max_buffer_size_and_delivers_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server_thread = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut header = [0u8; 7];
        stream.read_exact(&mut header).unwrap();
        assert_eq!(&header, b"HELLO\r\n");
        stream
            .write_all(b"Mime: application/octet-stream\r\nMaxBufferSize: 16\r\n\r\n")
            .unwrap();
        std::thread::sleep(Duration::from_millis(100));
        stream.write_all(&[1, 2, 3, 4]).unwrap();
    });

    let received: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();

    let params = ClientParams {
        max_buffer_size: 4096,
        on_frame: Some(Arc::new(move |frame: &[u8]| {
            received_clone.lock().unwrap().push(frame.to_vec());
        })),
        ..ClientParams::new(
            "custom-client",
            Recipient::Inet {
                host: "127.0.0.1".to_string(),
                service: port.to_string(),
            },
            LinkKind::InetStream,
            LinkMode::Custom,
        )
    };

    let instance = ClientInstance::spawn(params).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        if !received.lock().unwrap().is_empty() {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "timed out waiting for frame");
        std::thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(received.lock().unwrap()[0], vec![1, 2, 3, 4]);
    instance.shutdown();
    server_thread.join().unwrap();
}

#[test]
fn broken_handshake_reports_link_broken() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server_thread = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut header = [0u8; 7];
        stream.read_exact(&mut header).unwrap();
        // Malformed ack: no MaxBufferSize field.
        stream.write_all(b"garbage\r\n\r\n").unwrap();
    });

    let broken_count = Arc::new(AtomicUsize::new(0));
    let broken_count_clone = broken_count.clone();

    let params = ClientParams {
        on_link_broken: Some(Arc::new(move || {
            broken_count_clone.fetch_add(1, Ordering::SeqCst);
        })),
        ..ClientParams::new(
            "broken-client",
            Recipient::Inet {
                host: "127.0.0.1".to_string(),
                service: port.to_string(),
            },
            LinkKind::InetStream,
            LinkMode::Custom,
        )
    };

    let instance = ClientInstance::spawn(params).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while broken_count.load(Ordering::SeqCst) == 0 {
        assert!(std::time::Instant::now() < deadline, "timed out waiting for link-broken callback");
        std::thread::sleep(Duration::from_millis(10));
    }

    instance.shutdown();
    server_thread.join().unwrap();
}
