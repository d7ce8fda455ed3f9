//! `isReadyForReading`/`isReadyForWriting` (spec §4.A): a single-fd
//! readiness probe over `poll(2)`, matching the "select-like primitive with
//! a resolution of one millisecond" the spec calls for.

use std::os::unix::io::RawFd;

fn poll_single(fd: RawFd, events: libc::c_short, timeout_ms: u64) -> bool {
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    let timeout = timeout_ms.min(libc::c_int::MAX as u64) as libc::c_int;
    loop {
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout) };
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return false;
        }
        return ret > 0 && (pfd.revents & events) != 0;
    }
}

pub fn is_ready_for_reading(fd: RawFd, timeout_ms: u64) -> bool {
    poll_single(fd, libc::POLLIN, timeout_ms)
}

pub fn is_ready_for_writing(fd: RawFd, timeout_ms: u64) -> bool {
    poll_single(fd, libc::POLLOUT, timeout_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    #[test]
    fn ready_for_writing_on_connected_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (mut server_side, _) = listener.accept().unwrap();
        assert!(is_ready_for_writing(
            std::os::unix::io::AsRawFd::as_raw_fd(&client),
            1000
        ));
        server_side.write_all(b"x").unwrap();
    }

    #[test]
    fn not_ready_for_reading_with_nothing_sent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (_server_side, _) = listener.accept().unwrap();
        assert!(!is_ready_for_reading(
            std::os::unix::io::AsRawFd::as_raw_fd(&client),
            50
        ));
    }
}
