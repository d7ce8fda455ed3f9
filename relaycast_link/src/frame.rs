//! The five wire formats of spec §4.A / §6, exact bytes grounded in
//! `examples/original_source/src/network/LinkHelper.c`.

use crate::error::LinkError;

const CRLF: &str = "\r\n";

// ---------------------------------------------------------------- CustomHeader

/// Literal `"HELLO\r\n"` handshake header. Parsing it is an identity
/// check: the peer either sent exactly this, or the handshake failed.
pub struct CustomHeader;

impl CustomHeader {
    pub const WIRE: &'static str = "HELLO\r\n";

    pub fn prepare() -> Vec<u8> {
        Self::WIRE.as_bytes().to_vec()
    }

    /// Identity parse: recognizes the literal header.
    pub fn parse(buf: &[u8]) -> bool {
        buf == Self::WIRE.as_bytes()
    }
}

// --------------------------------------------------------------- CustomContent

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomContent {
    pub mime: String,
    pub max_buffer_size: u32,
}

impl CustomContent {
    pub fn prepare(mime: &str, max_buffer_size: u32) -> Vec<u8> {
        format!("Mime: {mime}{CRLF}MaxBufferSize: {max_buffer_size}{CRLF}{CRLF}").into_bytes()
    }

    /// Returns `None` (handshake rejected) if `MaxBufferSize` is missing or
    /// not positive, per spec §4.A.
    pub fn parse(buf: &[u8]) -> Option<CustomContent> {
        let text = std::str::from_utf8(buf).ok()?;
        let mut mime = None;
        let mut max_buffer_size = None;
        for line in text.split("\r\n") {
            if let Some(value) = line.strip_prefix("Mime: ") {
                mime = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("MaxBufferSize: ") {
                max_buffer_size = value.trim().parse::<u32>().ok();
            }
        }
        match (mime, max_buffer_size) {
            (Some(mime), Some(size)) if size > 0 => Some(CustomContent { mime, max_buffer_size: size }),
            _ => None,
        }
    }
}

// -------------------------------------------------------------------- HttpGet

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpGet {
    pub path: String,
    pub host: String,
    pub port: u16,
}

impl HttpGet {
    pub fn prepare(path: &str, host: &str, port: u16, agent_name: &str, agent_version: &str) -> Vec<u8> {
        format!(
            "GET {path} HTTP/1.0{CRLF}HOST: {host}:{port}{CRLF}User-Agent: {agent_name} v{agent_version}{CRLF}Connection: keep-alive{CRLF}{CRLF}"
        )
        .into_bytes()
    }

    /// `is_http_get` mirrors the spec's boolean: `true` only if the buffer
    /// begins with the four bytes `"GET "`, in which case `path`/`host`/
    /// `port` are also extracted.
    pub fn parse(buf: &[u8]) -> (bool, Option<HttpGet>) {
        if !buf.starts_with(b"GET ") {
            return (false, None);
        }
        let text = match std::str::from_utf8(buf) {
            Ok(t) => t,
            Err(_) => return (true, None),
        };
        let mut lines = text.split("\r\n");
        let request_line = match lines.next() {
            Some(l) => l,
            None => return (true, None),
        };
        let path = request_line
            .strip_prefix("GET ")
            .and_then(|rest| rest.split(' ').next())
            .map(|p| p.to_string());

        let mut host = None;
        let mut port = None;
        for line in lines {
            if let Some(value) = line.strip_prefix("HOST: ").or_else(|| line.strip_prefix("Host: ")) {
                if let Some((h, p)) = value.rsplit_once(':') {
                    host = Some(h.to_string());
                    port = p.parse::<u16>().ok();
                }
            }
        }
        match (path, host, port) {
            (Some(path), Some(host), Some(port)) => (true, Some(HttpGet { path, host, port })),
            _ => (true, None),
        }
    }
}

// --------------------------------------------------------------- Http200Ok

pub struct Http200Ok;

impl Http200Ok {
    /// The MJPEG-style preamble advertising the multipart boundary (spec §6):
    /// `boundary=".-_."<version>"-"<name>"-"<version>".-_."`.
    pub fn prepare(name: &str, version: &str) -> Vec<u8> {
        let boundary = Self::boundary(name, version);
        format!(
            "HTTP/1.0 200 OK{CRLF}Server: {name}/{version}{CRLF}Connection: close{CRLF}\
Content-Type: multipart/x-mixed-replace;boundary={boundary}{CRLF}{CRLF}"
        )
        .into_bytes()
    }

    pub fn boundary(name: &str, version: &str) -> String {
        format!(".-_.{version}-{name}-{version}.-_.")
    }

    pub fn parse(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        text.contains("200 OK")
    }
}

// --------------------------------------------------------- Http400BadRequest

pub struct Http400BadRequest;

impl Http400BadRequest {
    pub fn prepare(ip: &str, port: u16, path: &str) -> Vec<u8> {
        let body = format!(
            "<html><head><title>400 Bad Request</title></head>\
<body><h1>Bad Request</h1><p>{ip}:{port}{path}</p></body></html>"
        );
        format!(
            "HTTP/1.0 400 Bad Request{CRLF}Content-Type: text/html{CRLF}Content-Length: {len}{CRLF}{CRLF}{body}",
            len = body.len()
        )
        .into_bytes()
    }

    pub fn parse(buf: &[u8]) -> bool {
        String::from_utf8_lossy(buf).contains("400 Bad Request")
    }
}

// --------------------------------------------------------- Http404NotFound

pub struct Http404NotFound;

impl Http404NotFound {
    pub fn prepare(ip: &str, port: u16, path: &str, requested_path: &str) -> Vec<u8> {
        let body = format!(
            "<html><head><title>404 Not Found</title></head>\
<body><h1>Not Found</h1><p>{ip}:{port}{path} (requested: {requested_path})</p></body></html>"
        );
        format!(
            "HTTP/1.0 404 Not Found{CRLF}Content-Type: text/html{CRLF}Content-Length: {len}{CRLF}{CRLF}{body}",
            len = body.len()
        )
        .into_bytes()
    }

    pub fn parse(buf: &[u8]) -> bool {
        String::from_utf8_lossy(buf).contains("404 Not Found")
    }
}

// ------------------------------------------------------------------ HttpContent

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpContentHeader {
    pub mime: String,
    pub length: usize,
    /// Byte offset within the parsed buffer of the first body byte.
    pub body_start: usize,
}

pub struct HttpContent;

impl HttpContent {
    pub fn prepare(boundary: &str, mime: &str, length: usize) -> Vec<u8> {
        format!("{CRLF}--{boundary}{CRLF}Content-Type: {mime}{CRLF}Content-Length: {length}{CRLF}{CRLF}").into_bytes()
    }

    /// Returns `None` ("ignore") if the buffer does not start with a
    /// boundary marker once a leading CRLF (if present) is stripped.
    pub fn parse(buf: &[u8]) -> Option<HttpContentHeader> {
        let (region, leading_offset) = if buf.starts_with(b"\r\n") {
            (&buf[2..], 2)
        } else {
            (buf, 0)
        };
        if !region.starts_with(b"--") {
            return None;
        }

        let terminator_end = find_header_terminator(region)?;
        let header_text = std::str::from_utf8(&region[..terminator_end]).ok()?;

        let mut mime = None;
        let mut length = None;
        for line in header_text.split(|c| c == '\n') {
            let line = line.trim_end_matches('\r');
            if let Some(value) = line.strip_prefix("Content-Type: ") {
                mime = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("Content-Length: ") {
                length = value.trim().parse::<usize>().ok();
            }
        }

        let mime = mime?;
        let length = length?;
        Some(HttpContentHeader {
            mime,
            length,
            body_start: leading_offset + terminator_end,
        })
    }
}

/// Find the end of the header block: a `'\n'` followed by either `"\r\n"`
/// or `"\n"` (spec §4.A tolerates both line-ending conventions). Returns
/// the index one past the terminator.
fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = memchr::memchr(b'\n', &buf[search_from..]) {
        let idx = search_from + rel;
        if buf[idx..].starts_with(b"\n\r\n") {
            return Some(idx + 3);
        }
        if buf[idx..].starts_with(b"\n\n") {
            return Some(idx + 2);
        }
        search_from = idx + 1;
    }
    None
}

pub fn parse_error_from_missing(what: &'static str) -> LinkError {
    LinkError::MalformedFrame(what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_header_round_trip() {
        assert!(CustomHeader::parse(&CustomHeader::prepare()));
    }

    #[test]
    fn custom_content_round_trip() {
        let wire = CustomContent::prepare("image/jpeg", 4096);
        let parsed = CustomContent::parse(&wire).unwrap();
        assert_eq!(parsed.mime, "image/jpeg");
        assert_eq!(parsed.max_buffer_size, 4096);
    }

    #[test]
    fn custom_content_zero_max_buffer_size_is_rejected() {
        let wire = b"Mime: x\r\nMaxBufferSize: 0\r\n\r\n";
        assert!(CustomContent::parse(wire).is_none());
    }

    #[test]
    fn http_get_round_trip() {
        let wire = HttpGet::prepare("/stream", "127.0.0.1", 8080, "x", "1");
        let (is_get, parsed) = HttpGet::parse(&wire);
        assert!(is_get);
        let parsed = parsed.unwrap();
        assert_eq!(parsed.path, "/stream");
        assert_eq!(parsed.host, "127.0.0.1");
        assert_eq!(parsed.port, 8080);
    }

    #[test]
    fn non_get_buffer_is_not_http_get() {
        let (is_get, parsed) = HttpGet::parse(b"POST / HTTP/1.0\r\n\r\n");
        assert!(!is_get);
        assert!(parsed.is_none());
    }

    #[test]
    fn http_200_ok_contains_boundary_marker() {
        let wire = Http200Ok::prepare("relaycast", "1");
        assert!(Http200Ok::parse(&wire));
        let text = String::from_utf8(wire).unwrap();
        assert!(text.contains("boundary=.-_."));
    }

    #[test]
    fn http_404_body_contains_both_paths() {
        let wire = Http404NotFound::prepare("127.0.0.1", 8080, "/stream", "/other");
        assert!(Http404NotFound::parse(&wire));
        let text = String::from_utf8(wire).unwrap();
        assert!(text.contains("/other"));
        assert!(text.contains("/stream"));
    }

    #[test]
    fn http_content_round_trip() {
        let header = HttpContent::prepare("BOUND", "image/jpeg", 4);
        let mut full = header.clone();
        full.extend_from_slice(b"\xDE\xAD\xBE\xEF");
        let parsed = HttpContent::parse(&full).unwrap();
        assert_eq!(parsed.mime, "image/jpeg");
        assert_eq!(parsed.length, 4);
        assert_eq!(&full[parsed.body_start..], b"\xDE\xAD\xBE\xEF");
    }

    #[test]
    fn http_content_without_boundary_is_ignored() {
        assert!(HttpContent::parse(b"not a boundary at all").is_none());
    }
}
