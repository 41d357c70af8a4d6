//! The byte-level request parser: turns socket bytes into a [`Request`] or a
//! single [`ErrorKind`].
//!
//! Unlike the zero-copy parser this module is descended from, [`Request`]
//! owns its bytes outright. This server has exactly two concrete handlers and
//! a hard 8 KiB header / 1 MiB body ceiling, so there is no reused
//! per-connection buffer to borrow from across an `await` point — the
//! `unsafe` lifetime-extension trick that made sense for a generic,
//! arbitrary-handler library buys nothing here but risk.

use crate::errors::ErrorKind;
use crate::http::types::{Method, Version};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Header block cap: exactly 8192 succeeds, 8193 fails.
pub(crate) const HEADER_CAP: usize = 8192;
/// Body cap: exactly 1,048,576 succeeds, 1,048,577 fails.
pub(crate) const BODY_CAP: usize = 1_048_576;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) version: Version,
    headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Case-insensitive header lookup. When a header repeated on the wire,
    /// the returned value is already comma-joined.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `true` if the request carries `Connection: <token>` (case-insensitive
    /// token match against a possibly comma-joined duplicate header).
    pub(crate) fn has_connection_token(&self, token: &str) -> bool {
        self.header("connection")
            .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
            .unwrap_or(false)
    }
}

/// What a single read-and-parse attempt produced.
pub(crate) enum ReadOutcome {
    Request(Request),
    /// Peer closed, or the idle timeout fired, before a complete request
    /// arrived. The caller closes without writing a response.
    Closed,
    /// A complete header block (and body, if declared) was read, but it
    /// failed to parse. The caller writes the error response then closes.
    Error(ErrorKind),
}

/// Reads one request from `stream`, bounding the whole read (headers + body)
/// by `idle_timeout` — the same 30 s idle timeout that governs waiting for
/// the next request on a keep-alive connection.
pub(crate) async fn read_request(
    stream: &mut TcpStream,
    idle_timeout: Duration,
) -> std::io::Result<ReadOutcome> {
    match timeout(idle_timeout, read_request_inner(stream)).await {
        Ok(result) => result,
        Err(_) => Ok(ReadOutcome::Closed),
    }
}

async fn read_request_inner(stream: &mut TcpStream) -> std::io::Result<ReadOutcome> {
    let mut buf = Vec::with_capacity(1024);

    let header_end = loop {
        if let Some(pos) = memchr::memmem::find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > HEADER_CAP {
            return Ok(ReadOutcome::Error(ErrorKind::MalformedRequest));
        }
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(ReadOutcome::Closed);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    if header_end > HEADER_CAP {
        return Ok(ReadOutcome::Error(ErrorKind::MalformedRequest));
    }

    let (method, target, version, headers, content_length) = match parse_head(&buf[..header_end])
    {
        Ok(parts) => parts,
        Err(e) => return Ok(ReadOutcome::Error(e)),
    };

    let mut body = buf[header_end..].to_vec();
    if let Some(len) = content_length {
        while body.len() < len {
            let mut chunk = [0u8; 4096];
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(ReadOutcome::Closed);
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(len);
    } else {
        body.clear();
    }

    Ok(ReadOutcome::Request(Request {
        method,
        target,
        version,
        headers,
        body,
    }))
}

type Head = (Method, String, Version, Vec<(String, String)>, Option<usize>);

/// Parses the request line and header block (everything up to and including
/// the blank line) out of a complete byte slice.
fn parse_head(buf: &[u8]) -> Result<Head, ErrorKind> {
    let line_end = memchr::memchr(b'\n', buf).ok_or(ErrorKind::MalformedRequest)?;
    let line = strip_crlf(&buf[..line_end]);

    let first_space = memchr::memchr(b' ', line).ok_or(ErrorKind::MalformedRequest)?;
    let last_space = memchr::memrchr(b' ', line).ok_or(ErrorKind::MalformedRequest)?;
    if last_space <= first_space {
        return Err(ErrorKind::MalformedRequest);
    }

    let method = Method::from_bytes(&line[..first_space])?;
    let target_bytes = &line[first_space + 1..last_space];
    if target_bytes.is_empty() {
        return Err(ErrorKind::MalformedRequest);
    }
    let target = simdutf8::basic::from_utf8(target_bytes)
        .map_err(|_| ErrorKind::MalformedRequest)?
        .to_owned();
    let version = Version::from_bytes(&line[last_space + 1..])?;

    let mut headers = Vec::new();
    let mut pos = line_end + 1;
    let mut content_length: Option<usize> = None;
    let mut transfer_encoding_chunked = false;

    loop {
        let rel_nl = memchr::memchr(b'\n', &buf[pos..]).ok_or(ErrorKind::MalformedRequest)?;
        let raw_line = &buf[pos..pos + rel_nl];
        let line = strip_crlf(raw_line);
        pos += rel_nl + 1;

        if line.is_empty() {
            break;
        }

        let colon = memchr::memchr(b':', line).ok_or(ErrorKind::MalformedRequest)?;
        let name_bytes = &line[..colon];
        if name_bytes.is_empty() || !name_bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(ErrorKind::MalformedRequest);
        }
        let name =
            simdutf8::basic::from_utf8(name_bytes).map_err(|_| ErrorKind::MalformedRequest)?;
        let value_bytes = trim_ascii(&line[colon + 1..]);
        let value =
            simdutf8::basic::from_utf8(value_bytes).map_err(|_| ErrorKind::MalformedRequest)?;

        if name.eq_ignore_ascii_case("content-length") {
            let n: usize = value.parse().map_err(|_| ErrorKind::MalformedRequest)?;
            if n > BODY_CAP {
                return Err(ErrorKind::MalformedRequest);
            }
            content_length = Some(n);
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && value.to_ascii_lowercase().contains("chunked")
        {
            transfer_encoding_chunked = true;
        }

        push_header(&mut headers, name, value);
    }

    if transfer_encoding_chunked {
        return Err(ErrorKind::MalformedRequest);
    }

    if version == Version::Http11
        && !headers.iter().any(|(n, _)| n.eq_ignore_ascii_case("host"))
    {
        return Err(ErrorKind::MalformedRequest);
    }

    Ok((method, target, version, headers, content_length))
}

fn push_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if let Some(existing) = headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        existing.1.push_str(", ");
        existing.1.push_str(value);
    } else {
        headers.push((name.to_ascii_lowercase(), value.to_owned()));
    }
}

fn strip_crlf(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
impl Request {
    /// Test-only constructor bypassing the wire parser.
    pub(crate) fn test_new(
        method: Method,
        target: &str,
        version: Version,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Self {
        let mut map = Vec::new();
        for (name, value) in headers {
            push_header(&mut map, name, value);
        }
        Request {
            method,
            target: target.to_owned(),
            version,
            headers: map,
            body: body.to_vec(),
        }
    }
}
