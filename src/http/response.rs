//! The response framer: assembles a [`Response`] into the exact wire bytes
//! the server sends.

use crate::http::types::{StatusCode, Version};

/// A response being built by a handler, before the connection worker decides
/// on keep-alive and stamps in the framing headers (`Date`, `Server`,
/// `Content-Length`, `Connection`, `Keep-Alive`).
///
/// Handlers only ever set status, an optional `Content-Type`, and whatever
/// extra headers their resource needs (e.g. `Content-Disposition`); the
/// framing headers are added once, in a fixed order, by [`frame`].
#[derive(Debug, Clone)]
pub(crate) struct Response {
    pub(crate) status: StatusCode,
    pub(crate) content_type: Option<&'static str>,
    pub(crate) extra_headers: Vec<(&'static str, String)>,
    pub(crate) body: Vec<u8>,
}

impl Response {
    pub(crate) fn new(status: StatusCode) -> Self {
        Response {
            status,
            content_type: None,
            extra_headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub(crate) fn content_type(mut self, value: &'static str) -> Self {
        self.content_type = Some(value);
        self
    }

    pub(crate) fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.extra_headers.push((name, value.into()));
        self
    }

    pub(crate) fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

/// Renders `resp` as complete wire bytes: status line, then `Date`, `Server`,
/// `Content-Type`, `Content-Length`, `Connection`, `Keep-Alive` (when
/// applicable) in that fixed order, then the handler's own extra headers,
/// then a blank line and the body.
pub(crate) fn frame(resp: &Response, version: Version, keep_alive: bool) -> Vec<u8> {
    let mut out = format!(
        "{} {} {}\r\nDate: {}\r\nServer: origin_web\r\n",
        std::str::from_utf8(version.as_bytes()).unwrap(),
        resp.status.code(),
        resp.status.reason(),
        crate::date::imf_fixdate_now(),
    );

    if let Some(content_type) = resp.content_type {
        out.push_str("Content-Type: ");
        out.push_str(content_type);
        out.push_str("\r\n");
    }

    out.push_str(&format!("Content-Length: {}\r\n", resp.body.len()));
    out.push_str(if keep_alive {
        "Connection: keep-alive\r\n"
    } else {
        "Connection: close\r\n"
    });
    if keep_alive {
        out.push_str("Keep-Alive: timeout=30, max=100\r\n");
    }

    for (name, value) in &resp.extra_headers {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(&resp.body);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_orders_headers_and_reports_exact_content_length() {
        let resp = Response::new(StatusCode::Ok)
            .content_type("text/html; charset=utf-8")
            .body(b"<html></html>".to_vec());
        let bytes = frame(&resp, Version::Http11, true);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        let date_pos = text.find("Date:").unwrap();
        let server_pos = text.find("Server:").unwrap();
        let ct_pos = text.find("Content-Type:").unwrap();
        let cl_pos = text.find("Content-Length: 13\r\n").unwrap();
        let conn_pos = text.find("Connection: keep-alive\r\n").unwrap();
        let ka_pos = text.find("Keep-Alive: timeout=30, max=100\r\n").unwrap();
        assert!(date_pos < server_pos);
        assert!(server_pos < ct_pos);
        assert!(ct_pos < cl_pos);
        assert!(cl_pos < conn_pos);
        assert!(conn_pos < ka_pos);
        assert!(text.ends_with("<html></html>"));
    }

    #[test]
    fn frame_omits_keep_alive_header_when_closing() {
        let resp = Response::new(StatusCode::NotFound).body(Vec::new());
        let bytes = frame(&resp, Version::Http11, false);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Connection: close\r\n"));
        assert!(!text.contains("Keep-Alive:"));
        assert!(text.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn extra_headers_appear_after_framing_headers() {
        let resp = Response::new(StatusCode::Ok)
            .content_type("application/octet-stream")
            .header("Content-Disposition", "attachment; filename=\"a.txt\"")
            .body(b"hi".to_vec());
        let bytes = frame(&resp, Version::Http11, true);
        let text = String::from_utf8(bytes).unwrap();
        let ka_pos = text.find("Keep-Alive:").unwrap();
        let disp_pos = text.find("Content-Disposition:").unwrap();
        assert!(ka_pos < disp_pos);
    }
}
