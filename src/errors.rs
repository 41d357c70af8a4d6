//! The single path from "something went wrong" to an HTTP response.
//!
//! Every rejection in the server — a malformed request line, a path escaping
//! the content root, a full connection queue — is expressed as an
//! [`ErrorKind`] and turned into a response by [`ErrorKind::to_response`].
//! Nothing downstream of the security gate or a handler ever writes a status
//! line by hand.

use crate::http::response::Response;
use crate::http::types::StatusCode;
use std::{error, fmt, io};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Parse failure, missing Host on HTTP/1.1, bad Content-Length, chunked
    /// Transfer-Encoding, header block over 8192 bytes.
    MalformedRequest,
    /// Host not in the allow-list, or the canonical path escapes the root.
    Forbidden,
    /// Requested file does not exist, or a POST target other than `/upload`.
    NotFound,
    /// Method outside {GET, POST}.
    MethodNotAllowed,
    /// Unknown file extension, or POST body without `application/json`.
    UnsupportedMediaType,
    /// Filesystem error, JSON write failure, upload filename exhaustion.
    Internal,
    /// Connection queue full at accept time.
    Overloaded,
}

impl ErrorKind {
    /// The HTTP status this error maps to.
    pub(crate) const fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest => StatusCode::BadRequest,
            Self::Forbidden => StatusCode::Forbidden,
            Self::NotFound => StatusCode::NotFound,
            Self::MethodNotAllowed => StatusCode::MethodNotAllowed,
            Self::UnsupportedMediaType => StatusCode::UnsupportedMediaType,
            Self::Internal => StatusCode::InternalServerError,
            Self::Overloaded => StatusCode::ServiceUnavailable,
        }
    }

    fn body(&self) -> &'static str {
        match self {
            Self::MalformedRequest => r#"{"error":"Malformed request","code":"MALFORMED_REQUEST"}"#,
            Self::Forbidden => r#"{"error":"Forbidden","code":"FORBIDDEN"}"#,
            Self::NotFound => r#"{"error":"Not found","code":"NOT_FOUND"}"#,
            Self::MethodNotAllowed => {
                r#"{"error":"Method not allowed","code":"METHOD_NOT_ALLOWED"}"#
            }
            Self::UnsupportedMediaType => {
                r#"{"error":"Unsupported media type","code":"UNSUPPORTED_MEDIA_TYPE"}"#
            }
            Self::Internal => r#"{"error":"Internal server error","code":"INTERNAL_ERROR"}"#,
            Self::Overloaded => {
                r#"{"error":"Service temporarily unavailable","code":"OVERLOADED"}"#
            }
        }
    }

    /// Headers beyond the standard framing set that this specific error
    /// requires: `Allow` on 405, `Retry-After` on 503.
    fn extra_headers(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::MethodNotAllowed => &[("Allow", "GET, POST")],
            Self::Overloaded => &[("Retry-After", "5")],
            _ => &[],
        }
    }

    /// Renders this error as a [`Response`], carrying the same framing
    /// headers a success does and a short JSON body. Whether the connection
    /// actually closes afterwards is still the worker's call (404 is exempt
    /// from the force-close rule that every other error status triggers),
    /// so this does not decide `Connection` itself — the caller frames it
    /// like any other response.
    pub(crate) fn to_response(&self) -> Response {
        let mut resp = Response::new(self.status())
            .content_type("application/json")
            .body(self.body().as_bytes().to_vec());
        for (name, value) in self.extra_headers() {
            resp = resp.header(name, *value);
        }
        resp
    }
}

impl error::Error for ErrorKind {}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<io::Error> for ErrorKind {
    fn from(_: io::Error) -> Self {
        // Never leak filesystem details into a client-visible error; the
        // originating io::Error is logged by the caller before this
        // conversion happens.
        ErrorKind::Internal
    }
}
