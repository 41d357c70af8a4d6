//! Core HTTP protocol types shared by the wire codec, security gate, and handlers.

use crate::errors::ErrorKind;

/// HTTP request methods this server recognizes at the wire level.
///
/// Only `GET` and `POST` are ever dispatched to a handler; every other valid
/// HTTP token parses successfully but is gated out with `405` before any
/// handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    /// Any other syntactically valid method token (`PUT`, `DELETE`, ...).
    Other,
}

impl Method {
    #[inline]
    pub(crate) fn from_bytes(src: &[u8]) -> Result<Self, ErrorKind> {
        if src.is_empty() || !src.iter().all(|b| b.is_ascii_alphabetic() || *b == b'-') {
            return Err(ErrorKind::MalformedRequest);
        }

        Ok(match src {
            b"GET" => Method::Get,
            b"POST" => Method::Post,
            _ => Method::Other,
        })
    }
}

/// HTTP protocol version. HTTP/0.9 is never produced by the parser: only
/// `HTTP/1.0` and `HTTP/1.1` request lines parse successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    #[inline]
    pub(crate) fn from_bytes(src: &[u8]) -> Result<Self, ErrorKind> {
        match src {
            b"HTTP/1.1" => Ok(Version::Http11),
            b"HTTP/1.0" => Ok(Version::Http10),
            _ => Err(ErrorKind::MalformedRequest),
        }
    }

    #[inline]
    pub(crate) const fn as_bytes(self) -> &'static [u8] {
        match self {
            Version::Http11 => b"HTTP/1.1",
            Version::Http10 => b"HTTP/1.0",
        }
    }
}

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        /// HTTP status codes used anywhere in this server: 200, 201, 400,
        /// 403, 404, 405, 415, 500, 503.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name,
        )+ }

        impl StatusCode {
            #[inline]
            pub(crate) const fn code(self) -> u16 {
                match self { $( StatusCode::$name => $num, )+ }
            }

            #[inline]
            pub(crate) const fn reason(self) -> &'static str {
                match self { $( StatusCode::$name => $str, )+ }
            }
        }
    }
}

set_status_codes! {
    /// Successful GET/upload response.
    Ok = (200, "OK");
    /// Successful upload persisted.
    Created = (201, "Created");
    /// Malformed request line/headers, bad Content-Length, chunked encoding.
    BadRequest = (400, "Bad Request");
    /// Host not allow-listed, or path escapes the content root.
    Forbidden = (403, "Forbidden");
    /// File missing, or POST target isn't `/upload`.
    NotFound = (404, "Not Found");
    /// Method outside {GET, POST}.
    MethodNotAllowed = (405, "Method Not Allowed");
    /// Unknown file extension, or POST without `application/json`.
    UnsupportedMediaType = (415, "Unsupported Media Type");
    /// Filesystem error, JSON write failure, filename collision exhaustion.
    InternalServerError = (500, "Internal Server Error");
    /// Connection queue full at accept time.
    ServiceUnavailable = (503, "Service Unavailable");
}
