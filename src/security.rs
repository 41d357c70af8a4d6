//! The security gate: pure, ordered predicates applied to every parsed
//! request before any handler runs. On success it names which handler
//! dispatches and with what already-validated input; on failure it returns
//! the single [`ErrorKind`] that explains the rejection.

use crate::config::Config;
use crate::errors::ErrorKind;
use crate::http::request::{Request, BODY_CAP};
use crate::http::types::{Method, Version};
use std::path::PathBuf;

/// What the gate decided should handle this request.
pub(crate) enum Dispatch {
    /// GET of a canonical path already verified to lie within the content
    /// root.
    File(PathBuf),
    /// POST `/upload`, already passed the content-type and size gates.
    Upload,
}

/// Runs the ordered predicates and returns either the handler to dispatch
/// to, or the error response to send instead.
pub(crate) fn evaluate(request: &Request, config: &Config) -> Result<Dispatch, ErrorKind> {
    check_host(request, config)?;

    match request.method() {
        Method::Get => {
            let path = canonical_path(request.target(), &config.content_root)?;
            Ok(Dispatch::File(path))
        }
        Method::Post => {
            let normalized = normalize_target(request.target())?;
            check_content_type(request)?;
            check_body_size(request)?;
            if normalized != PathBuf::from("upload") {
                return Err(ErrorKind::NotFound);
            }
            Ok(Dispatch::Upload)
        }
        Method::Other => Err(ErrorKind::MethodNotAllowed),
    }
}

/// Host allow-list: the bind host, `localhost`, and `127.0.0.1`, each
/// optionally suffixed with `:<listening port>`. `localhost` is accepted
/// regardless of the actual bind address — a deliberate quirk, not a bug.
fn check_host(request: &Request, config: &Config) -> Result<(), ErrorKind> {
    if request.version() != Version::Http11 {
        return Ok(());
    }
    // The wire codec already rejects a request with no Host header on
    // HTTP/1.1 as malformed (400) before a Request value ever exists.
    let host_header = request.header("host").ok_or(ErrorKind::MalformedRequest)?;
    let mut parts = host_header.trim().splitn(2, ':');
    let bare = parts.next().unwrap_or("");
    if let Some(port) = parts.next() {
        if port != config.port.to_string() {
            return Err(ErrorKind::Forbidden);
        }
    }
    if bare == config.host || bare == "localhost" || bare == "127.0.0.1" {
        Ok(())
    } else {
        Err(ErrorKind::Forbidden)
    }
}

/// URL-decodes `target`, strips the query string, rejects absolute/
/// scheme-prefixed targets and null bytes, and normalizes `.`/`..` segments,
/// rejecting anything that would escape the root. This predicate applies to
/// every request, GET or POST alike — unlike the content-type gate, it is
/// not POST-only. Returns the normalized path *relative* to the content
/// root; empty for `/` or an empty target.
fn normalize_target(target: &str) -> Result<PathBuf, ErrorKind> {
    let path_part = target.split('?').next().unwrap_or("");
    if path_part.contains("://") || path_part.starts_with("//") {
        return Err(ErrorKind::Forbidden);
    }

    let decoded = percent_decode(path_part.as_bytes())?;
    if decoded.contains(&0u8) {
        return Err(ErrorKind::Forbidden);
    }
    let decoded_str =
        simdutf8::basic::from_utf8(&decoded).map_err(|_| ErrorKind::Forbidden)?;

    let trimmed = decoded_str.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if !normalized.pop() {
                    return Err(ErrorKind::Forbidden);
                }
            }
            seg => normalized.push(seg),
        }
    }

    Ok(normalized)
}

/// GET's file lookup: [`normalize_target`] plus the `/` → `index.html`
/// default and the root join.
fn canonical_path(target: &str, root: &std::path::Path) -> Result<PathBuf, ErrorKind> {
    let normalized = normalize_target(target)?;
    let relative = if normalized.as_os_str().is_empty() {
        PathBuf::from("index.html")
    } else {
        normalized
    };
    Ok(root.join(relative))
}

fn percent_decode(input: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' {
            let hex = input.get(i + 1..i + 3).ok_or(ErrorKind::Forbidden)?;
            let hex_str = std::str::from_utf8(hex).map_err(|_| ErrorKind::Forbidden)?;
            let byte = u8::from_str_radix(hex_str, 16).map_err(|_| ErrorKind::Forbidden)?;
            out.push(byte);
            i += 3;
        } else {
            out.push(input[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// POST content-type gate: the media type, ignoring any `;` parameters,
/// must be `application/json`.
fn check_content_type(request: &Request) -> Result<(), ErrorKind> {
    let content_type = request
        .header("content-type")
        .ok_or(ErrorKind::UnsupportedMediaType)?;
    let media = content_type.split(';').next().unwrap_or("").trim();
    if media.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(ErrorKind::UnsupportedMediaType)
    }
}

/// Body size cap. The wire codec already enforces this while reading; this
/// re-check keeps the gate's contract self-contained.
fn check_body_size(request: &Request) -> Result<(), ErrorKind> {
    if request.body().len() > BODY_CAP {
        Err(ErrorKind::MalformedRequest)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn root() -> PathBuf {
        PathBuf::from("/content/root")
    }

    #[test]
    fn empty_and_slash_map_to_index_html() {
        assert_eq!(
            canonical_path("/", &root()).unwrap(),
            root().join("index.html")
        );
        assert_eq!(
            canonical_path("", &root()).unwrap(),
            root().join("index.html")
        );
    }

    #[test]
    fn rejects_dot_dot_escape() {
        assert!(canonical_path("/../etc/passwd", &root()).is_err());
        assert!(canonical_path("/a/../../b", &root()).is_err());
    }

    #[test]
    fn allows_dot_dot_that_stays_inside_root() {
        let path = canonical_path("/a/../sample.txt", &root()).unwrap();
        assert_eq!(path, root().join("sample.txt"));
    }

    #[test]
    fn rejects_absolute_and_scheme_targets() {
        assert!(canonical_path("//evil.com/x", &root()).is_err());
        assert!(canonical_path("http://evil.com/x", &root()).is_err());
    }

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_threads: 10,
            content_root: root(),
            uploads_dir: root().join("uploads"),
        }
    }

    #[test]
    fn host_allow_list_accepts_bind_host_localhost_and_loopback() {
        let config = test_config();
        for host in ["127.0.0.1", "127.0.0.1:8080", "localhost", "localhost:8080"] {
            let req = Request::test_new(
                Method::Get,
                "/",
                Version::Http11,
                &[("host", host)],
                b"",
            );
            assert!(evaluate(&req, &config).is_ok(), "{host} should be allowed");
        }
    }

    #[test]
    fn host_allow_list_rejects_unknown_host() {
        let config = test_config();
        let req = Request::test_new(
            Method::Get,
            "/",
            Version::Http11,
            &[("host", "evil.com")],
            b"",
        );
        assert_eq!(evaluate(&req, &config).unwrap_err(), ErrorKind::Forbidden);
    }

    #[test]
    fn host_allow_list_rejects_mismatched_port() {
        let config = test_config();
        let req = Request::test_new(
            Method::Get,
            "/",
            Version::Http11,
            &[("host", "localhost:9999")],
            b"",
        );
        assert_eq!(evaluate(&req, &config).unwrap_err(), ErrorKind::Forbidden);
    }

    #[test]
    fn method_other_is_rejected_before_path_checks() {
        let config = test_config();
        let req = Request::test_new(
            Method::Other,
            "/../etc/passwd",
            Version::Http11,
            &[("host", "localhost")],
            b"",
        );
        assert_eq!(
            evaluate(&req, &config).unwrap_err(),
            ErrorKind::MethodNotAllowed
        );
    }

    #[test]
    fn post_to_non_upload_target_is_not_found() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "/other",
            Version::Http11,
            &[("host", "localhost"), ("content-type", "application/json")],
            b"{}",
        );
        assert_eq!(evaluate(&req, &config).unwrap_err(), ErrorKind::NotFound);
    }

    #[test]
    fn post_to_non_upload_target_with_bad_content_type_is_unsupported_media_type() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "/other",
            Version::Http11,
            &[("host", "localhost"), ("content-type", "text/plain")],
            b"not json",
        );
        assert_eq!(
            evaluate(&req, &config).unwrap_err(),
            ErrorKind::UnsupportedMediaType
        );
    }

    #[test]
    fn post_canonicalizes_target_before_comparing_to_upload() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "/a/../upload",
            Version::Http11,
            &[("host", "localhost"), ("content-type", "application/json")],
            b"{}",
        );
        assert!(matches!(evaluate(&req, &config), Ok(Dispatch::Upload)));
    }

    #[test]
    fn post_rejects_scheme_prefixed_target() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "http://evil.com/upload",
            Version::Http11,
            &[("host", "localhost"), ("content-type", "application/json")],
            b"{}",
        );
        assert_eq!(evaluate(&req, &config).unwrap_err(), ErrorKind::Forbidden);
    }

    #[test]
    fn post_rejects_double_slash_prefixed_target() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "//upload",
            Version::Http11,
            &[("host", "localhost"), ("content-type", "application/json")],
            b"{}",
        );
        assert_eq!(evaluate(&req, &config).unwrap_err(), ErrorKind::Forbidden);
    }

    #[test]
    fn post_rejects_null_byte_in_target() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "/upload%00",
            Version::Http11,
            &[("host", "localhost"), ("content-type", "application/json")],
            b"{}",
        );
        assert_eq!(evaluate(&req, &config).unwrap_err(), ErrorKind::Forbidden);
    }

    #[test]
    fn post_rejects_dot_dot_escape_above_root() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "/a/../../upload",
            Version::Http11,
            &[("host", "localhost"), ("content-type", "application/json")],
            b"{}",
        );
        assert_eq!(evaluate(&req, &config).unwrap_err(), ErrorKind::Forbidden);
    }

    #[test]
    fn post_upload_requires_json_content_type() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "/upload",
            Version::Http11,
            &[("host", "localhost"), ("content-type", "text/plain")],
            b"{}",
        );
        assert_eq!(
            evaluate(&req, &config).unwrap_err(),
            ErrorKind::UnsupportedMediaType
        );
    }

    #[test]
    fn post_upload_accepts_json_with_charset_parameter() {
        let config = test_config();
        let req = Request::test_new(
            Method::Post,
            "/upload",
            Version::Http11,
            &[
                ("host", "localhost"),
                ("content-type", "application/json; charset=utf-8"),
            ],
            b"{}",
        );
        assert!(matches!(evaluate(&req, &config), Ok(Dispatch::Upload)));
    }

    #[test]
    fn rejects_null_byte() {
        assert!(canonical_path("/foo%00bar", &root()).is_err());
    }

    #[test]
    fn decodes_percent_escapes() {
        let path = canonical_path("/hello%20world.txt", &root()).unwrap();
        assert_eq!(path, root().join("hello world.txt"));
    }

    #[test]
    fn query_string_is_stripped_before_decoding() {
        let path = canonical_path("/sample.txt?x=1", &root()).unwrap();
        assert_eq!(path, root().join("sample.txt"));
    }
}
