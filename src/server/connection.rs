//! The per-connection worker loop: drives one accepted socket through
//! request/response cycles under the keep-alive state machine.

use crate::config::Config;
use crate::errors::ErrorKind;
use crate::handlers;
use crate::http::request::{read_request, ReadOutcome, Request};
use crate::http::response::{frame, Response};
use crate::http::types::{StatusCode, Version};
use crate::logger::Logger;
use crate::security::{self, Dispatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REQUESTS_PER_CONNECTION: usize = 100;

/// Runs the full lifecycle of one accepted connection: ACTIVE (read) →
/// WRITING (respond) → ACTIVE or CLOSING, looping until the state machine
/// lands on CLOSING. `shutdown` is polled after each completed request: once
/// it's set, the worker finishes the in-flight request (this one), sends its
/// response, and then closes instead of waiting for another request on the
/// same socket.
pub(crate) async fn handle(
    stream: &mut TcpStream,
    config: &Config,
    logger: &Logger,
    tag: &str,
    shutdown: &Arc<AtomicBool>,
) {
    let mut served: usize = 0;

    loop {
        let outcome = match read_request(stream, IDLE_TIMEOUT).await {
            Ok(outcome) => outcome,
            Err(_) => break,
        };

        let request = match outcome {
            ReadOutcome::Closed => break,
            ReadOutcome::Error(err) => {
                let bytes = frame(&err.to_response(), Version::Http11, false);
                let _ = write_with_timeout(stream, &bytes).await;
                break;
            }
            ReadOutcome::Request(req) => req,
        };

        let version = request.version();
        let response = dispatch(&request, config, logger, tag).await;

        served += 1;
        let mut keep_alive = decide_keep_alive(&request, &response);
        if served >= MAX_REQUESTS_PER_CONNECTION || shutdown.load(Ordering::SeqCst) {
            keep_alive = false;
        }

        let bytes = frame(&response, version, keep_alive);
        if write_with_timeout(stream, &bytes).await.is_err() {
            break;
        }

        if !keep_alive {
            break;
        }
    }

    let _ = stream.shutdown().await;
}

async fn dispatch(request: &Request, config: &Config, logger: &Logger, tag: &str) -> Response {
    let decision = match security::evaluate(request, config) {
        Ok(decision) => decision,
        Err(err) => return err.to_response(),
    };

    let result = match decision {
        Dispatch::File(path) => handlers::file::serve(&path, logger, tag).await,
        Dispatch::Upload => {
            handlers::upload::persist(request.body(), &config.uploads_dir, logger, tag).await
        }
    };

    result.unwrap_or_else(|err: ErrorKind| err.to_response())
}

/// Any status ≥ 400 other than 404 forces CLOSING.
fn status_forces_close(status: StatusCode) -> bool {
    let code = status.code();
    code >= 400 && code != 404
}

/// HTTP/1.0 requires an explicit `Connection: keep-alive` opt-in; HTTP/1.1
/// requires an explicit `Connection: close` opt-out; this runs only once the
/// forced-close check above didn't already decide. The per-connection
/// request cap is applied by the caller after incrementing `served`.
fn decide_keep_alive(request: &Request, response: &Response) -> bool {
    if status_forces_close(response.status) {
        return false;
    }
    match request.version() {
        Version::Http10 => request.has_connection_token("keep-alive"),
        Version::Http11 => !request.has_connection_token("close"),
    }
}

async fn write_with_timeout(stream: &mut TcpStream, bytes: &[u8]) -> std::io::Result<()> {
    match timeout(IDLE_TIMEOUT, stream.write_all(bytes)).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "write timed out",
        )),
    }
}
