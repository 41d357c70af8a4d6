//! The accept/dispatch loop and fixed worker pool: a `crossbeam::SegQueue`
//! hands accepted connections from the single accept loop to a fixed set of
//! `tokio::spawn` workers, with a second queue + dedicated task for the
//! overflow case instead of blocking the accept loop on a slow write.

use crate::config::Config;
use crate::errors::ErrorKind;
use crate::http::response::frame;
use crate::http::types::Version;
use crate::logger::Logger;
use crate::server::connection;
use crossbeam::queue::SegQueue;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

/// Minimum listen backlog the listening socket is bound with.
const MIN_BACKLOG: i32 = 50;
/// How long a worker waits before re-polling an empty queue.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

type Accepted = (TcpStream, SocketAddr);
type Queue = Arc<SegQueue<Accepted>>;

/// The process-wide state a freshly-bound server needs: the resolved
/// [`Config`] and the single-writer [`Logger`] every worker submits lines to.
pub struct Shared {
    config: Config,
    logger: Logger,
}

impl Shared {
    pub fn new(config: Config, logger: Logger) -> Self {
        Shared { config, logger }
    }
}

/// Binds the listening socket, then runs the accept/dispatch loop and fixed
/// worker pool until an interrupt signal is observed.
pub async fn run(shared: Arc<Shared>) -> std::io::Result<()> {
    let listener = bind_listener(&shared.config)?;
    let capacity = shared.config.max_threads;

    let queue: Queue = Arc::new(SegQueue::new());
    let overflow: Queue = Arc::new(SegQueue::new());
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut workers = Vec::with_capacity(capacity);
    for id in 1..=capacity {
        workers.push(tokio::spawn(worker_loop(
            id,
            queue.clone(),
            shared.clone(),
            shutdown.clone(),
        )));
    }
    let overflow_worker = tokio::spawn(overflow_loop(overflow.clone(), shutdown.clone()));

    shared.logger.log(
        "MAIN",
        &format!(
            "listening on {}:{} with {} workers",
            shared.config.host, shared.config.port, capacity
        ),
    );

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                shutdown.store(true, Ordering::SeqCst);
                shared.logger.log("MAIN", "SIGINT received, draining workers");
                break;
            }
            _ = terminate_signal() => {
                shutdown.store(true, Ordering::SeqCst);
                shared.logger.log("MAIN", "SIGTERM received, draining workers");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        // Bounded queue of capacity == pool size: no worker
                        // is ever handed more than its fair share.
                        if queue.len() < capacity {
                            queue.push((stream, addr));
                        } else {
                            overflow.push((stream, addr));
                        }
                    }
                    Err(e) => shared.logger.log("MAIN", &format!("accept error: {e}")),
                }
            }
        }
    }

    drop(listener);
    for worker in workers {
        let _ = worker.await;
    }
    overflow_worker.abort();
    Ok(())
}

/// Resolves when the process receives `SIGTERM` — the standard
/// container-stop signal. Unix only; on other platforms this future never
/// resolves, leaving `Ctrl-C` (SIGINT) as the sole shutdown trigger.
#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(_) => std::future::pending::<()>().await,
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await
}

async fn worker_loop(id: usize, queue: Queue, shared: Arc<Shared>, shutdown: Arc<AtomicBool>) {
    let tag = format!("Thread-{id}");
    loop {
        match queue.pop() {
            Some((mut stream, _addr)) => {
                connection::handle(&mut stream, &shared.config, &shared.logger, &tag, &shutdown)
                    .await;
            }
            None => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// Drains the overflow queue: synthesizes a 503 directly on each accepted
/// socket (`Retry-After: 5`, `Connection: close`) and closes it.
async fn overflow_loop(queue: Queue, shutdown: Arc<AtomicBool>) {
    loop {
        match queue.pop() {
            Some((mut stream, _addr)) => {
                let bytes = frame(&ErrorKind::Overloaded.to_response(), Version::Http11, false);
                let _ = tokio::time::timeout(Duration::from_secs(5), stream.write_all(&bytes)).await;
                let _ = stream.shutdown().await;
            }
            None => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// Binds with `SO_REUSEADDR` and an explicit backlog, reaching for
/// `socket2` rather than the std library's bare `bind`.
fn bind_listener(config: &Config) -> std::io::Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid bind address")
        })?;

    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(MIN_BACKLOG)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
