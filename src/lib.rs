//! origin_web — a self-contained HTTP/1.1 origin server built directly on
//! stream sockets.
//!
//! It serves a small, fixed set of resource types from a rooted content
//! directory (`.html` pages, `.txt`/`.png`/`.jpg`/`.jpeg` binaries) and
//! accepts JSON uploads that it persists as timestamped files. It is a
//! didactic, correctness-oriented implementation of the wire protocol, the
//! keep-alive connection lifecycle, and request dispatch — not a
//! feature-complete web server. TLS, HTTP/2, compression, caching headers,
//! virtual hosts, and ranged requests are explicit non-goals.
//!
//! The binary entry point (`src/main.rs`) parses the three positional CLI
//! arguments, resolves [`config::Config`], and drives [`server::dispatch::run`]
//! until an interrupt signal is observed.

pub mod config;
pub(crate) mod date;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod http;
pub mod logger;
pub(crate) mod security;
pub mod server;
