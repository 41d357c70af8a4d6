//! CLI surface and process-wide configuration.

use crate::logger::Logger;
use clap::Parser;
use std::path::PathBuf;

/// `origin_web [PORT] [HOST] [MAX_THREADS]`, defaults `8080`/`127.0.0.1`/`10`.
/// `--help`/`--version` come for free from `clap`'s derive API.
#[derive(Parser, Debug)]
#[command(name = "origin_web", about = "A didactic HTTP/1.1 origin server")]
pub struct Args {
    /// TCP port to listen on.
    #[arg(default_value_t = 8080)]
    pub port: u16,

    /// Address to bind to, and the value checked against the Host header
    /// allow-list.
    #[arg(default_value = "127.0.0.1")]
    pub host: String,

    /// Size of the fixed worker pool; also the connection queue's capacity.
    #[arg(default_value_t = 10)]
    pub max_threads: usize,
}

/// Process-wide, immutable once built and freely shared with every worker.
pub struct Config {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) max_threads: usize,
    pub(crate) content_root: PathBuf,
    pub(crate) uploads_dir: PathBuf,
}

impl Config {
    /// Builds `Config` from parsed CLI arguments, canonicalizing the content
    /// root. `resources/` is created if missing rather than treated as a
    /// startup failure — no content yet is not fatal, GET just reports 404
    /// uniformly until something is placed there — logging that once at
    /// `MAIN`.
    pub fn from_args(args: Args, logger: &Logger) -> std::io::Result<Self> {
        let content_root = resolve_content_root(&PathBuf::from("resources"), logger)?;
        let uploads_dir = content_root.join("uploads");

        Ok(Config {
            host: args.host,
            port: args.port,
            max_threads: args.max_threads,
            content_root,
            uploads_dir,
        })
    }
}

fn resolve_content_root(raw_root: &std::path::Path, logger: &Logger) -> std::io::Result<PathBuf> {
    if !raw_root.exists() {
        std::fs::create_dir_all(raw_root)?;
        logger.log(
            "MAIN",
            &format!("content root {} did not exist, created it", raw_root.display()),
        );
    }
    std::fs::canonicalize(raw_root)
}
