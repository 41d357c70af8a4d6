//! Binary entry point: parse the CLI surface, resolve the process-wide
//! [`Config`](origin_web::config::Config), and drive the accept/dispatch
//! loop until an interrupt signal is observed.

use clap::Parser;
use origin_web::config::{Args, Config};
use origin_web::logger::Logger;
use origin_web::server::dispatch::{self, Shared};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let logger = Logger::new();

    let config = match Config::from_args(args, &logger) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("origin_web: failed to resolve content root: {err}");
            return ExitCode::from(2);
        }
    };

    let shared = Arc::new(Shared::new(config, logger));

    match dispatch::run(shared).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("origin_web: {err}");
            ExitCode::from(1)
        }
    }
}
