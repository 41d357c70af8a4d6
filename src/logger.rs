//! The tagged line logger: a single writer owns stdout, every other
//! component submits already-formatted lines, and submissions are mutually
//! exclusive so that lines never interleave.

use std::io::Write;
use std::sync::Mutex;

pub struct Logger {
    out: Mutex<std::io::Stdout>,
}

impl Logger {
    pub fn new() -> Self {
        Logger {
            out: Mutex::new(std::io::stdout()),
        }
    }

    /// Writes `[<ISO8601 local time>] [<tag>] <message>` to stdout.
    /// Best-effort: a write failure is swallowed, never propagated. `tag` is
    /// `MAIN` for the dispatcher, `Thread-<n>` for workers.
    pub(crate) fn log(&self, tag: &str, message: &str) {
        let line = format!(
            "[{}] [{}] {}\n",
            crate::date::local_timestamp_now(),
            tag,
            message
        );
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(line.as_bytes());
        }
    }
}
