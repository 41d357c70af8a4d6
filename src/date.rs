//! Timestamp formatting for the `Date` response header and logger lines.
//!
//! The `Date` header must be an RFC 7231 IMF-fixdate in UTC; log lines use
//! the local zone. Both come from `chrono` — hand-rolling a calendar plus a
//! correct local-time-zone offset isn't worth doing by hand.

use chrono::{SecondsFormat, Utc};

/// The current instant formatted as an RFC 7231 IMF-fixdate, e.g.
/// `Sun, 06 Nov 1994 08:49:37 GMT`.
pub(crate) fn imf_fixdate_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// The current local instant formatted for a logger line, e.g.
/// `2026-07-28T14:03:11`.
pub(crate) fn local_timestamp_now() -> String {
    chrono::Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}
