//! Canonical timestamp handling.
//!
//! Timestamps take part in todo hashing, so their text form must never
//! drift between processes. Everything is UTC with millisecond precision.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};

/// Current time truncated to whole milliseconds.
///
/// Document stores persist milliseconds; truncating up front keeps the
/// in-process value identical to what a later read returns.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}

/// RFC 3339 with millisecond precision and a `Z` suffix,
/// e.g. `2024-01-01T00:00:00.000Z`.
pub fn canonical(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
