// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for clocks and time zone rendering.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Current Unix time with sub-second precision.
pub fn unix_now_f64() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Today's date in UTC.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Convert a Unix timestamp (seconds) to a UTC datetime.
pub fn from_unix(utc: f64) -> Option<DateTime<Utc>> {
    if !utc.is_finite() {
        return None;
    }
    let secs = utc.floor();
    let nanos = ((utc - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

/// Render a Unix timestamp in the given IANA zone, e.g. `2024-03-01T07:30:00-08:00`.
///
/// Returns `None` when the zone is unknown or the timestamp is out of range.
pub fn format_local_rfc3339(utc: f64, tz: &str) -> Option<String> {
    let zone: Tz = tz.parse().ok()?;
    let instant = from_unix(utc)?;
    Some(
        zone.from_utc_datetime(&instant.naive_utc())
            .to_rfc3339_opts(SecondsFormat::Secs, false),
    )
}
