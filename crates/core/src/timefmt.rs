//! Human-readable timestamps and durations for alert bodies.
//!
//! Epoch-millisecond inputs use `-1` for "not set", which renders as `-`.

use chrono::{DateTime, FixedOffset};

const UNSET: i64 = -1;

/// Render `ms` as `yyyy/MM/dd HH:mm:ss +HH:MM` in the given zone.
pub fn format_date_time_zone(ms: i64, offset: FixedOffset) -> String {
    if ms == UNSET {
        return "-".into();
    }
    match DateTime::from_timestamp_millis(ms) {
        Some(utc) => utc
            .with_timezone(&offset)
            .format("%Y/%m/%d %H:%M:%S %:z")
            .to_string(),
        None => "-".into(),
    }
}

/// Render the elapsed time between `start` and `end`.
///
/// A running execution (`end == -1`) is measured up to `now`.
pub fn format_duration(start: i64, end: i64, now: i64) -> String {
    if start == UNSET {
        return "-".into();
    }
    let end = if end == UNSET { now } else { end };
    // End before start renders as zero.
    let mut seconds = end.saturating_sub(start).max(0) / 1000;

    if seconds < 60 {
        return format!("{} sec", seconds);
    }

    let mut minutes = seconds / 60;
    seconds %= 60;
    if minutes < 60 {
        return format!("{}m {}s", minutes, seconds);
    }

    let mut hours = minutes / 60;
    minutes %= 60;
    if hours < 24 {
        return format!("{}h {}m {}s", hours, minutes, seconds);
    }

    let days = hours / 24;
    hours %= 24;
    format!("{}d {}h {}m", days, hours, minutes)
}
