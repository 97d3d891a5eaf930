use chrono::{DateTime, Datelike, FixedOffset};

/// Trading-session clock runs at a fixed UTC+3 offset.
const SESSION_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// True when `timestamp_ms` falls on a Saturday or Sunday in UTC+3.
///
/// Timestamps outside chrono's representable range count as outside the session.
pub fn is_outside_session(timestamp_ms: i64) -> bool {
    let Some(offset) = FixedOffset::east_opt(SESSION_UTC_OFFSET_SECS) else {
        return true;
    };
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(utc) => utc.with_timezone(&offset).weekday().num_days_from_monday() >= 5,
        None => true,
    }
}
