/// Scheduled-time helpers shared by schedules and triggers
///
/// Slot times are UTC instants aligned to a schedule's cadence. Trigger path
/// templates refer to the slot time through `${year}`-style tokens which are
/// substituted with zero-padded components.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike, Utc};

/// Truncate a time to the full minute (seconds and sub-seconds zeroed).
pub fn full_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Truncate a time to the full hour.
pub fn full_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    full_minute(t).with_minute(0).unwrap_or(t)
}

pub fn is_full_minute(t: DateTime<Utc>) -> bool {
    full_minute(t) == t
}

pub fn is_full_hour(t: DateTime<Utc>) -> bool {
    full_hour(t) == t
}

/// Parse a workflow `startTime` value.
///
/// Accepts full RFC 3339 timestamps as well as the short minute-precision
/// form `2014-03-10T12:00Z` that configuration scripts conventionally use.
pub fn parse_scheduled_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|n| Utc.from_utc_datetime(&n))
}

/// Substitute `${year}`/`${month}`/`${day}`/`${hour}`/`${minute}`/`${second}`
/// tokens in a path template with the zero-padded components of `t`.
pub fn replace_time_tokens(raw: &str, t: DateTime<Utc>) -> String {
    raw.replace("${year}", &format!("{:04}", t.year()))
        .replace("${month}", &format!("{:02}", t.month()))
        .replace("${day}", &format!("{:02}", t.day()))
        .replace("${hour}", &format!("{:02}", t.hour()))
        .replace("${minute}", &format!("{:02}", t.minute()))
        .replace("${second}", &format!("{:02}", t.second()))
}
