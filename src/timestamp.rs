//! Decoding of the `<year>/<month>/<day>/<hour>/<minute>` path suffix.

use chrono::{DateTime, TimeZone, Utc};

/// Number of trailing path components that encode a minute timestamp.
pub const TIMESTAMP_COMPONENTS: usize = 5;

/// Decode five path components into a UTC instant with zero seconds.
///
/// Every component must be a non-empty run of ASCII digits, and the result
/// must be a real calendar date and time (month 1-12, a day that exists in
/// that month, hour 0-23, minute 0-59). Anything else yields `None`; callers
/// skip such directories without treating it as an error.
///
/// ```
/// use retention_cleaner::timestamp::decode_minute_timestamp;
///
/// let ts = decode_minute_timestamp("2024", "02", "29", "23", "59").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2024-02-29T23:59:00+00:00");
///
/// assert!(decode_minute_timestamp("2024", "13", "01", "00", "00").is_none());
/// assert!(decode_minute_timestamp("2024", "01", "01", "00", "xx").is_none());
/// ```
pub fn decode_minute_timestamp(
    year: &str,
    month: &str,
    day: &str,
    hour: &str,
    minute: &str,
) -> Option<DateTime<Utc>> {
    let year = parse_component(year)?;
    let month = parse_component(month)?;
    let day = parse_component(day)?;
    let hour = parse_component(hour)?;
    let minute = parse_component(minute)?;

    let year = i32::try_from(year).ok()?;
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).single()
}

/// Decode the timestamp held by the last five entries of `components`.
pub fn decode_from_components(components: &[String]) -> Option<DateTime<Utc>> {
    if components.len() < TIMESTAMP_COMPONENTS {
        return None;
    }

    let suffix = &components[components.len() - TIMESTAMP_COMPONENTS..];
    decode_minute_timestamp(&suffix[0], &suffix[1], &suffix[2], &suffix[3], &suffix[4])
}

fn parse_component(component: &str) -> Option<u32> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    component.parse::<u32>().ok()
}
