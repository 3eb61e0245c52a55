//! Display helpers for timestamps stored in UTC.
//!
//! Detection services write IST wall-clock values into UTC columns, so the
//! dashboard shifts them by the IST offset before showing them.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use log::error;

const IST_OFFSET_MINUTES: i64 = 330;

pub const INVALID_TIME: &str = "Invalid Time";
pub const INVALID_DATE: &str = "Invalid date";
pub const NO_DATE: &str = "No date provided";

/// Parse a timestamp as UTC. Strings without an offset are taken as UTC.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Clock time such as `6:30 PM`.
///
/// The value is converted to IST and shifted back by the same offset, which
/// leaves the stored wall clock unchanged.
pub fn utc_to_ist_time(raw: &str) -> String {
    match parse_utc(raw) {
        Some(dt) => dt.format("%-I:%M %p").to_string(),
        None => {
            error!("Invalid UTC date string: {}", raw);
            INVALID_TIME.to_string()
        }
    }
}

/// UTC value shifted to IST, e.g. `Sat, 12 Apr 2025 18:30:00 GMT`
pub fn add_ist_offset(raw: &str) -> String {
    match parse_utc(raw) {
        Some(dt) => (dt + Duration::minutes(IST_OFFSET_MINUTES))
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string(),
        None => {
            error!("Invalid UTC date string: {}", raw);
            INVALID_TIME.to_string()
        }
    }
}

/// Relative phrase for a stored IST wall-clock value, e.g. `5 minutes ago`
pub fn time_ago(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return NO_DATE.to_string(),
    };

    match parse_utc(raw) {
        Some(dt) => {
            let shifted = dt - Duration::minutes(IST_OFFSET_MINUTES);
            relative_phrase(now.signed_duration_since(shifted))
        }
        None => {
            error!("Invalid date: {}", raw);
            INVALID_DATE.to_string()
        }
    }
}

/// Relative wording with the usual rounding thresholds
pub fn relative_phrase(elapsed: Duration) -> String {
    let past = elapsed >= Duration::zero();
    let secs = (elapsed.num_milliseconds() as f64 / 1000.0).abs();

    let minutes = (secs / 60.0).round();
    let hours = (secs / 3600.0).round();
    let days = (secs / 86_400.0).round();
    let months = (secs / 86_400.0 / 30.4375).round();
    let years = (secs / 86_400.0 / 365.25).round();

    let phrase = if secs.round() <= 44.0 {
        "a few seconds".to_string()
    } else if secs.round() <= 89.0 {
        "a minute".to_string()
    } else if minutes <= 44.0 {
        format!("{} minutes", minutes)
    } else if minutes <= 89.0 {
        "an hour".to_string()
    } else if hours <= 21.0 {
        format!("{} hours", hours)
    } else if hours <= 35.0 {
        "a day".to_string()
    } else if days <= 25.0 {
        format!("{} days", days)
    } else if days <= 45.0 {
        "a month".to_string()
    } else if months <= 10.0 {
        format!("{} months", months)
    } else if months <= 17.0 {
        "a year".to_string()
    } else {
        format!("{} years", years.max(2.0))
    };

    if past {
        format!("{} ago", phrase)
    } else {
        format!("in {}", phrase)
    }
}
