//! Display formatters for metric values and timestamps.
//!
//! Metric formatters return `(value, units)` pairs so the value and its
//! unit can be laid out separately.

use chrono::{DateTime, Utc};

const NUMBER_STEPS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

const BYTE_STEPS: [(f64, &str); 4] = [
    (1024.0 * 1024.0 * 1024.0 * 1024.0, "TB"),
    (1024.0 * 1024.0 * 1024.0, "GB"),
    (1024.0 * 1024.0, "MB"),
    (1024.0, "KB"),
];

/// Format a count with a thousands suffix.
///
/// ```
/// # use jobwatch::dashboard::format::number;
/// assert_eq!(number(1_500.0), ("1.5".to_string(), "K".to_string()));
/// assert_eq!(number(42.0), ("42".to_string(), String::new()));
/// ```
pub fn number(value: f64) -> (String, String) {
    scaled(value, &NUMBER_STEPS, "")
}

/// Format a byte count with binary prefixes.
pub fn bytes(value: f64) -> (String, String) {
    scaled(value, &BYTE_STEPS, "B")
}

fn scaled(value: f64, steps: &[(f64, &str)], base_unit: &str) -> (String, String) {
    let magnitude = value.abs();
    for (scale, suffix) in steps {
        if magnitude >= *scale {
            return (one_decimal(value / scale), (*suffix).to_string());
        }
    }
    (one_decimal(value), base_unit.to_string())
}

fn one_decimal(value: f64) -> String {
    let text = format!("{value:.1}");
    match text.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => text,
    }
}

/// Relative phrase for `then_ms` seen from `now_ms`, e.g. "5 minutes ago"
/// or "about an hour from now".
pub fn time_ago(then_ms: i64, now_ms: i64) -> String {
    let distance = now_ms - then_ms;
    let suffix = if distance < 0 { "from now" } else { "ago" };

    let seconds = distance.unsigned_abs() as f64 / 1000.0;
    let minutes = seconds / 60.0;
    let hours = minutes / 60.0;
    let days = hours / 24.0;
    let years = days / 365.0;

    let words = if seconds < 45.0 {
        "less than a minute".to_string()
    } else if seconds < 90.0 {
        "about a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes.round())
    } else if minutes < 90.0 {
        "about an hour".to_string()
    } else if hours < 24.0 {
        format!("about {} hours", hours.round())
    } else if hours < 42.0 {
        "a day".to_string()
    } else if days < 30.0 {
        format!("{} days", days.round())
    } else if days < 45.0 {
        "about a month".to_string()
    } else if days < 365.0 {
        format!("{} months", (days / 30.0).round())
    } else if years < 1.5 {
        "about a year".to_string()
    } else {
        format!("{} years", years.round())
    };

    format!("{words} {suffix}")
}

fn utc_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// `MMM d, yyyy`, e.g. "Nov 14, 2023".
pub fn calendar_date(ms: i64) -> Option<String> {
    utc_millis(ms).map(|at| at.format("%b %-d, %Y").to_string())
}

/// `hh:mm AM`, e.g. "10:13 PM".
pub fn clock_time(ms: i64) -> Option<String> {
    utc_millis(ms).map(|at| at.format("%I:%M %p").to_string())
}
