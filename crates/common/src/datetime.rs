//! DateTime utilities.
//!
//! Deadlines arrive from the web tier as strings and are turned into an
//! absolute instant plus a non-negative delay relative to "now".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::time::Duration;

/// Error returned when a deadline string is not a recognizable instant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid deadline '{input}': expected an ISO 8601 timestamp")]
pub struct DeadlineParseError {
    /// The rejected input
    pub input: String,
}

/// Parse a deadline string into a UTC instant.
///
/// Supported formats:
/// - RFC 3339: "2024-06-01T12:30:45Z", "2024-06-01T12:30:45.120+02:00"
/// - RFC 2822: "Sat, 01 Jun 2024 12:30:45 GMT"
/// - Naive date-time, assumed UTC: "2024-06-01 12:30:45", "2024-06-01T12:30:45"
/// - Date only, midnight UTC: "2024-06-01"
///
/// # Examples
///
/// ```
/// use tourney_common::datetime::parse_deadline;
///
/// let deadline = parse_deadline("2024-06-01T12:30:45Z").unwrap();
/// assert_eq!(deadline.to_rfc3339(), "2024-06-01T12:30:45+00:00");
/// ```
pub fn parse_deadline(input: &str) -> Result<DateTime<Utc>, DeadlineParseError> {
    let trimmed = input.trim();

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| DateTime::parse_from_rfc2822(trimmed).map(|dt| dt.with_timezone(&Utc)))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f").map(|n| n.and_utc())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
        })
        .map_err(|_| DeadlineParseError {
            input: input.to_string(),
        })
}

/// Time remaining until `deadline`, clamped to zero for past instants.
///
/// # Examples
///
/// ```
/// use chrono::{Duration as ChronoDuration, Utc};
/// use std::time::Duration;
/// use tourney_common::datetime::delay_until;
///
/// let now = Utc::now();
/// assert_eq!(delay_until(now + ChronoDuration::seconds(90), now), Duration::from_secs(90));
/// assert_eq!(delay_until(now - ChronoDuration::hours(1), now), Duration::ZERO);
/// ```
pub fn delay_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}
