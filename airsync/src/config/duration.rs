//! Human-readable durations (e.g., "30m", "3h", "7d").

use std::time::Duration;

use thiserror::Error;

/// Error parsing a duration string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid duration '{input}' - expected format like '500ms', '30s', '30m', '3h', or '7d'")]
pub struct DurationParseError {
    input: String,
}

impl DurationParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

const UNITS: [(&str, u64); 5] = [
    ("ms", 1),
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
    ("d", 86_400_000),
];

/// Parse a human-readable duration.
///
/// Supports:
/// - Bare numbers (seconds)
/// - `ms`, `s`, `m`, `h`, `d` suffixes
/// - Case-insensitive, whitespace tolerant
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use airsync::config::parse_duration;
///
/// assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
/// assert_eq!(parse_duration("500 ms").unwrap(), Duration::from_millis(500));
/// assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let trimmed = s.trim();
    let lower = trimmed.to_ascii_lowercase();

    let split = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (number, suffix) = lower.split_at(split);
    let suffix = suffix.trim();

    if number.is_empty() {
        return Err(DurationParseError::new(trimmed));
    }
    let value: u64 = number
        .parse()
        .map_err(|_| DurationParseError::new(trimmed))?;

    let millis_per_unit = if suffix.is_empty() {
        1_000
    } else {
        UNITS
            .iter()
            .find(|(unit, _)| *unit == suffix)
            .map(|(_, ms)| *ms)
            .ok_or_else(|| DurationParseError::new(trimmed))?
    };

    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| DurationParseError::new(trimmed))
}

/// Format a duration with the largest unit that represents it exactly.
///
/// ```
/// use std::time::Duration;
/// use airsync::config::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(3 * 3600)), "3h");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis() as u64;
    if millis == 0 {
        return "0s".to_string();
    }
    UNITS
        .iter()
        .rev()
        .find(|(_, ms)| millis % ms == 0)
        .map(|(unit, ms)| format!("{}{}", millis / ms, unit))
        .unwrap_or_else(|| format!("{}ms", millis))
}
