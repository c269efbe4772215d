//! Duration parsing utilities.

use std::time::Duration;
use crate::constants::time;

/// Parses a duration string like "30s", "5m", "1h" into a Duration.
///
/// # Arguments
/// * `s` - Duration string (e.g., "30s", "5m", "1h", "7d")
///
/// # Returns
/// * `Ok(Duration)` on success
/// * `Err(&str)` with error message on failure
pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
    let s = s.trim();
    let unit = s.chars().last().ok_or("Empty duration")?;
    let value: u64 = s[..s.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| "Invalid number in duration")?;

    let multiplier = match unit {
        's' => 1,
        'm' => time::SECONDS_PER_MINUTE,
        'h' => time::SECONDS_PER_HOUR,
        'd' => time::SECONDS_PER_DAY,
        _ => return Err("Invalid duration unit")
    };
    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or("Duration too large")
}
