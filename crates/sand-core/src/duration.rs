//! Human-readable durations for the command line.

use std::time::Duration;

use crate::{Error, Result};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Unit suffixes and their length in nanoseconds.
const UNITS: &[(&str, f64)] = &[
    ("ms", 1_000_000.0),
    ("s", NANOS_PER_SEC),
    ("m", 60.0 * NANOS_PER_SEC),
    ("h", 60.0 * 60.0 * NANOS_PER_SEC),
    ("d", 24.0 * 60.0 * 60.0 * NANOS_PER_SEC),
];

/// Parse one command-line duration argument such as `10m`, `1h30m`, `1.5s`
/// or `250ms`. A bare number is taken as seconds.
pub fn parse_duration_component(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidDuration("empty duration".to_string()));
    }

    let mut total = 0.0_f64;
    let mut rest = input;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(Error::InvalidDuration(format!(
                "expected a number in '{}'",
                input
            )));
        }
        let (number, after) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| Error::InvalidDuration(format!("bad number '{}' in '{}'", number, input)))?;

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, remainder) = after.split_at(unit_len);

        let scale = if unit.is_empty() {
            NANOS_PER_SEC
        } else {
            UNITS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(unit))
                .map(|(_, scale)| *scale)
                .ok_or_else(|| {
                    Error::InvalidDuration(format!("unknown unit '{}' in '{}'", unit, input))
                })?
        };

        total += value * scale;
        rest = remainder;
    }

    let nanos = total.round();
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(Error::InvalidDuration(format!("'{}' is too long", input)));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Sum several duration arguments, e.g. `sand start 1h 30m`.
pub fn parse_durations<I, S>(inputs: I) -> Result<Duration>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inputs
        .into_iter()
        .map(|s| parse_duration_component(s.as_ref()))
        .try_fold(Duration::ZERO, |acc, d| Ok(acc + d?))
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn as_millis_u64(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

/// Format as `HH:MM:SS.mmm`; hours are not wrapped.
pub fn format_duration(duration: Duration) -> String {
    let total_millis = duration.as_millis();
    let millis = total_millis % 1000;
    let total_secs = total_millis / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(parse_duration_component("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration_component("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration_component("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration_component("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration_component("45").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration_component("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration_component("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration_component("1m30s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration_component("").is_err());
        assert!(parse_duration_component("m").is_err());
        assert!(parse_duration_component("5 parsecs").is_err());
        assert!(parse_duration_component("1..2s").is_err());
    }

    #[test]
    fn test_parse_durations_sums_arguments() {
        let total = parse_durations(["1h", "30m", "15s"]).unwrap();
        assert_eq!(total, Duration::from_secs(3600 + 1800 + 15));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(600)), "00:10:00.000");
        assert_eq!(format_duration(Duration::from_millis(1500)), "00:00:01.500");
        assert_eq!(format_duration(Duration::from_secs(100 * 3600 + 61)), "100:01:01.000");
    }
}
