//! Shared serialization/deserialization utilities for configuration
//!
//! Durations are written the way the command line takes them: a sequence of
//! decimal numbers with a unit suffix, such as `300ms`, `5s` or `1m30s`.
//! A bare `0` is accepted as zero.

use std::time::Duration;

use crate::error::ConfigError;

/// Unit suffixes and their length in nanoseconds; matched exactly, so order is irrelevant
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

/// Parse a duration string such as `500ms`, `2s` or `1h15m`
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(input.to_string());
    let s = input.trim();

    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut rest = s;
    let mut total_nanos = 0f64;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let scale = UNITS
            .iter()
            .find(|(suffix, _)| *suffix == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(invalid)?;
        rest = &rest[unit_len..];

        total_nanos += value * scale;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Format a duration so that [`parse_duration`] reads it back
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0".to_string();
    }
    if duration.subsec_nanos() == 0 {
        return format!("{}s", duration.as_secs());
    }
    if duration.as_nanos() % 1_000_000 == 0 {
        return format!("{}ms", duration.as_millis());
    }
    format!("{}ns", duration.as_nanos())
}

/// Helper module for Duration serialization as a duration string
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Config {
///     #[serde(with = "ssc_core::config::serde_utils::duration_str")]
///     delay: Duration,
/// }
/// ```
pub mod duration_str {
    use serde::{self, de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize a Duration as a string like `1500ms`
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_duration(*duration))
    }

    /// Deserialize a Duration from a string like `5s`
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestConfig {
        #[serde(with = "duration_str")]
        delay: Duration,
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("250ns").unwrap(), Duration::from_nanos(250));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_duration_compound_and_fractional() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(
            parse_duration("1h2m3s4ms").unwrap(),
            Duration::from_millis(3_723_004)
        );
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for input in ["", "5", "s", "5x", "-1s", "1s 2s", "ms5"] {
            assert!(
                matches!(parse_duration(input), Err(ConfigError::InvalidDuration(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::from_nanos(7)), "7ns");
    }

    #[test]
    fn test_duration_str_serialize() {
        let config = TestConfig {
            delay: Duration::from_secs(30),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"delay":"30s"}"#);
    }

    #[test]
    fn test_duration_str_deserialize() {
        let json = r#"{"delay":"750ms"}"#;
        let config: TestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.delay, Duration::from_millis(750));
    }

    #[test]
    fn test_duration_str_deserialize_invalid() {
        let json = r#"{"delay":"soon"}"#;
        assert!(serde_json::from_str::<TestConfig>(json).is_err());
    }
}
