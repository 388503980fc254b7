//! Clamping of query parameters.
//!
//! Missing or unparsable values fall back to the default, out-of-range values
//! are clamped. None of these functions fail.

use std::time::Duration;

pub const DEFAULT_COUNT: usize = 100;
pub const MAX_COUNT: usize = 10_000;

pub const DEFAULT_DURATION_SECS: u64 = 10;
pub const MAX_DURATION_SECS: u64 = 60;

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const MAX_CONCURRENCY: usize = 50;

pub const DEFAULT_ERROR_RATE: f64 = 0.05;

pub const DEFAULT_LATENCY_MS: u64 = 0;
pub const MAX_LATENCY_MS: u64 = 5_000;

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1_000;

/// Negative and oversized integers clamp like any other out-of-range value.
fn clamp_int(raw: Option<&str>, default: u64, min: u64, max: u64) -> u64 {
    let Some(raw) = raw.map(str::trim) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(v) if v < 0 => min,
        Ok(v) => (v as u64).clamp(min, max),
        // digits only, but past i64::MAX
        Err(_) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => max,
        Err(_) => default,
    }
}

pub fn validate_count(raw: Option<&str>) -> usize {
    clamp_int(raw, DEFAULT_COUNT as u64, 1, MAX_COUNT as u64) as usize
}

/// Accepts plain seconds (`"30"`) or a suffixed value (`"30s"`, `"2m"`).
pub fn validate_duration(raw: Option<&str>) -> Duration {
    let secs = raw
        .map(str::trim)
        .and_then(|s| {
            if let Some(m) = s.strip_suffix('m') {
                m.parse::<u64>().ok().map(|m| m.saturating_mul(60))
            } else {
                s.strip_suffix('s').unwrap_or(s).parse::<u64>().ok()
            }
        })
        .map(|v| v.clamp(1, MAX_DURATION_SECS))
        .unwrap_or(DEFAULT_DURATION_SECS);
    Duration::from_secs(secs)
}

pub fn validate_concurrency(raw: Option<&str>) -> usize {
    clamp_int(raw, DEFAULT_CONCURRENCY as u64, 1, MAX_CONCURRENCY as u64) as usize
}

pub fn validate_error_rate(raw: Option<&str>) -> f64 {
    match raw.map(str::trim).and_then(|s| s.parse::<f64>().ok()) {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => DEFAULT_ERROR_RATE,
    }
}

pub fn validate_latency_ms(raw: Option<&str>) -> u64 {
    clamp_int(raw, DEFAULT_LATENCY_MS, 0, MAX_LATENCY_MS)
}

pub fn validate_limit(raw: Option<&str>) -> usize {
    clamp_int(raw, DEFAULT_LIMIT as u64, 1, MAX_LIMIT as u64) as usize
}

/// `"true"`, `"1"`, `"yes"` and `"on"` are true; anything else is `default`.
pub fn validate_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) if matches!(s.as_str(), "true" | "1" | "yes" | "on") => true,
        Some(s) if matches!(s.as_str(), "false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

/// Trimmed text parameter; empty means unset.
pub fn validate_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.chars().take(512).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_defaults_and_clamps() {
        assert_eq!(validate_count(None), DEFAULT_COUNT);
        assert_eq!(validate_count(Some("abc")), DEFAULT_COUNT);
        assert_eq!(validate_count(Some("-5")), 1);
        assert_eq!(validate_count(Some("99999999999999999999")), MAX_COUNT);
        assert_eq!(validate_count(Some("0")), 1);
        assert_eq!(validate_count(Some(" 250 ")), 250);
        assert_eq!(validate_count(Some("999999999")), MAX_COUNT);
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(validate_duration(None), Duration::from_secs(DEFAULT_DURATION_SECS));
        assert_eq!(validate_duration(Some("5")), Duration::from_secs(5));
        assert_eq!(validate_duration(Some("7s")), Duration::from_secs(7));
        assert_eq!(validate_duration(Some("1m")), Duration::from_secs(60));
        assert_eq!(validate_duration(Some("10m")), Duration::from_secs(MAX_DURATION_SECS));
        assert_eq!(validate_duration(Some("0")), Duration::from_secs(1));
        assert_eq!(validate_duration(Some("soon")), Duration::from_secs(DEFAULT_DURATION_SECS));
    }

    #[test]
    fn test_concurrency_never_exceeds_cap() {
        assert_eq!(validate_concurrency(None), DEFAULT_CONCURRENCY);
        assert_eq!(validate_concurrency(Some("51")), MAX_CONCURRENCY);
        assert_eq!(validate_concurrency(Some("10000")), MAX_CONCURRENCY);
        assert_eq!(validate_concurrency(Some("0")), 1);
        assert_eq!(validate_concurrency(Some("3.5")), DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_error_rate() {
        assert_eq!(validate_error_rate(None), DEFAULT_ERROR_RATE);
        assert_eq!(validate_error_rate(Some("NaN")), DEFAULT_ERROR_RATE);
        assert_eq!(validate_error_rate(Some("inf")), DEFAULT_ERROR_RATE);
        assert_eq!(validate_error_rate(Some("1.7")), 1.0);
        assert_eq!(validate_error_rate(Some("-0.2")), 0.0);
        assert_eq!(validate_error_rate(Some("0.25")), 0.25);
    }

    #[test]
    fn test_latency_and_limit() {
        assert_eq!(validate_latency_ms(Some("60000")), MAX_LATENCY_MS);
        assert_eq!(validate_latency_ms(Some("x")), DEFAULT_LATENCY_MS);
        assert_eq!(validate_latency_ms(Some("-20")), 0);
        assert_eq!(validate_limit(Some("-1")), 1);
        assert_eq!(validate_limit(Some("5000")), MAX_LIMIT);
        assert_eq!(validate_limit(None), DEFAULT_LIMIT);
    }

    #[test]
    fn test_flag_and_text() {
        assert!(validate_flag(Some("YES"), false));
        assert!(!validate_flag(Some("off"), true));
        assert!(validate_flag(Some("maybe"), true));
        assert_eq!(validate_text(Some("  ")), None);
        assert_eq!(validate_text(Some(" api ")), Some("api".to_string()));
    }
}
