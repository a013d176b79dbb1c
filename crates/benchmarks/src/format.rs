//! Human-readable number, latency and date formatting.

use chrono::{DateTime, Utc};

/// Compact throughput: `1.23M`, `45.6K`, `789`.
pub fn format_number(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}

/// Latency in milliseconds, switching to microseconds below 1 ms.
pub fn format_latency(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.0}μs", ms * 1000.0)
    } else {
        format!("{ms:.2}ms")
    }
}

/// Calendar date, e.g. `Feb 1, 2024`.
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// Date and time, e.g. `Feb 1, 2024, 09:30 UTC`.
pub fn format_datetime(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y, %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.4), "999");
        assert_eq!(format_number(1_000.0), "1.0K");
        assert_eq!(format_number(45_678.0), "45.7K");
        assert_eq!(format_number(1_234_567.0), "1.23M");
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(0.25), "250μs");
        assert_eq!(format_latency(1.0), "1.00ms");
        assert_eq!(format_latency(12.346), "12.35ms");
    }

    #[test]
    fn test_format_dates() {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap();
        assert_eq!(format_date(&at), "Feb 1, 2024");
        assert_eq!(format_datetime(&at), "Feb 1, 2024, 09:30 UTC");
    }
}
