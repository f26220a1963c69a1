//! Wall-clock helpers for snapshot stamping (no chrono dependency).
//!
//! The simulation itself never reads the wall clock; it advances a fixed
//! 16 ms step per tick. These helpers only label exported frames.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time as Unix milliseconds.
pub fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Current UTC timestamp in ISO-8601 format with millisecond precision.
pub fn now_iso8601() -> String {
    millis_to_iso8601(now_unix_millis())
}

/// Convert Unix milliseconds to an ISO-8601 UTC string.
pub fn millis_to_iso8601(millis: u64) -> String {
    let secs = millis / 1000;
    let ms = millis % 1000;
    let days = (secs / 86_400) as i64;
    let of_day = secs % 86_400;
    let (y, m, d) = civil_from_days(days);
    format!(
        "{y:04}-{m:02}-{d:02}T{:02}:{:02}:{:02}.{ms:03}Z",
        of_day / 3600,
        (of_day % 3600) / 60,
        of_day % 60
    )
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe as i64 + era * 400 + i64::from(m <= 2);
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        assert_eq!(millis_to_iso8601(0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_known_instant_with_millis() {
        // 2026-02-21T00:00:00Z = 1771632000 s
        assert_eq!(
            millis_to_iso8601(1_771_632_000_250),
            "2026-02-21T00:00:00.250Z"
        );
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29T12:30:05Z = 1709209805 s
        assert_eq!(
            millis_to_iso8601(1_709_209_805_000),
            "2024-02-29T12:30:05.000Z"
        );
    }
}
