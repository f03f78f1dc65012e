//! Shared helpers for minutes ↔ display-string conversions.
//!
//! Three formats leave the engine:
//!
//! - `format_pace`: decimal minutes per km → `M:SS` (e.g. 7.98 → "7:59")
//! - `format_clock_time`: start-of-day clock + elapsed minutes → `HH:MM` (24-hour)
//! - `format_duration`: elapsed minutes → `H:MM`
//!
//! All of them return a zero value for non-finite inputs (NaN, ±Inf).

use chrono::{Duration, NaiveTime};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Format a decimal pace (minutes per km) as `M:SS`.
///
/// Seconds are rounded half-up and a 60-second carry rolls into the minutes,
/// so 7.995 becomes "8:00" rather than "7:60".
pub(crate) fn format_pace(min_per_km: f64) -> String {
    if !min_per_km.is_finite() || min_per_km < 0.0 {
        tracing::warn!(
            "format_pace received invalid value {}, defaulting to 0:00",
            min_per_km
        );
        return "0:00".to_string();
    }
    let total_secs = (min_per_km * 60.0).round() as i64;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Clock time reached `elapsed_minutes` after `start`, as `HH:MM`.
///
/// Elapsed time is rounded to the nearest whole minute. The result wraps past
/// midnight; only the time-of-day is meaningful.
pub(crate) fn format_clock_time(start: NaiveTime, elapsed_minutes: f64) -> String {
    clock_time_after(start, elapsed_minutes)
        .format("%H:%M")
        .to_string()
}

/// Time of day reached `elapsed_minutes` after `start`, rounded to the minute.
pub(crate) fn clock_time_after(start: NaiveTime, elapsed_minutes: f64) -> NaiveTime {
    if !elapsed_minutes.is_finite() {
        tracing::warn!(
            "clock_time_after received non-finite value {}, returning start",
            elapsed_minutes
        );
        return start;
    }
    // Only the time of day matters, so reduce to within one day first
    let minutes_of_day = (elapsed_minutes.round() as i64).rem_euclid(MINUTES_PER_DAY);
    let (time, _wrapped_days) = start.overflowing_add_signed(Duration::minutes(minutes_of_day));
    time
}

/// Format elapsed minutes as `H:MM` (e.g. 143.64 → "2:24").
pub(crate) fn format_duration(minutes: f64) -> String {
    if !minutes.is_finite() || minutes < 0.0 {
        return "0:00".to_string();
    }
    let total = minutes.round() as i64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six_am() -> NaiveTime {
        NaiveTime::from_hms_opt(6, 0, 0).unwrap()
    }

    #[test]
    fn test_format_pace_rounds_seconds() {
        assert_eq!(format_pace(7.98), "7:59");
        assert_eq!(format_pace(8.4), "8:24");
        assert_eq!(format_pace(10.92), "10:55");
    }

    #[test]
    fn test_format_pace_carries_sixty_seconds() {
        // 7.995 min = 7 min 59.7 s → rounds to 8:00, never "7:60"
        assert_eq!(format_pace(7.995), "8:00");
    }

    #[test]
    fn test_format_pace_whole_minutes() {
        assert_eq!(format_pace(6.0), "6:00");
        assert_eq!(format_pace(0.0), "0:00");
    }

    #[test]
    fn test_format_pace_invalid() {
        assert_eq!(format_pace(f64::NAN), "0:00");
        assert_eq!(format_pace(f64::INFINITY), "0:00");
        assert_eq!(format_pace(-1.0), "0:00");
    }

    #[test]
    fn test_format_clock_time_rounds_to_minute() {
        assert_eq!(format_clock_time(six_am(), 143.64), "08:24");
        assert_eq!(format_clock_time(six_am(), 143.4), "08:23");
        assert_eq!(format_clock_time(six_am(), 0.0), "06:00");
    }

    #[test]
    fn test_format_clock_time_wraps_midnight() {
        // 06:00 + 20h → 02:00 next day
        assert_eq!(format_clock_time(six_am(), 20.0 * 60.0), "02:00");
    }

    #[test]
    fn test_format_clock_time_multiple_days() {
        // 3 days + 90 min after 06:00
        assert_eq!(format_clock_time(six_am(), 3.0 * 1440.0 + 90.0), "07:30");
        assert_eq!(format_clock_time(six_am(), 1e30), format_clock_time(six_am(), 1e30));
    }

    #[test]
    fn test_clock_time_after_nan_returns_start() {
        assert_eq!(clock_time_after(six_am(), f64::NAN), six_am());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(143.64), "2:24");
        assert_eq!(format_duration(840.0), "14:00");
        assert_eq!(format_duration(f64::NAN), "0:00");
    }
}
