//! Time formatting helpers.

use std::time::Duration;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Seconds with two decimals, for run reports.
pub fn format_duration_precise(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_durations_in_seconds() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
    }

    #[test]
    fn longer_durations_roll_over_units() {
        assert_eq!(format_duration(61), "1m 1s");
        assert_eq!(format_duration(3600 + 120), "1h 2m");
        assert_eq!(format_duration(86400 + 7200), "1d 2h");
    }

    #[test]
    fn precise_has_two_decimals() {
        assert_eq!(format_duration_precise(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration_precise(Duration::ZERO), "0.00s");
    }
}
