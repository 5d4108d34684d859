//! Time and duration conversion utilities.
//!
//! Media engines report positions as floating point seconds while the core
//! keeps `Duration`s. The helpers here convert between the two with explicit
//! saturation instead of panicking on out-of-range input.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Convert seconds reported by a media engine into a `Duration`.
///
/// Negative and NaN values map to zero, values too large for a `Duration`
/// (including infinity) saturate at `Duration::MAX`.
#[must_use]
pub fn duration_from_secs_f64(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Format a position as `m:ss` for progress labels.
///
/// Minutes are not zero padded and are allowed to exceed 59.
#[must_use]
pub fn format_clock(position: Duration) -> String {
    let total = position.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_millis_u64() {
        let duration = Duration::from_millis(1234);
        assert_eq!(duration.as_millis_u64(), 1234);
    }

    #[test]
    fn test_as_millis_u64_zero() {
        assert_eq!(Duration::ZERO.as_millis_u64(), 0);
    }

    #[test]
    fn test_as_millis_u64_saturates() {
        assert_eq!(Duration::MAX.as_millis_u64(), u64::MAX);
    }

    #[test]
    fn test_duration_from_secs_f64() {
        assert_eq!(duration_from_secs_f64(13.78), Duration::from_secs_f64(13.78));
        assert_eq!(duration_from_secs_f64(232.0), Duration::from_secs(232));
    }

    #[test]
    fn test_duration_from_secs_f64_out_of_range() {
        assert_eq!(duration_from_secs_f64(-1.0), Duration::ZERO);
        assert_eq!(duration_from_secs_f64(f64::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs_f64(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::ZERO), "0:00");
        assert_eq!(format_clock(Duration::from_millis(9_900)), "0:09");
        assert_eq!(format_clock(Duration::from_secs(232)), "3:52");
        assert_eq!(format_clock(Duration::from_secs(3_725)), "62:05");
    }
}
