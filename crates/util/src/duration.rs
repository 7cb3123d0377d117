//! Retry delay conversion.

use std::time::Duration;

/// Converts a possibly-fractional `retryAfter` seconds value into a
/// nearest-nanosecond [`Duration`].
///
/// Negative and non-finite inputs clamp to zero, so a hostile document can
/// never produce a panic or an unbounded sleep from this conversion alone.
pub fn retry_after_duration(seconds: f64) -> Duration {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((seconds * 1_000_000_000.0).round() as u64)
}
