//! Domain Services
//!
//! Pure arithmetic shared by the use cases.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Seconds since the epoch with sub-second precision
pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

/// Stall for a client at `current_hits`
///
/// Linear in the hits over the limit, zero at or below it.
pub fn penalty_for(current_hits: u64, max_hits: u64, per_hit: Duration) -> Duration {
    let over = current_hits.saturating_sub(max_hits);
    per_hit.saturating_mul(u32::try_from(over).unwrap_or(u32::MAX))
}

/// Whole seconds until an expiry run is allowed again, as a negative count
///
/// Returns `None` when a run is allowed now. Otherwise at most `-1`, so a
/// postponed run is never mistaken for a run that expired nothing.
pub fn postponed_for(
    last_expired: Option<DateTime<Utc>>,
    min_interval: Duration,
    now: DateTime<Utc>,
) -> Option<i64> {
    let last = last_expired?;
    let next = epoch_seconds(last) + min_interval.as_secs_f64();
    let now = epoch_seconds(now);
    if next > now {
        Some(-((next - now).ceil() as i64).max(1))
    } else {
        None
    }
}
