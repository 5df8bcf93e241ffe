use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;

/// Jitter bounds for the availability search loop.
pub const SEARCH_JITTER_MS: RangeInclusive<u64> = 1500..=2500;

/// Jitter bounds for the booking loop. Much tighter than the search: the
/// commit endpoint has a narrow contention window and slower polling loses
/// the race.
pub const BOOKING_JITTER_MS: RangeInclusive<u64> = 50..=100;

/// Random delay inside the given millisecond bounds, so concurrent users of
/// this tool do not hammer the API in lockstep.
pub fn jittered(bounds_ms: RangeInclusive<u64>) -> Duration {
    Duration::from_millis(rand::rng().random_range(bounds_ms))
}
