//! Calendar-day arithmetic.
//!
//! All day boundaries are UTC midnights. A "day" is the span between two
//! consecutive midnights, so two instants one minute apart can be one day
//! apart and two instants 47 hours apart can be one day apart.

use chrono::{DateTime, NaiveTime, Utc};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Truncate an instant to the midnight that starts its calendar day.
pub fn day_floor(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Number of calendar days from `earlier` to `later`.
///
/// Negative when `later` is on an earlier calendar day than `earlier`.
pub fn days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    let delta = day_floor(later) - day_floor(earlier);
    delta.num_seconds().div_euclid(SECONDS_PER_DAY)
}
