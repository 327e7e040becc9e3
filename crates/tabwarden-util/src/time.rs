//! Time utilities for tabwardend
//!
//! The engine works in wall-clock time because the gating policies are
//! expressed against the local calendar (cooldown deadlines, next-midnight
//! quota resets) and because timestamps must survive a process restart.
//! Persisted values and wire values are integer milliseconds since the Unix
//! epoch, matching the legacy storage schema; in-memory code uses
//! `DateTime<Local>`.

use chrono::{DateTime, Days, Local, TimeZone};

/// Milliseconds in one minute.
pub const MINUTE_MS: i64 = 60_000;

/// Convert a local timestamp to epoch milliseconds.
pub fn to_epoch_ms(dt: DateTime<Local>) -> i64 {
    dt.timestamp_millis()
}

/// Convert epoch milliseconds back to a local timestamp.
///
/// Returns `None` for values outside the representable range.
pub fn from_epoch_ms(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single()
}

/// The start of the next local calendar day after `now`.
///
/// Around DST transitions the naive midnight may be ambiguous or skipped;
/// `earliest()` picks the first valid instant, and if the whole hour is
/// absent we fall back to 24 wall-clock hours.
pub fn next_local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    let tomorrow = now.date_naive() + Days::new(1);
    let naive = tomorrow.and_hms_opt(0, 0, 0).expect("00:00:00 is valid");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| now + chrono::Duration::hours(24))
}

/// Whole minutes remaining until `until`, rounded up, never negative.
pub fn minutes_until_ceil(until: DateTime<Local>, now: DateTime<Local>) -> i64 {
    let remaining_ms = (until - now).num_milliseconds();
    if remaining_ms <= 0 {
        0
    } else {
        (remaining_ms as u64).div_ceil(MINUTE_MS as u64) as i64
    }
}
