//! Daily open quota with local-midnight rollover

use chrono::{DateTime, Local};
use tabwarden_store::DAILY_OPENS_LIMIT;
use tabwarden_util::next_local_midnight;

/// Caps how many times a tracked session may begin per calendar day.
///
/// A "session begin" is the registry transitioning from empty to non-empty
/// through a tracked-site navigation. The cap is fixed; `reset_at` is
/// always the start of the next local calendar day relative to the last
/// observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyQuota {
    limit: u32,
    open_count: u32,
    reset_at: DateTime<Local>,
}

impl DailyQuota {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            limit: DAILY_OPENS_LIMIT,
            open_count: 0,
            reset_at: next_local_midnight(now),
        }
    }

    /// Restore from persisted fields. A `reset_at_ms` of zero (first run)
    /// or an unparseable value re-anchors to the next midnight.
    pub fn from_parts(open_count: u32, reset_at: Option<DateTime<Local>>, now: DateTime<Local>) -> Self {
        Self {
            limit: DAILY_OPENS_LIMIT,
            open_count,
            reset_at: reset_at.unwrap_or_else(|| next_local_midnight(now)),
        }
    }

    /// Count one session start. Returns the new count.
    pub fn record_open(&mut self) -> u32 {
        self.open_count += 1;
        self.open_count
    }

    /// Whether the recorded opens exceed the cap.
    pub fn exceeded(&self) -> bool {
        self.open_count > self.limit
    }

    /// Whether the daily reset is due.
    pub fn rollover_due(&self, now: DateTime<Local>) -> bool {
        now >= self.reset_at
    }

    /// Zero the count and move `reset_at` to the next midnight after `now`.
    pub fn rollover(&mut self, now: DateTime<Local>) {
        self.open_count = 0;
        self.reset_at = next_local_midnight(now);
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn open_count(&self) -> u32 {
        self.open_count
    }

    pub fn reset_at(&self) -> DateTime<Local> {
        self.reset_at
    }
}
