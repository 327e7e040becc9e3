//! Session timer: wall-clock accumulation of active time

use chrono::{DateTime, Local};

/// Accumulates elapsed wall-clock time while the tracked site is open.
///
/// The timer advances at explicit checkpoints rather than with a running
/// clock: each checkpoint adds `(now - last_check)` when a session is
/// active and always moves `last_check` forward, so elapsed time reflects
/// wall-clock presence regardless of event frequency. A checkpoint must
/// run on every registry mutation, every periodic tick, and every tab
/// activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimer {
    total_ms: u64,
    last_check: DateTime<Local>,
}

impl SessionTimer {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            total_ms: 0,
            last_check: now,
        }
    }

    /// Restore from persisted total; the interval since the previous
    /// process observed the clock is not counted.
    pub fn from_total(total_ms: u64, now: DateTime<Local>) -> Self {
        Self {
            total_ms,
            last_check: now,
        }
    }

    /// Advance the timer. Adds the delta since the last checkpoint when
    /// `counting` (registry non-empty); always moves `last_check` to `now`.
    /// A clock regression yields a negative delta, which is dropped.
    ///
    /// Returns the milliseconds added.
    pub fn checkpoint(&mut self, now: DateTime<Local>, counting: bool) -> u64 {
        let delta_ms = (now - self.last_check).num_milliseconds().max(0) as u64;
        self.last_check = now;

        if counting {
            self.total_ms += delta_ms;
            delta_ms
        } else {
            0
        }
    }

    /// Zero the accumulated time and re-arm from `now`.
    pub fn reset(&mut self, now: DateTime<Local>) {
        self.total_ms = 0;
        self.last_check = now;
    }

    /// Accumulated milliseconds as of the last checkpoint.
    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    /// Read-only projection: the stored total plus the live delta when a
    /// session is running. Used by status queries so displays polling
    /// between checkpoints see a smooth countdown. Does not mutate.
    pub fn projected_total_ms(&self, now: DateTime<Local>, counting: bool) -> u64 {
        if counting {
            let delta_ms = (now - self.last_check).num_milliseconds().max(0) as u64;
            self.total_ms + delta_ms
        } else {
            self.total_ms
        }
    }

    pub fn last_check(&self) -> DateTime<Local> {
        self.last_check
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn accumulates_only_while_counting() {
        let mut timer = SessionTimer::new(t0());

        let added = timer.checkpoint(t0() + Duration::seconds(5), true);
        assert_eq!(added, 5_000);
        assert_eq!(timer.total_ms(), 5_000);

        // Idle gap: last_check still advances, total does not
        let added = timer.checkpoint(t0() + Duration::seconds(30), false);
        assert_eq!(added, 0);
        assert_eq!(timer.total_ms(), 5_000);

        // Counting resumes from the advanced checkpoint, so the idle gap
        // is never retroactively counted
        let added = timer.checkpoint(t0() + Duration::seconds(33), true);
        assert_eq!(added, 3_000);
        assert_eq!(timer.total_ms(), 8_000);
    }

    #[test]
    fn exact_wall_clock_deltas() {
        let mut timer = SessionTimer::new(t0());
        for i in 1..=10 {
            timer.checkpoint(t0() + Duration::seconds(i * 5), true);
        }
        assert_eq!(timer.total_ms(), 50_000);
    }

    #[test]
    fn clock_regression_is_dropped() {
        let mut timer = SessionTimer::new(t0());
        timer.checkpoint(t0() + Duration::seconds(10), true);
        assert_eq!(timer.total_ms(), 10_000);

        // Clock jumps backwards: nothing added, checkpoint re-anchored
        timer.checkpoint(t0() - Duration::seconds(60), true);
        assert_eq!(timer.total_ms(), 10_000);
        assert_eq!(timer.last_check(), t0() - Duration::seconds(60));
    }

    #[test]
    fn reset_zeroes_and_rearms() {
        let mut timer = SessionTimer::new(t0());
        timer.checkpoint(t0() + Duration::seconds(90), true);
        assert!(timer.total_ms() > 0);

        let later = t0() + Duration::seconds(100);
        timer.reset(later);
        assert_eq!(timer.total_ms(), 0);
        assert_eq!(timer.last_check(), later);
    }

    #[test]
    fn projection_does_not_mutate() {
        let mut timer = SessionTimer::new(t0());
        timer.checkpoint(t0() + Duration::seconds(10), true);

        let projected = timer.projected_total_ms(t0() + Duration::seconds(14), true);
        assert_eq!(projected, 14_000);
        assert_eq!(timer.total_ms(), 10_000);

        // Not counting: projection equals the stored total
        let projected = timer.projected_total_ms(t0() + Duration::seconds(14), false);
        assert_eq!(projected, 10_000);
    }
}
