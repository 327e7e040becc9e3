//! Persisted tracker state
//!
//! One field per legacy storage key. Every field decodes independently on
//! load, so a corrupt value costs only that field, not the whole state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabwarden_util::TabId;

/// Storage keys, kept byte-for-byte compatible with the legacy schema.
pub mod keys {
    pub const TRACKED_TABS: &str = "facebookTabs";
    pub const TOTAL_TIME: &str = "totalFacebookTime";
    pub const TIME_LIMIT: &str = "timeLimit";
    pub const BLOCKED_UNTIL: &str = "blockedUntil";
    pub const COOLDOWN_STARTED: &str = "cooldownStarted";
    pub const DAILY_OPENS_LIMIT: &str = "dailyOpensLimit";
    pub const DAILY_OPEN_COUNT: &str = "dailyOpenCount";
    pub const DAILY_RESET_AT: &str = "dailyResetAt";
}

/// Default session time budget in minutes.
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 1;

/// Fixed daily open quota. Not user-configurable; persisted only so the
/// display layer can show it.
pub const DAILY_OPENS_LIMIT: u32 = 10;

/// Full tracker state as persisted across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Tracked tab set (`facebookTabs`)
    pub tracked_tabs: BTreeMap<TabId, bool>,

    /// Accumulated session time in ms (`totalFacebookTime`)
    pub total_time_ms: u64,

    /// Session time budget in minutes (`timeLimit`)
    pub time_limit_minutes: u32,

    /// Epoch ms until which access is blocked; 0 = inactive (`blockedUntil`)
    pub blocked_until_ms: i64,

    /// Whether the active block came from a session cooldown
    /// (as opposed to a quota-only block) (`cooldownStarted`)
    pub cooldown_started: bool,

    /// Fixed daily open quota (`dailyOpensLimit`)
    pub daily_opens_limit: u32,

    /// Session starts counted today (`dailyOpenCount`)
    pub daily_open_count: u32,

    /// Epoch ms of the next quota reset; 0 = never computed (`dailyResetAt`)
    pub daily_reset_at_ms: i64,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            tracked_tabs: BTreeMap::new(),
            total_time_ms: 0,
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
            blocked_until_ms: 0,
            cooldown_started: false,
            daily_opens_limit: DAILY_OPENS_LIMIT,
            daily_open_count: 0,
            daily_reset_at_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let state = PersistedState::default();

        assert!(state.tracked_tabs.is_empty());
        assert_eq!(state.total_time_ms, 0);
        assert_eq!(state.time_limit_minutes, 1);
        assert_eq!(state.blocked_until_ms, 0);
        assert!(!state.cooldown_started);
        assert_eq!(state.daily_opens_limit, 10);
        assert_eq!(state.daily_open_count, 0);
        assert_eq!(state.daily_reset_at_ms, 0);
    }

}
