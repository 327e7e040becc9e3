//! Shared types for the tabwardend API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabwarden_util::TabId;

/// Why access to the tracked site is currently blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCause {
    /// The per-session time budget was exhausted
    SessionLimit,
    /// The session ended (all tracked tabs closed) after non-zero elapsed time
    SessionEnded,
    /// The daily open quota was exceeded
    DailyQuota,
}

/// Status snapshot returned to display clients.
///
/// Field names on the wire match the legacy storage/display schema so the
/// existing popup can consume responses unchanged. Timestamps are integer
/// milliseconds since the Unix epoch; `blockedUntil` of 0 means no block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInfo {
    /// Accumulated active time in the current session, in milliseconds
    #[serde(rename = "totalTime")]
    pub total_time_ms: u64,

    /// Session time budget in minutes
    #[serde(rename = "timeLimit")]
    pub time_limit_minutes: u32,

    /// Currently tracked tabs (tab id -> presence flag)
    #[serde(rename = "facebookTabs")]
    pub tracked_tabs: BTreeMap<TabId, bool>,

    /// Epoch ms until which access is blocked; 0 when no block is active
    #[serde(rename = "blockedUntil")]
    pub blocked_until_ms: i64,

    /// Whether access is denied right now
    #[serde(rename = "isBlocked")]
    pub is_blocked: bool,

    /// Fixed daily open quota (kept on the wire for display parity)
    #[serde(rename = "dailyOpensLimit")]
    pub daily_opens_limit: u32,

    /// Session starts counted against the quota today
    #[serde(rename = "dailyOpenCount")]
    pub daily_open_count: u32,

    /// Epoch ms of the next quota reset (next local midnight)
    #[serde(rename = "dailyResetAt")]
    pub daily_reset_at_ms: i64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub host_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> TimerInfo {
        let mut tabs = BTreeMap::new();
        tabs.insert(TabId::new(7), true);
        tabs.insert(TabId::new(12), true);

        TimerInfo {
            total_time_ms: 42_500,
            time_limit_minutes: 3,
            tracked_tabs: tabs,
            blocked_until_ms: 0,
            is_blocked: false,
            daily_opens_limit: 10,
            daily_open_count: 4,
            daily_reset_at_ms: 1_750_000_000_000,
        }
    }

    #[test]
    fn timer_info_uses_legacy_wire_names() {
        let json = serde_json::to_string(&sample_info()).unwrap();

        assert!(json.contains("\"totalTime\":42500"));
        assert!(json.contains("\"timeLimit\":3"));
        assert!(json.contains("\"facebookTabs\":{\"7\":true,\"12\":true}"));
        assert!(json.contains("\"blockedUntil\":0"));
        assert!(json.contains("\"isBlocked\":false"));
        assert!(json.contains("\"dailyOpensLimit\":10"));
        assert!(json.contains("\"dailyOpenCount\":4"));
        assert!(json.contains("\"dailyResetAt\":1750000000000"));
    }

    #[test]
    fn timer_info_round_trips() {
        let info = sample_info();
        let json = serde_json::to_string(&info).unwrap();
        let parsed: TimerInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn block_cause_serialization() {
        let json = serde_json::to_string(&BlockCause::DailyQuota).unwrap();
        assert_eq!(json, "\"daily_quota\"");
    }
}
