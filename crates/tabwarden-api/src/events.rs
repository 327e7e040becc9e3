//! Events broadcast by the service to subscribed display clients

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{BlockCause, TimerInfo};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event timestamp
    pub timestamp: DateTime<Local>,
    /// Event payload
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: Local::now(),
            payload,
        }
    }

    pub fn at(timestamp: DateTime<Local>, payload: EventPayload) -> Self {
        Self { timestamp, payload }
    }
}

/// Event payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Access to the tracked site was blocked
    AccessBlocked {
        /// Epoch ms until which access is denied
        blocked_until_ms: i64,
        cause: BlockCause,
    },

    /// A block lapsed and tracking re-armed
    AccessRestored,

    /// The daily quota rolled over at local midnight
    QuotaRollover {
        /// Epoch ms of the next reset
        reset_at_ms: i64,
    },

    /// The session time budget was changed
    TimeLimitChanged { minutes: u32 },

    /// Full state snapshot (sent after transitions that change several fields)
    StateChanged(TimerInfo),
}
