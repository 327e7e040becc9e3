//! Audit event types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tabwarden_api::BlockCause;
use tabwarden_util::TabId;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Session time budget changed
    TimeLimitChanged { minutes: u32 },

    /// Access to the tracked site blocked
    AccessBlocked {
        blocked_until_ms: i64,
        cause: BlockCause,
    },

    /// A block lapsed; tracking re-armed
    AccessRestored,

    /// Daily quota rolled over at local midnight
    QuotaRollover { reset_at_ms: i64 },

    /// A tab was force-closed by policy
    TabForceClosed { tab_id: TabId, cause: BlockCause },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: Local::now(),
            event,
        }
    }
}
