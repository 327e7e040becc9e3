//! Actions and events produced by the gate engine

use chrono::{DateTime, Local};
use tabwarden_api::BlockCause;
use tabwarden_util::TabId;

/// Host-side work requested by an engine transition.
///
/// The engine mutates its own state synchronously and hands these to the
/// [`crate::TabActionExecutor`]; it never touches the browser itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAction {
    /// Force-close a tab (executor re-verifies existence first)
    CloseTab { tab_id: TabId, cause: BlockCause },

    /// Raise the replaceable "access blocked" notification
    Notify { blocked_until: DateTime<Local> },
}

/// Events emitted by the engine for broadcast to display clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Access to the tracked site was blocked
    AccessBlocked {
        blocked_until: DateTime<Local>,
        cause: BlockCause,
    },

    /// A block lapsed; the session timer was re-armed
    AccessRestored,

    /// The daily quota rolled over at local midnight
    QuotaRollover { reset_at: DateTime<Local> },

    /// The session time budget changed
    TimeLimitChanged { minutes: u32 },
}

/// What one handler invocation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub actions: Vec<EngineAction>,
    pub events: Vec<CoreEvent>,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.events.is_empty()
    }
}
