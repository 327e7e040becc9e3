//! Tab action executor: carries out engine decisions against the browser

use chrono::{DateTime, Local};
use std::sync::Arc;
use tabwarden_host_api::BrowserHost;
use tabwarden_util::{TabId, minutes_until_ceil};
use tracing::{debug, warn};

use crate::EngineAction;

/// Fixed notification identifier; re-raising replaces the previous
/// notification instead of stacking a new one.
pub const BLOCKED_NOTIFICATION_ID: &str = "tabwarden-blocked";

/// Executes [`EngineAction`]s against a [`BrowserHost`].
///
/// Tab closure is asynchronous against the browser, so a tab id computed by
/// the engine may already be gone by the time the close runs. Every close
/// re-verifies existence at execution time and silently skips a vanished
/// tab; no failure here ever propagates back into the engine.
pub struct TabActionExecutor {
    host: Arc<dyn BrowserHost>,
}

impl TabActionExecutor {
    pub fn new(host: Arc<dyn BrowserHost>) -> Self {
        Self { host }
    }

    /// Run all actions from one handler invocation, in order.
    pub async fn execute(&self, actions: Vec<EngineAction>, now: DateTime<Local>) {
        for action in actions {
            match action {
                EngineAction::CloseTab { tab_id, .. } => self.close_tab(tab_id).await,
                EngineAction::Notify { blocked_until } => {
                    self.notify_blocked(blocked_until, now).await
                }
            }
        }
    }

    async fn close_tab(&self, tab_id: TabId) {
        match self.host.tab_exists(tab_id).await {
            Ok(true) => {
                if let Err(e) = self.host.close_tab(tab_id).await {
                    warn!(%tab_id, error = %e, "Failed to close tab");
                }
            }
            Ok(false) => {
                debug!(%tab_id, "Tab already gone, skipping close");
            }
            Err(e) => {
                warn!(%tab_id, error = %e, "Tab existence check failed, skipping close");
            }
        }
    }

    async fn notify_blocked(&self, blocked_until: DateTime<Local>, now: DateTime<Local>) {
        if !self.host.capabilities().can_notify {
            debug!("Notifications unavailable, skipping");
            return;
        }

        let minutes = minutes_until_ceil(blocked_until, now);
        let message = format!(
            "Access is blocked for the next {} minute{}.",
            minutes,
            if minutes == 1 { "" } else { "s" }
        );

        if let Err(e) = self
            .host
            .notify(BLOCKED_NOTIFICATION_ID, "Time's up", &message)
            .await
        {
            warn!(error = %e, "Failed to raise notification");
        }
    }
}
