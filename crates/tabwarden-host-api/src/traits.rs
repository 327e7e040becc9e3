//! Browser host adapter traits

use async_trait::async_trait;
use tabwarden_util::TabId;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::HostCapabilities;

/// Errors from browser host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("Host not connected")]
    NotConnected,

    #[error("Request timed out")]
    Timeout,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Tab lifecycle events from the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A tab committed a navigation (or finished loading a new URL)
    TabUpdated { tab_id: TabId, url: String },

    /// A tab was closed (by the user, the browser, or us)
    TabRemoved { tab_id: TabId },

    /// A tab gained focus; carries no URL and changes no membership
    TabActivated { tab_id: TabId },
}

/// Browser host trait - implemented by concrete adapters
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Get the capabilities of this host adapter
    fn capabilities(&self) -> &HostCapabilities;

    /// Check whether a tab still exists.
    ///
    /// Tab closure is asynchronous against the browser; callers use this to
    /// re-verify before acting on a tab id computed earlier.
    async fn tab_exists(&self, tab_id: TabId) -> HostResult<bool>;

    /// Close a tab. Closing an already-gone tab is not an error the caller
    /// should ever see; adapters map it to `Ok(())` or `TabNotFound`.
    async fn close_tab(&self, tab_id: TabId) -> HostResult<()>;

    /// Raise (or replace) a user-visible notification.
    ///
    /// Re-raising with the same `notification_id` updates the existing
    /// notification instead of stacking a new one.
    async fn notify(
        &self,
        notification_id: &str,
        title: &str,
        message: &str,
    ) -> HostResult<()>;

    /// Subscribe to tab lifecycle events
    fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent>;

    /// Optional: check if the host adapter is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}
