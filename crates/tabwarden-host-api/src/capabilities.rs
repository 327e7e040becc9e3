//! Host capabilities model

use serde::{Deserialize, Serialize};

/// Describes what a browser host adapter can do
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Can query whether a tab still exists
    pub can_query_tabs: bool,

    /// Can close tabs
    pub can_close_tabs: bool,

    /// Can raise user-visible notifications.
    /// When false, notifications are skipped entirely.
    pub can_notify: bool,
}

impl HostCapabilities {
    /// Minimal capabilities: tab query and close, no notifications.
    pub fn minimal() -> Self {
        Self {
            can_query_tabs: true,
            can_close_tabs: true,
            can_notify: false,
        }
    }

    /// Full capabilities of a bridged extension host.
    pub fn full() -> Self {
        Self {
            can_query_tabs: true,
            can_close_tabs: true,
            can_notify: true,
        }
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::minimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_capabilities() {
        let caps = HostCapabilities::minimal();
        assert!(caps.can_query_tabs);
        assert!(caps.can_close_tabs);
        assert!(!caps.can_notify);
    }

    #[test]
    fn full_capabilities() {
        let caps = HostCapabilities::full();
        assert!(caps.can_notify);
    }
}
