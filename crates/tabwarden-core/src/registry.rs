//! Tab registry: which tabs currently display the tracked site

use std::collections::BTreeMap;
use tabwarden_util::TabId;

/// Domain markers identifying the tracked site. A URL belongs to the
/// tracked site when it contains any of these as a case-sensitive
/// substring.
pub const TRACKED_DOMAINS: &[&str] = &["facebook.com", "fb.com", "fb.watch"];

/// Does this URL belong to the tracked site?
pub fn is_tracked_url(url: &str) -> bool {
    TRACKED_DOMAINS.iter().any(|marker| url.contains(marker))
}

/// In-memory set of tabs whose last known URL matched the tracked site.
///
/// Invariant: a tab id is present iff its most recent navigation matched
/// [`is_tracked_url`] and the tab has not since been removed or
/// force-closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabRegistry {
    tabs: BTreeMap<TabId, bool>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the persisted map.
    pub fn from_map(tabs: BTreeMap<TabId, bool>) -> Self {
        Self { tabs }
    }

    /// The persisted representation (tab id -> presence flag).
    pub fn as_map(&self) -> &BTreeMap<TabId, bool> {
        &self.tabs
    }

    /// Track a tab. Returns `true` if it was newly inserted.
    pub fn insert(&mut self, tab_id: TabId) -> bool {
        self.tabs.insert(tab_id, true).is_none()
    }

    /// Stop tracking a tab. Returns `true` if it was present.
    pub fn remove(&mut self, tab_id: TabId) -> bool {
        self.tabs.remove(&tab_id).is_some()
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// All tracked tab ids, ascending.
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        self.tabs.clear();
    }
}
