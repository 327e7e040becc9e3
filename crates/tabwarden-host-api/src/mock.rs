//! Mock browser host for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tabwarden_util::TabId;
use tokio::sync::mpsc;

use crate::{BrowserHost, HostCapabilities, HostError, HostEvent, HostResult};

/// Mock browser for unit/integration testing.
///
/// Tests script the browser by opening/navigating/removing tabs, which both
/// mutates the mock's tab table and emits the corresponding [`HostEvent`]s,
/// and then assert on what the engine asked the browser to do.
pub struct MockBrowser {
    capabilities: HostCapabilities,
    tabs: Arc<Mutex<HashMap<TabId, String>>>,
    closed: Arc<Mutex<Vec<TabId>>>,
    notifications: Arc<Mutex<Vec<(String, String)>>>,
    event_tx: mpsc::UnboundedSender<HostEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>>,

    /// Configure close_tab to fail
    pub fail_close: Arc<Mutex<bool>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            capabilities: HostCapabilities::full(),
            tabs: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(Mutex::new(Vec::new())),
            notifications: Arc::new(Mutex::new(Vec::new())),
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
            fail_close: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_capabilities(mut self, caps: HostCapabilities) -> Self {
        self.capabilities = caps;
        self
    }

    /// Open a tab at `url` and emit the navigation event.
    pub fn open_tab(&self, tab_id: TabId, url: &str) {
        self.tabs.lock().unwrap().insert(tab_id, url.to_string());
        let _ = self.event_tx.send(HostEvent::TabUpdated {
            tab_id,
            url: url.to_string(),
        });
    }

    /// Navigate an existing tab (same event as opening).
    pub fn navigate(&self, tab_id: TabId, url: &str) {
        self.open_tab(tab_id, url);
    }

    /// User closes a tab: drop it and emit the removal event.
    pub fn remove_tab(&self, tab_id: TabId) {
        self.tabs.lock().unwrap().remove(&tab_id);
        let _ = self.event_tx.send(HostEvent::TabRemoved { tab_id });
    }

    /// Focus a tab.
    pub fn activate_tab(&self, tab_id: TabId) {
        let _ = self.event_tx.send(HostEvent::TabActivated { tab_id });
    }

    /// Tab ids currently open in the mock browser.
    pub fn open_tabs(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self.tabs.lock().unwrap().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Tabs closed through `close_tab`, in order.
    pub fn closed_tabs(&self) -> Vec<TabId> {
        self.closed.lock().unwrap().clone()
    }

    /// Notifications raised, as (id, message) pairs.
    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserHost for MockBrowser {
    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    async fn tab_exists(&self, tab_id: TabId) -> HostResult<bool> {
        Ok(self.tabs.lock().unwrap().contains_key(&tab_id))
    }

    async fn close_tab(&self, tab_id: TabId) -> HostResult<()> {
        if *self.fail_close.lock().unwrap() {
            return Err(HostError::Internal("Mock close failure".into()));
        }

        let existed = self.tabs.lock().unwrap().remove(&tab_id).is_some();
        if !existed {
            return Err(HostError::TabNotFound(tab_id));
        }

        self.closed.lock().unwrap().push(tab_id);
        // A real browser reports the closure back through the event stream.
        let _ = self.event_tx.send(HostEvent::TabRemoved { tab_id });
        Ok(())
    }

    async fn notify(
        &self,
        notification_id: &str,
        _title: &str,
        message: &str,
    ) -> HostResult<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((notification_id.to_string(), message.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}
