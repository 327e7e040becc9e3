//! The extension bridge: a [`BrowserHost`] over native messaging

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tabwarden_host_api::{BrowserHost, HostCapabilities, HostError, HostEvent, HostResult};
use tabwarden_util::TabId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{ExtEvent, ExtMessage, HostOp, read_message, write_message};

/// How long to wait for the extension to answer a tab query.
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Browser host adapter bridged to the companion extension.
///
/// A reader task turns inbound frames into [`HostEvent`]s and resolves
/// pending tab queries; a writer task drains outbound operations. Closes
/// and notifications are fire-and-forget; only tab queries wait for a
/// correlated reply, bounded by a timeout.
pub struct ExtensionBridge {
    capabilities: HostCapabilities,
    op_tx: mpsc::UnboundedSender<HostOp>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<bool>>>>,
    next_query_id: AtomicU64,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>>,
    connected: Arc<AtomicBool>,
    query_timeout: Duration,
}

impl ExtensionBridge {
    /// Bridge over arbitrary transports. Production uses stdio
    /// ([`ExtensionBridge::over_stdio`]); tests use an in-memory duplex.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<bool>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        Self::spawn_reader(reader, event_tx, pending.clone(), connected.clone());
        Self::spawn_writer(writer, op_rx, connected.clone());

        Self {
            capabilities: HostCapabilities::full(),
            op_tx,
            pending,
            next_query_id: AtomicU64::new(1),
            event_rx: Arc::new(Mutex::new(Some(event_rx))),
            connected,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Bridge over the process stdio, as launched by the browser.
    pub fn over_stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Override the tab-query timeout (tests use a short one).
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    fn spawn_reader<R>(
        mut reader: R,
        event_tx: mpsc::UnboundedSender<HostEvent>,
        pending: Arc<Mutex<HashMap<u64, oneshot::Sender<bool>>>>,
        connected: Arc<AtomicBool>,
    ) where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            loop {
                match read_message::<_, ExtMessage>(&mut reader).await {
                    Ok(Some(ExtMessage::Event(event))) => {
                        let host_event = match event {
                            ExtEvent::TabUpdated { tab_id, url } => {
                                HostEvent::TabUpdated { tab_id, url }
                            }
                            ExtEvent::TabRemoved { tab_id } => HostEvent::TabRemoved { tab_id },
                            ExtEvent::TabActivated { tab_id } => {
                                HostEvent::TabActivated { tab_id }
                            }
                        };
                        if event_tx.send(host_event).is_err() {
                            break;
                        }
                    }
                    Ok(Some(ExtMessage::Reply(envelope))) => {
                        let waiter = pending.lock().unwrap().remove(&envelope.reply.id);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(envelope.reply.exists);
                            }
                            None => {
                                // Reply raced a timed-out query
                                debug!(id = envelope.reply.id, "Unmatched query reply");
                            }
                        }
                    }
                    Ok(None) => {
                        info!("Extension closed the message stream");
                        break;
                    }
                    Err(e) => {
                        // A framing error desynchronizes the stream; there
                        // is no safe way to resume mid-stream.
                        warn!(error = %e, "Native messaging read failed, disconnecting");
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
        });
    }

    fn spawn_writer<W>(
        mut writer: W,
        mut op_rx: mpsc::UnboundedReceiver<HostOp>,
        connected: Arc<AtomicBool>,
    ) where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(op) = op_rx.recv().await {
                if let Err(e) = write_message(&mut writer, &op).await {
                    warn!(error = %e, "Native messaging write failed, disconnecting");
                    break;
                }
            }
            connected.store(false, Ordering::SeqCst);
        });
    }

    fn send_op(&self, op: HostOp) -> HostResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(HostError::NotConnected);
        }
        self.op_tx.send(op).map_err(|_| HostError::NotConnected)
    }
}

#[async_trait]
impl BrowserHost for ExtensionBridge {
    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    async fn tab_exists(&self, tab_id: TabId) -> HostResult<bool> {
        let id = self.next_query_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        if let Err(e) = self.send_op(HostOp::QueryTab { id, tab_id }) {
            self.pending.lock().unwrap().remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.query_timeout, rx).await {
            Ok(Ok(exists)) => Ok(exists),
            Ok(Err(_)) => {
                // Reader dropped the sender: stream went down
                Err(HostError::NotConnected)
            }
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(HostError::Timeout)
            }
        }
    }

    async fn close_tab(&self, tab_id: TabId) -> HostResult<()> {
        self.send_op(HostOp::CloseTab { tab_id })
    }

    async fn notify(
        &self,
        notification_id: &str,
        title: &str,
        message: &str,
    ) -> HostResult<()> {
        self.send_op(HostOp::Notify {
            notification_id: notification_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
        })
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }

    fn is_healthy(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueryReply, ReplyEnvelope, read_message as read_msg, write_message as write_msg};
    use tokio::io::{ReadHalf, WriteHalf, split};

    /// Build a bridge wired to an in-memory "extension" endpoint.
    fn bridged() -> (
        ExtensionBridge,
        ReadHalf<tokio::io::DuplexStream>,
        WriteHalf<tokio::io::DuplexStream>,
    ) {
        let (daemon_side, ext_side) = tokio::io::duplex(64 * 1024);
        let (daemon_read, daemon_write) = split(daemon_side);
        let (ext_read, ext_write) = split(ext_side);

        let bridge = ExtensionBridge::new(daemon_read, daemon_write)
            .with_query_timeout(Duration::from_millis(200));
        (bridge, ext_read, ext_write)
    }

    #[tokio::test]
    async fn forwards_tab_events() {
        let (bridge, _ext_read, mut ext_write) = bridged();
        let mut events = bridge.subscribe();

        write_msg(
            &mut ext_write,
            &ExtMessage::Event(ExtEvent::TabUpdated {
                tab_id: TabId::new(3),
                url: "https://facebook.com/".into(),
            }),
        )
        .await
        .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            HostEvent::TabUpdated {
                tab_id: TabId::new(3),
                url: "https://facebook.com/".into(),
            }
        );
    }

    #[tokio::test]
    async fn tab_query_round_trip() {
        let (bridge, mut ext_read, mut ext_write) = bridged();
        let _events = bridge.subscribe();

        // The "extension": answer the first query affirmatively
        let responder = tokio::spawn(async move {
            let op: HostOp = read_msg(&mut ext_read).await.unwrap().unwrap();
            let HostOp::QueryTab { id, tab_id } = op else {
                panic!("expected a tab query, got {op:?}");
            };
            assert_eq!(tab_id, TabId::new(12));

            write_msg(
                &mut ext_write,
                &ExtMessage::Reply(ReplyEnvelope {
                    reply: QueryReply { id, exists: true },
                }),
            )
            .await
            .unwrap();
        });

        let exists = bridge.tab_exists(TabId::new(12)).await.unwrap();
        assert!(exists);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn unanswered_query_times_out() {
        let (bridge, _ext_read, _ext_write) = bridged();
        let _events = bridge.subscribe();

        let result = bridge.tab_exists(TabId::new(1)).await;
        assert!(matches!(result, Err(HostError::Timeout)));

        // The pending entry was reaped
        assert!(bridge.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn close_and_notify_are_sent() {
        let (bridge, mut ext_read, _ext_write) = bridged();
        let _events = bridge.subscribe();

        bridge.close_tab(TabId::new(9)).await.unwrap();
        bridge
            .notify("tabwarden-blocked", "Time's up", "Blocked for 60 minutes.")
            .await
            .unwrap();

        let op: HostOp = read_msg(&mut ext_read).await.unwrap().unwrap();
        assert_eq!(
            op,
            HostOp::CloseTab {
                tab_id: TabId::new(9)
            }
        );

        let op: HostOp = read_msg(&mut ext_read).await.unwrap().unwrap();
        assert!(matches!(op, HostOp::Notify { .. }));
    }

    #[tokio::test]
    async fn disconnect_is_observed() {
        let (bridge, ext_read, ext_write) = bridged();
        let _events = bridge.subscribe();
        assert!(bridge.is_healthy());

        drop(ext_read);
        drop(ext_write);

        // Reader task notices EOF shortly after
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!bridge.is_healthy());
    }
}
