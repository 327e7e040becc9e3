//! Integration tests for tabwardend
//!
//! These drive the full enforcement path — mock browser events into the
//! gate engine, engine actions back into the browser through the executor —
//! plus the IPC request/response and event-broadcast paths.

use chrono::{DateTime, Duration, Local, TimeZone};
use std::sync::Arc;
use tabwarden_api::{Command, Event, EventPayload, Request, Response, ResponsePayload, ResponseResult};
use tabwarden_core::{GateEngine, TabActionExecutor};
use tabwarden_host_api::{BrowserHost, HostEvent, MockBrowser};
use tabwarden_ipc::{IpcClient, IpcServer, ServerMessage};
use tabwarden_store::SqliteStore;
use tabwarden_util::{TabId, next_local_midnight, to_epoch_ms};
use tokio::sync::mpsc;

const FB: &str = "https://www.facebook.com/feed";

fn t0() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

/// Mock browser + engine + executor wired the way the daemon wires them.
struct Harness {
    browser: Arc<MockBrowser>,
    events: mpsc::UnboundedReceiver<HostEvent>,
    engine: GateEngine,
    executor: TabActionExecutor,
    store: Arc<SqliteStore>,
}

impl Harness {
    fn new() -> Self {
        let browser = Arc::new(MockBrowser::new());
        let events = browser.subscribe();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = GateEngine::load(store.clone(), t0());
        let executor = TabActionExecutor::new(browser.clone());

        Self {
            browser,
            events,
            engine,
            executor,
            store,
        }
    }

    /// Feed every queued browser event through the engine at `now`,
    /// executing the resulting actions (which may queue further events).
    async fn pump(&mut self, now: DateTime<Local>) {
        while let Ok(event) = self.events.try_recv() {
            let out = match event {
                HostEvent::TabUpdated { tab_id, url } => {
                    self.engine.on_navigation(tab_id, &url, now)
                }
                HostEvent::TabRemoved { tab_id } => self.engine.on_removed(tab_id, now),
                HostEvent::TabActivated { tab_id } => self.engine.on_activated(tab_id, now),
            };
            self.executor.execute(out.actions, now).await;
        }
    }

    async fn tick(&mut self, now: DateTime<Local>) {
        let out = self.engine.on_tick(now);
        self.executor.execute(out.actions, now).await;
        // Absorb the removal events our own closes produced
        self.pump(now).await;
    }
}

#[tokio::test]
async fn budget_breach_closes_tabs_in_browser() {
    let mut h = Harness::new();

    h.browser.open_tab(TabId::new(1), FB);
    h.browser.open_tab(TabId::new(2), FB);
    h.pump(t0()).await;
    assert_eq!(h.engine.tracked_tab_count(), 2);

    // Default budget is one minute
    h.tick(t0() + Duration::seconds(61)).await;

    assert_eq!(h.browser.closed_tabs(), vec![TabId::new(1), TabId::new(2)]);
    assert!(h.browser.open_tabs().is_empty());
    assert_eq!(h.engine.tracked_tab_count(), 0);
    assert!(h.engine.is_blocked(t0() + Duration::seconds(61)));

    let notes = h.browser.notifications();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].1.contains("60 minutes"));
}

#[tokio::test]
async fn reopening_while_blocked_is_closed() {
    let mut h = Harness::new();

    h.browser.open_tab(TabId::new(1), FB);
    h.pump(t0()).await;
    h.tick(t0() + Duration::seconds(61)).await; // blocked now

    h.browser.open_tab(TabId::new(3), FB);
    h.pump(t0() + Duration::seconds(90)).await;

    assert!(h.browser.closed_tabs().contains(&TabId::new(3)));
    assert!(h.browser.open_tabs().is_empty());
    assert_eq!(h.engine.tracked_tab_count(), 0);
}

#[tokio::test]
async fn cooldown_expiry_allows_browsing_again() {
    let mut h = Harness::new();

    h.browser.open_tab(TabId::new(1), FB);
    h.pump(t0()).await;
    h.tick(t0() + Duration::seconds(61)).await;

    // One hour later the block lapses
    let after = t0() + Duration::seconds(61) + Duration::hours(1) + Duration::seconds(1);
    h.tick(after).await;
    assert!(!h.engine.is_blocked(after));

    h.browser.open_tab(TabId::new(4), FB);
    h.pump(after + Duration::seconds(1)).await;

    assert_eq!(h.engine.tracked_tab_count(), 1);
    assert_eq!(h.browser.open_tabs(), vec![TabId::new(4)]);
}

#[tokio::test]
async fn voluntary_close_blocks_reopening() {
    let mut h = Harness::new();

    h.browser.open_tab(TabId::new(1), FB);
    h.pump(t0()).await;

    // User closes the tab after 30 seconds of browsing
    h.browser.remove_tab(TabId::new(1));
    h.pump(t0() + Duration::seconds(30)).await;

    assert!(h.engine.is_blocked(t0() + Duration::seconds(31)));

    // Reopening immediately is denied
    h.browser.open_tab(TabId::new(2), FB);
    h.pump(t0() + Duration::seconds(35)).await;
    assert!(h.browser.closed_tabs().contains(&TabId::new(2)));
}

#[tokio::test]
async fn daily_quota_exhaustion_end_to_end() {
    let mut h = Harness::new();
    let tab = TabId::new(1);

    // Ten instant open/close cycles: allowed, no cooldown accrues
    for i in 0..10 {
        let at = t0() + Duration::seconds(i);
        h.browser.open_tab(tab, FB);
        h.pump(at).await;
        h.browser.remove_tab(tab);
        h.pump(at).await;
    }
    let info = h.engine.timer_info(t0() + Duration::seconds(10));
    assert_eq!(info.daily_open_count, 10);
    assert!(!info.is_blocked);

    // The eleventh open is closed on the spot and blocks until midnight
    h.browser.open_tab(tab, FB);
    h.pump(t0() + Duration::seconds(20)).await;

    assert!(h.browser.closed_tabs().contains(&tab));
    let info = h.engine.timer_info(t0() + Duration::seconds(20));
    assert_eq!(info.daily_open_count, 11);
    assert!(info.is_blocked);
    assert_eq!(
        info.blocked_until_ms,
        to_epoch_ms(next_local_midnight(t0() + Duration::seconds(20)))
    );

    // After midnight, everything resets
    let next_day = next_local_midnight(t0()) + Duration::seconds(5);
    h.tick(next_day).await;
    h.browser.open_tab(tab, FB);
    h.pump(next_day + Duration::seconds(1)).await;

    let info = h.engine.timer_info(next_day + Duration::seconds(1));
    assert_eq!(info.daily_open_count, 1);
    assert!(!info.is_blocked);
    assert_eq!(h.engine.tracked_tab_count(), 1);
}

#[tokio::test]
async fn restart_preserves_block_and_counts() {
    let mut h = Harness::new();

    h.browser.open_tab(TabId::new(1), FB);
    h.pump(t0()).await;
    h.tick(t0() + Duration::seconds(61)).await;

    let before = h.engine.timer_info(t0() + Duration::seconds(61));

    // "Restart": rebuild the engine from the same store
    let restored = GateEngine::load(h.store.clone(), t0() + Duration::seconds(61));
    let after = restored.timer_info(t0() + Duration::seconds(61));

    assert_eq!(after, before);
    assert!(restored.is_blocked(t0() + Duration::seconds(120)));
}

#[tokio::test]
async fn ipc_request_response_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("tabwardend.sock");

    let mut server = IpcServer::new(&socket_path);
    server.start().await.unwrap();
    let server = Arc::new(server);

    let mut messages = server.take_message_receiver().await.unwrap();

    let accept = server.clone();
    tokio::spawn(async move {
        let _ = accept.run().await;
    });

    // Minimal responder standing in for the daemon loop
    let responder = server.clone();
    tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            if let ServerMessage::Request { client_id, request } = msg {
                let response = match request.command {
                    Command::Ping => {
                        Response::success(request.request_id, ResponsePayload::Pong)
                    }
                    _ => continue,
                };
                let _ = responder.send_response(&client_id, response).await;
            }
        }
    });

    let mut client = IpcClient::connect(&socket_path).await.unwrap();
    let response = client.send(Command::Ping).await.unwrap();

    assert_eq!(response.request_id, 1);
    assert!(matches!(
        response.result,
        ResponseResult::Ok(ResponsePayload::Pong)
    ));
}

#[tokio::test]
async fn ipc_events_reach_subscribed_clients() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("tabwardend.sock");

    let mut server = IpcServer::new(&socket_path);
    server.start().await.unwrap();
    let server = Arc::new(server);

    let mut messages = server.take_message_receiver().await.unwrap();

    let accept = server.clone();
    tokio::spawn(async move {
        let _ = accept.run().await;
    });

    let responder = server.clone();
    tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            if let ServerMessage::Request { client_id, request } = msg {
                if matches!(request.command, Command::SubscribeEvents) {
                    let response = Response::success(
                        request.request_id,
                        ResponsePayload::Subscribed {
                            client_id: client_id.clone(),
                        },
                    );
                    let _ = responder.send_response(&client_id, response).await;
                }
            }
        }
    });

    let client = IpcClient::connect(&socket_path).await.unwrap();
    let mut events = client.subscribe().await.unwrap();

    server.broadcast_event(Event::new(EventPayload::TimeLimitChanged { minutes: 25 }));

    let event = events.next().await.unwrap();
    assert!(matches!(
        event.payload,
        EventPayload::TimeLimitChanged { minutes: 25 }
    ));
}

#[tokio::test]
async fn requests_serialize_cleanly_over_the_wire() {
    // The display layer builds these by hand; make sure the envelope the
    // client sends is exactly what the server parses.
    let request = Request::new(7, Command::SetTimeLimit { minutes: 90 });
    let json = serde_json::to_string(&request).unwrap();
    let parsed: Request = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.request_id, 7);
    assert!(matches!(
        parsed.command,
        Command::SetTimeLimit { minutes: 90 }
    ));
}
