//! tabwardend - The tabwarden background service
//!
//! This is the main entry point for the service. It wires together all the
//! components:
//! - Settings loading
//! - Store initialization and state reconciliation
//! - Gate engine
//! - Browser host (native-messaging bridge over stdio)
//! - IPC server for display clients
//!
//! The browser launches this binary as a native-messaging host: stdin and
//! stdout carry the extension protocol, so every log line goes to stderr.

mod settings;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use settings::load_settings;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tabwarden_api::{
    Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response, ResponsePayload,
};
use tabwarden_core::{CoreEvent, GateEngine, Outcome, TIME_LIMIT_RANGE, TabActionExecutor};
use tabwarden_host_api::{BrowserHost, HostEvent};
use tabwarden_host_ext::ExtensionBridge;
use tabwarden_ipc::{IpcServer, ServerMessage};
use tabwarden_store::{AuditEvent, AuditEventType, DAILY_OPENS_LIMIT, SqliteStore, Store};
use tabwarden_util::{ClientId, RateLimiter, default_config_path, to_epoch_ms};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// tabwardend - tracked-site time budget enforcement service
#[derive(Parser, Debug)]
#[command(name = "tabwardend")]
#[command(about = "Tracked-site time budget enforcement service", long_about = None)]
struct Args {
    /// Settings file path (default: ~/.config/tabwardend/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set TABWARDEN_SOCKET env var)
    #[arg(short, long, env = "TABWARDEN_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set TABWARDEN_DATA_DIR env var)
    #[arg(short, long, env = "TABWARDEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level override (falls back to the settings file, then "info")
    #[arg(short, long)]
    log_level: Option<String>,
}

/// Main service state
struct Service {
    engine: GateEngine,
    executor: TabActionExecutor,
    host: Arc<ExtensionBridge>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    rate_limiter: RateLimiter,
    tick_interval: Duration,
}

impl Service {
    async fn new(args: &Args, settings: settings::Settings) -> Result<Self> {
        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| settings.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("tabwardend.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        // The browser spawned us; stdio is the extension channel.
        let host = Arc::new(ExtensionBridge::over_stdio());

        // Reconcile state before the IPC server accepts its first client,
        // so no command can ever observe an unloaded engine.
        let engine = GateEngine::load(store.clone(), Local::now());

        let executor = TabActionExecutor::new(host.clone());

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        // Rate limiter: 30 requests per second per client
        let rate_limiter = RateLimiter::new(30, Duration::from_secs(1));

        Ok(Self {
            engine,
            executor,
            host,
            ipc: Arc::new(ipc),
            store,
            rate_limiter,
            tick_interval: Duration::from_secs(settings.tick_interval_secs),
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut host_events = self.host.subscribe();
        let mut ipc_messages = self
            .ipc
            .take_message_receiver()
            .await
            .expect("Message receiver should be available");

        // Spawn IPC accept task
        let ipc_accept = self.ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        // The periodic tick is the sole driver of progress when no tab
        // events arrive; it bounds enforcement latency.
        let mut tick_timer = tokio::time::interval(self.tick_interval);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Periodic enforcement checkpoint
                _ = tick_timer.tick() => {
                    let now = Local::now();
                    let out = self.engine.on_tick(now);
                    self.apply_outcome(out, now).await;
                }

                // Tab lifecycle events from the extension
                Some(host_event) = host_events.recv() => {
                    let now = Local::now();
                    let out = match host_event {
                        HostEvent::TabUpdated { tab_id, url } => {
                            self.engine.on_navigation(tab_id, &url, now)
                        }
                        HostEvent::TabRemoved { tab_id } => self.engine.on_removed(tab_id, now),
                        HostEvent::TabActivated { tab_id } => {
                            self.engine.on_activated(tab_id, now)
                        }
                    };
                    self.apply_outcome(out, now).await;
                }

                // Display-layer requests
                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        // Graceful shutdown
        info!("Shutting down tabwardend");

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        self.ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    /// Execute the host-side actions of one transition and broadcast its
    /// events. State was already mutated and persisted by the engine.
    async fn apply_outcome(&self, out: Outcome, now: chrono::DateTime<Local>) {
        if out.is_empty() {
            return;
        }

        let state_changed = !out.events.is_empty();

        self.executor.execute(out.actions, now).await;

        for event in out.events {
            let payload = match event {
                CoreEvent::AccessBlocked {
                    blocked_until,
                    cause,
                } => EventPayload::AccessBlocked {
                    blocked_until_ms: to_epoch_ms(blocked_until),
                    cause,
                },
                CoreEvent::AccessRestored => EventPayload::AccessRestored,
                CoreEvent::QuotaRollover { reset_at } => EventPayload::QuotaRollover {
                    reset_at_ms: to_epoch_ms(reset_at),
                },
                CoreEvent::TimeLimitChanged { minutes } => {
                    EventPayload::TimeLimitChanged { minutes }
                }
            };
            self.ipc.broadcast_event(Event::new(payload));
        }

        if state_changed {
            self.ipc.broadcast_event(Event::new(EventPayload::StateChanged(
                self.engine.timer_info(now),
            )));
        }
    }

    async fn handle_ipc_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                if !self.rate_limiter.check(&client_id) {
                    let response = Response::error(
                        request.request_id,
                        ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                    );
                    let _ = self.ipc.send_response(&client_id, response).await;
                    return;
                }

                let response = self
                    .handle_command(&client_id, request.request_id, request.command)
                    .await;

                let _ = self.ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, uid } => {
                debug!(client_id = %client_id, uid = ?uid, "Display client connected");
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Display client disconnected");
                self.rate_limiter.remove_client(&client_id);
            }
        }
    }

    async fn handle_command(
        &mut self,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> Response {
        let now = Local::now();

        match command {
            Command::GetTimerInfo => Response::success(
                request_id,
                ResponsePayload::TimerInfo(self.engine.timer_info(now)),
            ),

            Command::SetTimeLimit { minutes } => {
                // Boundary validation: the engine never sees an invalid value.
                if let Err(error) = validate_time_limit(minutes) {
                    return Response::error(request_id, error);
                }

                let out = self.engine.set_time_limit(minutes, now);
                self.apply_outcome(out, now).await;

                Response::success(request_id, ResponsePayload::LimitSet { minutes })
            }

            Command::SetDailyOpensLimit { limit } => {
                // The quota is fixed; acknowledge and report the real value.
                debug!(requested = limit, "Daily opens limit is fixed, ignoring change");
                Response::success(
                    request_id,
                    ResponsePayload::DailyOpensLimitSet {
                        limit: DAILY_OPENS_LIMIT,
                    },
                )
            }

            Command::SubscribeEvents => Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),

            Command::UnsubscribeEvents => {
                Response::success(request_id, ResponsePayload::Unsubscribed)
            }

            Command::GetHealth => {
                let health = HealthStatus {
                    live: true,
                    ready: true,
                    store_ok: self.store.is_healthy(),
                    host_ok: self.host.is_healthy(),
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }
}

/// Display-boundary validation for the session budget.
fn validate_time_limit(minutes: u32) -> Result<(), ErrorInfo> {
    if TIME_LIMIT_RANGE.contains(&minutes) {
        Ok(())
    } else {
        Err(ErrorInfo::new(
            ErrorCode::InvalidLimit,
            format!(
                "Time limit must be between 1 and 1440 minutes, got {}",
                minutes
            ),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = load_settings(&args.config)
        .with_context(|| format!("Failed to load settings from {:?}", args.config))?;

    // stdout belongs to the native-messaging channel; log to stderr only.
    let default_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| settings.log_level.clone());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "tabwardend starting");

    let service = Service::new(&args, settings).await?;
    service.run().await
}
