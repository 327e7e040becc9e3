//! The gate engine state machine

use chrono::{DateTime, Duration, Local};
use std::sync::Arc;
use tabwarden_api::{BlockCause, TimerInfo};
use tabwarden_store::{AuditEvent, AuditEventType, PersistedState, Store};
use tabwarden_util::{TabId, from_epoch_ms, next_local_midnight, to_epoch_ms};
use tracing::{debug, info, warn};

use crate::{
    CoreEvent, DailyQuota, EngineAction, Outcome, SessionTimer, TabRegistry, is_tracked_url,
};

/// Fixed cooldown after a session ends or the budget is exhausted.
const COOLDOWN_MINUTES: i64 = 60;

/// Valid range for the user-settable session budget, in minutes.
pub const TIME_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=1440;

/// The gate engine: owns all tracker state and decides every transition.
///
/// One instance is driven by a single event flow (navigation, removal,
/// activation, periodic tick, limit changes); each handler takes the
/// current time explicitly, mutates state, persists, and returns the
/// host-side work and broadcast events the transition produced.
pub struct GateEngine {
    registry: TabRegistry,
    timer: SessionTimer,
    limit_minutes: u32,
    blocked_until: Option<DateTime<Local>>,
    cooldown_started: bool,
    quota: DailyQuota,
    /// Why the current block exists. Not persisted; after a restart it is
    /// re-derived from `cooldown_started`.
    block_cause: Option<BlockCause>,
    store: Arc<dyn Store>,
}

impl GateEngine {
    /// Reconcile engine state from the store.
    ///
    /// Every field falls back to its default independently; an unreadable
    /// store yields a fully-default engine rather than a startup failure.
    pub fn load(store: Arc<dyn Store>, now: DateTime<Local>) -> Self {
        let state = match store.load_state() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Failed to load tracker state, starting from defaults");
                PersistedState::default()
            }
        };

        let limit_minutes = if TIME_LIMIT_RANGE.contains(&state.time_limit_minutes) {
            state.time_limit_minutes
        } else {
            warn!(
                stored = state.time_limit_minutes,
                "Persisted time limit out of range, using default"
            );
            PersistedState::default().time_limit_minutes
        };

        let blocked_until = if state.blocked_until_ms > 0 {
            from_epoch_ms(state.blocked_until_ms)
        } else {
            None
        };

        let reset_at = if state.daily_reset_at_ms > 0 {
            from_epoch_ms(state.daily_reset_at_ms)
        } else {
            None
        };

        let engine = Self {
            registry: TabRegistry::from_map(state.tracked_tabs),
            timer: SessionTimer::from_total(state.total_time_ms, now),
            limit_minutes,
            blocked_until,
            cooldown_started: state.cooldown_started,
            quota: DailyQuota::from_parts(state.daily_open_count, reset_at, now),
            block_cause: None,
            store,
        };

        info!(
            tracked_tabs = engine.registry.len(),
            total_ms = engine.timer.total_ms(),
            limit_minutes = engine.limit_minutes,
            blocked = engine.is_blocked(now),
            daily_open_count = engine.quota.open_count(),
            "Gate engine initialized"
        );

        engine
    }

    // ------------------------------------------------------------------
    // Event handlers
    // ------------------------------------------------------------------

    /// Periodic tick: the sole driver of progress when no tab events occur.
    pub fn on_tick(&mut self, now: DateTime<Local>) -> Outcome {
        let mut out = Outcome::default();

        self.checkpoint(now);
        self.roll_quota_if_due(now, &mut out);
        self.clear_block_if_lapsed(now, &mut out);
        self.enforce_session_limit(now, &mut out);

        self.persist();
        out
    }

    /// A tab committed a navigation.
    pub fn on_navigation(&mut self, tab_id: TabId, url: &str, now: DateTime<Local>) -> Outcome {
        let mut out = Outcome::default();

        self.checkpoint(now);

        if is_tracked_url(url) {
            if self.is_blocked(now) {
                // Denied: close immediately, bypassing registry insertion.
                let cause = self.current_block_cause();
                debug!(%tab_id, ?cause, "Tracked-site navigation while blocked, closing tab");
                let _ = self.store.append_audit(AuditEvent::new(
                    AuditEventType::TabForceClosed { tab_id, cause },
                ));
                out.actions.push(EngineAction::CloseTab { tab_id, cause });
            } else if !self.registry.contains(tab_id) {
                if self.registry.is_empty() && !self.try_begin_session(tab_id, now, &mut out) {
                    // Quota exhausted; the tab was never inserted.
                    self.persist();
                    return out;
                }
                self.registry.insert(tab_id);
                debug!(%tab_id, tracked = self.registry.len(), "Tab tracked");
            }
        } else if self.registry.remove(tab_id) {
            debug!(%tab_id, tracked = self.registry.len(), "Tab navigated away");
            self.handle_session_end(now, &mut out);
        }

        self.enforce_session_limit(now, &mut out);

        self.persist();
        out
    }

    /// A tab was closed.
    pub fn on_removed(&mut self, tab_id: TabId, now: DateTime<Local>) -> Outcome {
        let mut out = Outcome::default();

        self.checkpoint(now);

        if self.registry.remove(tab_id) {
            debug!(%tab_id, tracked = self.registry.len(), "Tracked tab removed");
            self.handle_session_end(now, &mut out);
        }

        self.persist();
        out
    }

    /// A tab gained focus: a checkpoint trigger, nothing more.
    pub fn on_activated(&mut self, _tab_id: TabId, now: DateTime<Local>) -> Outcome {
        let mut out = Outcome::default();

        self.checkpoint(now);
        self.enforce_session_limit(now, &mut out);

        self.persist();
        out
    }

    /// Change the session budget. The caller has already validated the
    /// range; the new limit applies from the next checkpoint onward and
    /// does not reset an in-progress session.
    pub fn set_time_limit(&mut self, minutes: u32, _now: DateTime<Local>) -> Outcome {
        debug_assert!(TIME_LIMIT_RANGE.contains(&minutes));

        self.limit_minutes = minutes;
        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::TimeLimitChanged { minutes }));
        info!(minutes, "Session time budget changed");

        self.persist();
        Outcome {
            actions: Vec::new(),
            events: vec![CoreEvent::TimeLimitChanged { minutes }],
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether access to the tracked site is denied right now.
    pub fn is_blocked(&self, now: DateTime<Local>) -> bool {
        match self.blocked_until {
            Some(until) => now < until,
            None => false,
        }
    }

    pub fn blocked_until(&self) -> Option<DateTime<Local>> {
        self.blocked_until
    }

    pub fn tracked_tab_count(&self) -> usize {
        self.registry.len()
    }

    /// Status snapshot for display clients. Pure read: the total is
    /// projected to `now` without mutating the timer.
    pub fn timer_info(&self, now: DateTime<Local>) -> TimerInfo {
        TimerInfo {
            total_time_ms: self
                .timer
                .projected_total_ms(now, !self.registry.is_empty()),
            time_limit_minutes: self.limit_minutes,
            tracked_tabs: self.registry.as_map().clone(),
            blocked_until_ms: self.blocked_until.map(to_epoch_ms).unwrap_or(0),
            is_blocked: self.is_blocked(now),
            daily_opens_limit: self.quota.limit(),
            daily_open_count: self.quota.open_count(),
            daily_reset_at_ms: to_epoch_ms(self.quota.reset_at()),
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn checkpoint(&mut self, now: DateTime<Local>) {
        self.timer.checkpoint(now, !self.registry.is_empty());
    }

    /// Count a session start against the daily quota. Returns `false`
    /// (and emits the block) when the quota is exhausted, in which case
    /// the caller must not insert the tab.
    fn try_begin_session(
        &mut self,
        tab_id: TabId,
        now: DateTime<Local>,
        out: &mut Outcome,
    ) -> bool {
        let count = self.quota.record_open();
        if !self.quota.exceeded() {
            debug!(count, "Session start counted against daily quota");
            return true;
        }

        // Block until at least the next midnight, never shortening an
        // existing later deadline.
        let midnight = next_local_midnight(now);
        let until = match self.blocked_until {
            Some(existing) if existing > midnight => existing,
            _ => midnight,
        };
        self.blocked_until = Some(until);
        self.block_cause = Some(BlockCause::DailyQuota);

        info!(count, %until, "Daily open quota exceeded, blocking until midnight");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::AccessBlocked {
            blocked_until_ms: to_epoch_ms(until),
            cause: BlockCause::DailyQuota,
        }));
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::TabForceClosed {
            tab_id,
            cause: BlockCause::DailyQuota,
        }));

        out.actions.push(EngineAction::CloseTab {
            tab_id,
            cause: BlockCause::DailyQuota,
        });
        out.actions.push(EngineAction::Notify {
            blocked_until: until,
        });
        out.events.push(CoreEvent::AccessBlocked {
            blocked_until: until,
            cause: BlockCause::DailyQuota,
        });

        false
    }

    /// The registry just went empty through user action. Ending a session
    /// with non-zero elapsed time starts the cooldown exactly as a budget
    /// breach would, so closing and reopening is not a bypass.
    fn handle_session_end(&mut self, now: DateTime<Local>, out: &mut Outcome) {
        if !self.registry.is_empty() || self.timer.total_ms() == 0 || self.is_blocked(now) {
            return;
        }

        self.timer.reset(now);
        self.enter_cooldown(now, BlockCause::SessionEnded, out);
    }

    /// Budget exhausted: close everything, clear the session, block.
    fn enforce_session_limit(&mut self, now: DateTime<Local>, out: &mut Outcome) {
        let limit_ms = u64::from(self.limit_minutes) * 60_000;
        if self.timer.total_ms() < limit_ms || self.is_blocked(now) {
            return;
        }

        info!(
            total_ms = self.timer.total_ms(),
            limit_minutes = self.limit_minutes,
            "Session time budget exhausted"
        );

        for tab_id in self.registry.tab_ids() {
            let _ = self.store.append_audit(AuditEvent::new(
                AuditEventType::TabForceClosed {
                    tab_id,
                    cause: BlockCause::SessionLimit,
                },
            ));
            out.actions.push(EngineAction::CloseTab {
                tab_id,
                cause: BlockCause::SessionLimit,
            });
        }
        self.registry.clear();
        self.timer.reset(now);

        self.enter_cooldown(now, BlockCause::SessionLimit, out);
    }

    /// One-way entry into the cooldown block. Never called while a block
    /// is active, so an existing cooldown is never extended or duplicated.
    fn enter_cooldown(&mut self, now: DateTime<Local>, cause: BlockCause, out: &mut Outcome) {
        let until = now + Duration::minutes(COOLDOWN_MINUTES);
        self.blocked_until = Some(until);
        self.cooldown_started = true;
        self.block_cause = Some(cause);

        info!(%until, ?cause, "Cooldown started");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::AccessBlocked {
            blocked_until_ms: to_epoch_ms(until),
            cause,
        }));

        out.actions.push(EngineAction::Notify {
            blocked_until: until,
        });
        out.events.push(CoreEvent::AccessBlocked {
            blocked_until: until,
            cause,
        });
    }

    /// A lapsed block (cooldown or quota) clears and re-arms tracking
    /// cleanly rather than resuming a stale partial session.
    fn clear_block_if_lapsed(&mut self, now: DateTime<Local>, out: &mut Outcome) {
        let Some(until) = self.blocked_until else {
            return;
        };
        if now < until {
            return;
        }

        self.blocked_until = None;
        self.cooldown_started = false;
        self.block_cause = None;
        self.timer.reset(now);

        info!("Block lapsed, tracking re-armed");
        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::AccessRestored));
        out.events.push(CoreEvent::AccessRestored);
    }

    fn roll_quota_if_due(&mut self, now: DateTime<Local>, out: &mut Outcome) {
        if !self.quota.rollover_due(now) {
            return;
        }

        self.quota.rollover(now);
        let reset_at = self.quota.reset_at();

        info!(%reset_at, "Daily quota reset");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::QuotaRollover {
            reset_at_ms: to_epoch_ms(reset_at),
        }));
        out.events.push(CoreEvent::QuotaRollover { reset_at });
    }

    fn current_block_cause(&self) -> BlockCause {
        self.block_cause.unwrap_or(if self.cooldown_started {
            BlockCause::SessionEnded
        } else {
            BlockCause::DailyQuota
        })
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn to_persisted(&self) -> PersistedState {
        PersistedState {
            tracked_tabs: self.registry.as_map().clone(),
            total_time_ms: self.timer.total_ms(),
            time_limit_minutes: self.limit_minutes,
            blocked_until_ms: self.blocked_until.map(to_epoch_ms).unwrap_or(0),
            cooldown_started: self.cooldown_started,
            daily_opens_limit: self.quota.limit(),
            daily_open_count: self.quota.open_count(),
            daily_reset_at_ms: to_epoch_ms(self.quota.reset_at()),
        }
    }

    /// Write-through after every mutation. A failed write is logged and
    /// otherwise ignored: in-memory state stays authoritative for the
    /// remainder of the process lifetime.
    fn persist(&self) {
        if let Err(e) = self.store.save_state(&self.to_persisted()) {
            warn!(error = %e, "Failed to persist tracker state");
        }
    }
}
