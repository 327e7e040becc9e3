//! SQLite-based store implementation
//!
//! Tracker state lives in a single key/value table using the legacy key
//! names; each value is a JSON-encoded field. Field-level decoding failures
//! are logged and replaced with that field's default so partial corruption
//! never blocks a load.

use chrono::{DateTime, Local};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::{AuditEvent, PersistedState, Store, StoreResult, keys};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Tracker state (one row per field, legacy key names)
            CREATE TABLE IF NOT EXISTS tracker_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    /// Read and decode one field; `None` when the key is missing or the
    /// stored value no longer parses.
    fn get_field<T: DeserializeOwned>(conn: &Connection, key: &str) -> Option<T> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM tracker_state WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten();

        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Malformed persisted field, using default");
                None
            }
        }
    }

    fn put_field<T: Serialize>(conn: &Connection, key: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string(value)?;
        conn.execute(
            r#"
            INSERT INTO tracker_state (key, value)
            VALUES (?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value
            "#,
            params![key, json],
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn load_state(&self) -> StoreResult<PersistedState> {
        let conn = self.conn.lock().unwrap();
        let defaults = PersistedState::default();

        let state = PersistedState {
            tracked_tabs: Self::get_field(&conn, keys::TRACKED_TABS)
                .unwrap_or(defaults.tracked_tabs),
            total_time_ms: Self::get_field(&conn, keys::TOTAL_TIME)
                .unwrap_or(defaults.total_time_ms),
            time_limit_minutes: Self::get_field(&conn, keys::TIME_LIMIT)
                .unwrap_or(defaults.time_limit_minutes),
            blocked_until_ms: Self::get_field(&conn, keys::BLOCKED_UNTIL)
                .unwrap_or(defaults.blocked_until_ms),
            cooldown_started: Self::get_field(&conn, keys::COOLDOWN_STARTED)
                .unwrap_or(defaults.cooldown_started),
            daily_opens_limit: Self::get_field(&conn, keys::DAILY_OPENS_LIMIT)
                .unwrap_or(defaults.daily_opens_limit),
            daily_open_count: Self::get_field(&conn, keys::DAILY_OPEN_COUNT)
                .unwrap_or(defaults.daily_open_count),
            daily_reset_at_ms: Self::get_field(&conn, keys::DAILY_RESET_AT)
                .unwrap_or(defaults.daily_reset_at_ms),
        };

        Ok(state)
    }

    fn save_state(&self, state: &PersistedState) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        Self::put_field(&conn, keys::TRACKED_TABS, &state.tracked_tabs)?;
        Self::put_field(&conn, keys::TOTAL_TIME, &state.total_time_ms)?;
        Self::put_field(&conn, keys::TIME_LIMIT, &state.time_limit_minutes)?;
        Self::put_field(&conn, keys::BLOCKED_UNTIL, &state.blocked_until_ms)?;
        Self::put_field(&conn, keys::COOLDOWN_STARTED, &state.cooldown_started)?;
        Self::put_field(&conn, keys::DAILY_OPENS_LIMIT, &state.daily_opens_limit)?;
        Self::put_field(&conn, keys::DAILY_OPEN_COUNT, &state.daily_open_count)?;
        Self::put_field(&conn, keys::DAILY_RESET_AT, &state.daily_reset_at_ms)?;

        debug!("Tracker state saved");
        Ok(())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| Local::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
