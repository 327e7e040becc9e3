//! Store trait definitions

use crate::{AuditEvent, PersistedState, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Tracker state

    /// Load the full tracker state.
    ///
    /// Missing or malformed fields fall back to their defaults without
    /// failing the load; only infrastructure errors (e.g. the database
    /// cannot be read at all) are reported.
    fn load_state(&self) -> StoreResult<PersistedState>;

    /// Write the full tracker state.
    fn save_state(&self, state: &PersistedState) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
