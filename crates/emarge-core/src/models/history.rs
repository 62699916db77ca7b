//! Append-only session status history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::SessionStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    pub previous: SessionStatus,
    pub status: SessionStatus,
    /// Identifier of the administrator (or system job) that applied the change.
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
    /// Session version produced by this change; breaks timestamp ties.
    pub sequence: u64,
}

/// A status change and its history entry, to be committed as one unit.
///
/// The storage layer must apply the change only if the session is still at
/// `expected_version` with status `entry.previous`, and must write the
/// history entry in the same transaction.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub expected_version: u64,
    pub entry: StatusHistoryEntry,
}
