//! Database-specific error types and conversions.

use emarge_core::error::AttendanceError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Stored value could not be decoded: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    Duplicate { entity: String },

    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Signature window {id} is not open")]
    WindowClosed { id: String },
}

/// Message thrown inside transactions whose guard no longer holds.
pub(crate) const STALE_GUARD: &str = "emarge: stale guard";

/// Thrown when a window open finds its session no longer Active.
pub(crate) const SESSION_INACTIVE: &str = "emarge: session not active";

/// Thrown when a signature write finds its window no longer Open.
pub(crate) const WINDOW_NOT_OPEN: &str = "emarge: window not open";

/// Thrown when a signature write finds its slot already taken.
pub(crate) const SLOT_TAKEN: &str = "emarge: slot taken";

impl DbError {
    /// Classify a failed statement from `Response::check`.
    pub(crate) fn from_check(err: surrealdb::Error, entity: &str) -> Self {
        let message = err.to_string();
        if message.contains("already contains") || message.contains("already exists") {
            DbError::Duplicate {
                entity: entity.into(),
            }
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

/// Whether a failure means a concurrent writer got there first: our own
/// guard fired, or the engine aborted the transaction on a write conflict.
pub(crate) fn is_conflict(err: &surrealdb::Error) -> bool {
    is_conflict_message(&err.to_string())
}

pub(crate) fn is_conflict_message(message: &str) -> bool {
    message.contains(STALE_GUARD)
        || message.contains("failed transaction")
        || message.contains("conflict")
        || message.contains("can be retried")
}

/// Messages of every failed statement in a transaction response, in
/// statement order, or `None` when all of them succeeded.
///
/// Statements rolled back alongside a `THROW` report a generic failure, so
/// the thrown marker has to be looked for across all of them.
pub(crate) fn transaction_failure(
    response: Result<surrealdb::IndexedResults, surrealdb::Error>,
) -> Option<String> {
    let mut response = match response {
        Ok(response) => response,
        Err(e) => return Some(e.to_string()),
    };
    let mut errors: Vec<(usize, surrealdb::Error)> = response.take_errors().into_iter().collect();
    if errors.is_empty() {
        return None;
    }
    errors.sort_by_key(|(index, _)| *index);
    Some(
        errors
            .into_iter()
            .map(|(_, e)| e.to_string())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

impl From<DbError> for AttendanceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AttendanceError::NotFound { entity, id },
            DbError::Duplicate { entity } => AttendanceError::AlreadyExists { entity },
            DbError::Conflict { entity, id } => AttendanceError::Conflict { entity, id },
            DbError::WindowClosed { .. } => AttendanceError::WindowClosed,
            other => AttendanceError::Database(other.to_string()),
        }
    }
}
