//! Error types for the attendance system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Invalid transition: cannot {action} from {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Signature window is closed")]
    WindowClosed,

    /// Deliberately carries no detail: callers must not learn whether a
    /// token was malformed, unknown, or belongs to a dead parent.
    #[error("Invalid or expired access token")]
    TokenInvalid,

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AttendanceError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;
