//! Capability-token resolution errors.
//!
//! These carry the real reason a token was refused so it can be logged.
//! They all collapse into the single public `TokenInvalid` error.

use emarge_core::error::AttendanceError;
use thiserror::Error;
use uuid::Uuid;

use crate::token::TokenScope;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("token is not well-formed")]
    Malformed,

    #[error("no {0} matches the token")]
    Unknown(TokenScope),

    #[error("{0} lookup failed")]
    Lookup(TokenScope),

    #[error("parent session {session_id} is cancelled")]
    ParentCancelled { session_id: Uuid },

    #[error("enrollment {enrollment_id} is not part of session {session_id}")]
    ScopeMismatch {
        enrollment_id: Uuid,
        session_id: Uuid,
    },
}

impl From<AccessError> for AttendanceError {
    fn from(_: AccessError) -> Self {
        AttendanceError::TokenInvalid
    }
}
