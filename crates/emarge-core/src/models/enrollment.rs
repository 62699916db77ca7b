//! Session enrollment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Association of one employee with one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub session_id: Uuid,
    pub employee_id: Uuid,
    /// SHA-256 hex digest of the enrollment-scope capability token.
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub session_id: Uuid,
    pub employee_id: Uuid,
    pub token_hash: String,
}

/// An enrollment with its derived attendance and feedback flags.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentStatus {
    pub enrollment: Enrollment,
    pub has_signed: bool,
    pub has_feedback: bool,
}
