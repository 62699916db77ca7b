//! Enrollment of employees into sessions.

use emarge_core::error::{AttendanceError, AttendanceResult};
use emarge_core::models::Issued;
use emarge_core::models::enrollment::{Enrollment, NewEnrollment};
use emarge_core::repository::{AttendanceStore, EnrollmentRepository, SessionRepository};
use tracing::info;
use uuid::Uuid;

use crate::token;

pub struct Enrollments<R: AttendanceStore> {
    store: R,
}

impl<R: AttendanceStore> Enrollments<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    /// Enroll an employee and issue the enrollment-scope token.
    pub async fn enroll(
        &self,
        session_id: Uuid,
        employee_id: Uuid,
    ) -> AttendanceResult<Issued<Enrollment>> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        if session.status.is_terminal() {
            return Err(AttendanceError::validation(format!(
                "cannot enroll into a {} session",
                session.status
            )));
        }

        let (raw, token_hash) = token::issue();
        let enrollment = self
            .store
            .enrollments()
            .create(NewEnrollment {
                session_id,
                employee_id,
                token_hash,
            })
            .await?;

        info!(
            session_id = %session_id,
            enrollment_id = %enrollment.id,
            "Employee enrolled"
        );
        Ok(Issued {
            entity: enrollment,
            token: raw,
        })
    }

    pub async fn list(&self, session_id: Uuid) -> AttendanceResult<Vec<Enrollment>> {
        self.store.sessions().get_by_id(session_id).await?;
        self.store.enrollments().list_by_session(session_id).await
    }
}
