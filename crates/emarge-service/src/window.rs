//! Slot signature windows: creation, opening, closing and the
//! signed/missing split for a window.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use emarge_core::error::{AttendanceError, AttendanceResult};
use emarge_core::matrix::{SignaturePartition, partition_enrollments};
use emarge_core::models::Issued;
use emarge_core::models::enrollment::Enrollment;
use emarge_core::models::session::SessionStatus;
use emarge_core::models::window::{NewWindow, Period, SignatureWindow, WindowStatus};
use emarge_core::repository::{
    AttendanceStore, EnrollmentRepository, PaginatedResult, Pagination, SessionRepository,
    SignatureRepository, WindowRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::token;

const OPEN_ACTION: &str = "open signature window";
const CLOSE_ACTION: &str = "close signature window";

fn invalid(from: impl ToString, action: &str) -> AttendanceError {
    AttendanceError::InvalidTransition {
        from: from.to_string(),
        action: action.into(),
    }
}

pub struct SlotWindows<R: AttendanceStore> {
    store: R,
}

impl<R: AttendanceStore> SlotWindows<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    /// Create a Closed window for one (date, period) slot of a session.
    pub async fn create_window(
        &self,
        session_id: Uuid,
        date: NaiveDate,
        period: Period,
    ) -> AttendanceResult<Issued<SignatureWindow>> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        if session.status.is_terminal() {
            return Err(AttendanceError::validation(format!(
                "cannot add a window to a {} session",
                session.status
            )));
        }

        let (raw, token_hash) = token::issue();
        let window = self
            .store
            .windows()
            .create(NewWindow {
                session_id,
                date,
                period,
                token_hash,
            })
            .await?;

        info!(session_id = %session_id, window_id = %window.id, %date, %period, "Window created");
        Ok(Issued {
            entity: window,
            token: raw,
        })
    }

    pub async fn get_window(&self, id: Uuid) -> AttendanceResult<SignatureWindow> {
        self.store.windows().get_by_id(id).await
    }

    pub async fn list_windows(&self, session_id: Uuid) -> AttendanceResult<Vec<SignatureWindow>> {
        self.store.sessions().get_by_id(session_id).await?;
        self.store.windows().list_by_session(session_id).await
    }

    /// Open a Closed window. The session must be Active, both when checked
    /// here and when the window is written.
    pub async fn open_window(&self, id: Uuid) -> AttendanceResult<SignatureWindow> {
        let window = self.store.windows().get_by_id(id).await?;
        let session = self.store.sessions().get_by_id(window.session_id).await?;

        if session.status != SessionStatus::Active {
            return Err(invalid(format!("session status {}", session.status), OPEN_ACTION));
        }
        if window.status != WindowStatus::Closed {
            return Err(invalid(window.status, OPEN_ACTION));
        }

        let opened = self
            .store
            .windows()
            .transition_status(id, WindowStatus::Closed, WindowStatus::Open, Utc::now())
            .await?;

        match opened {
            Some(window) => {
                info!(window_id = %id, session_id = %session.id, "Window opened");
                Ok(window)
            }
            // The session or the window changed after the checks above.
            None => {
                let session = self.store.sessions().get_by_id(window.session_id).await?;
                if session.status != SessionStatus::Active {
                    return Err(invalid(format!("session status {}", session.status), OPEN_ACTION));
                }
                let window = self.store.windows().get_by_id(id).await?;
                Err(invalid(window.status, OPEN_ACTION))
            }
        }
    }

    /// Close an Open window, whatever state its session is in.
    pub async fn close_window(&self, id: Uuid) -> AttendanceResult<SignatureWindow> {
        let window = self.store.windows().get_by_id(id).await?;
        if window.status != WindowStatus::Open {
            return Err(invalid(window.status, CLOSE_ACTION));
        }

        let closed = self
            .store
            .windows()
            .transition_status(id, WindowStatus::Open, WindowStatus::Closed, Utc::now())
            .await?
            .ok_or_else(|| invalid(WindowStatus::Closed, CLOSE_ACTION))?;

        info!(window_id = %id, "Window closed");
        Ok(closed)
    }

    /// Enrollments of the window's session that have not signed it.
    pub async fn missing_signatures(
        &self,
        window_id: Uuid,
        pagination: Pagination,
    ) -> AttendanceResult<PaginatedResult<Enrollment>> {
        let partition = self.partition(window_id).await?;
        Ok(PaginatedResult::from_vec(partition.missing, &pagination))
    }

    /// Enrollments of the window's session that have signed it.
    pub async fn signed_enrollments(&self, window_id: Uuid) -> AttendanceResult<Vec<Enrollment>> {
        Ok(self.partition(window_id).await?.signed)
    }

    async fn partition(&self, window_id: Uuid) -> AttendanceResult<SignaturePartition> {
        let window = self.store.windows().get_by_id(window_id).await?;
        let (enrollments, signed) = tokio::try_join!(
            self.store.enrollments().list_by_session(window.session_id),
            self.store.signatures().signed_enrollment_ids(window.id),
        )?;
        let signed: HashSet<Uuid> = signed.into_iter().collect();
        Ok(partition_enrollments(enrollments, &signed))
    }
}
