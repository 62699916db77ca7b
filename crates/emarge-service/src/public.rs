//! Token-authenticated operations for attendees and trainers holding a
//! capability link. Every lookup goes through the gateway, so a token
//! that does not resolve always surfaces as `TokenInvalid`.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use emarge_core::error::{AttendanceError, AttendanceResult};
use emarge_core::models::enrollment::Enrollment;
use emarge_core::models::session::{Session, SessionStatus};
use emarge_core::models::window::{Period, SignatureWindow, WindowStatus};
use emarge_core::repository::{
    AttendanceStore, EmployeeDirectory, EnrollmentRepository, SignatureRepository,
    WindowRepository,
};
use serde::Serialize;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::gateway::AccessTokenGateway;
use crate::ledger::{SignatureLedger, SignatureReceipt, SubmitSignature};

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: SessionStatus,
}

impl From<&Session> for SessionSummary {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            title: s.title.clone(),
            location: s.location.clone(),
            starts_at: s.starts_at,
            ends_at: s.ends_at,
            status: s.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub id: Uuid,
    pub date: NaiveDate,
    pub period: Period,
    pub status: WindowStatus,
}

impl From<&SignatureWindow> for WindowSummary {
    fn from(w: &SignatureWindow) -> Self {
        Self {
            id: w.id,
            date: w.date,
            period: w.period,
            status: w.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Attendee {
    pub enrollment_id: Uuid,
    pub employee_id: Uuid,
    /// `None` when the directory does not know the employee.
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicSessionView {
    pub session: SessionSummary,
    pub windows: Vec<WindowSummary>,
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowAttendee {
    #[serde(flatten)]
    pub attendee: Attendee,
    pub signed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicWindowView {
    pub session: SessionSummary,
    pub window: WindowSummary,
    pub attendees: Vec<WindowAttendee>,
}

pub struct PublicAccess<R: AttendanceStore, D: EmployeeDirectory> {
    store: R,
    directory: D,
    ledger: SignatureLedger<R>,
}

impl<R, D> PublicAccess<R, D>
where
    R: AttendanceStore + Clone,
    D: EmployeeDirectory,
{
    pub fn new(store: R, directory: D, config: ServiceConfig) -> Self {
        Self {
            ledger: SignatureLedger::new(store.clone(), config),
            store,
            directory,
        }
    }

    /// Session overview for a session-scope token.
    pub async fn get_public_session(&self, token: &str) -> AttendanceResult<PublicSessionView> {
        let session = AccessTokenGateway::new(&self.store)
            .resolve_session(token)
            .await?;
        let (windows, enrollments) = tokio::try_join!(
            self.store.windows().list_by_session(session.id),
            self.store.enrollments().list_by_session(session.id),
        )
        .map_err(hide_missing)?;

        Ok(PublicSessionView {
            session: SessionSummary::from(&session),
            windows: windows.iter().map(WindowSummary::from).collect(),
            attendees: self.attendees(enrollments).await?,
        })
    }

    /// One window's sign-in sheet for a window-scope token.
    pub async fn get_public_window(&self, token: &str) -> AttendanceResult<PublicWindowView> {
        let (window, session) = AccessTokenGateway::new(&self.store)
            .resolve_window(token)
            .await?;
        let (enrollments, signed) = tokio::try_join!(
            self.store.enrollments().list_by_session(session.id),
            self.store.signatures().signed_enrollment_ids(window.id),
        )
        .map_err(hide_missing)?;
        let signed: HashSet<Uuid> = signed.into_iter().collect();

        let attendees = self
            .attendees(enrollments)
            .await?
            .into_iter()
            .map(|attendee| WindowAttendee {
                signed: signed.contains(&attendee.enrollment_id),
                attendee,
            })
            .collect();

        Ok(PublicWindowView {
            session: SessionSummary::from(&session),
            window: WindowSummary::from(&window),
            attendees,
        })
    }

    pub async fn submit_signature(
        &self,
        input: SubmitSignature,
    ) -> AttendanceResult<SignatureReceipt> {
        self.ledger.submit(input).await.map_err(hide_missing)
    }

    async fn attendees(&self, enrollments: Vec<Enrollment>) -> AttendanceResult<Vec<Attendee>> {
        let employee_ids: Vec<Uuid> = enrollments.iter().map(|e| e.employee_id).collect();
        let mut names = self.directory.display_names(&employee_ids).await?;
        Ok(enrollments
            .into_iter()
            .map(|e| Attendee {
                enrollment_id: e.id,
                employee_id: e.employee_id,
                display_name: names.remove(&e.employee_id),
            })
            .collect())
    }
}

/// Token holders never learn whether an entity exists.
fn hide_missing(err: AttendanceError) -> AttendanceError {
    match err {
        AttendanceError::NotFound { .. } => AttendanceError::TokenInvalid,
        other => other,
    }
}
