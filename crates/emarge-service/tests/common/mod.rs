//! Shared fixtures for service integration tests: an in-memory SurrealDB
//! with the attendance schema applied, and helpers to drive a session to
//! a given point of its lifecycle.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use emarge_core::models::Issued;
use emarge_core::models::enrollment::Enrollment;
use emarge_core::models::session::{CreateSession, Session};
use emarge_core::models::window::{Period, SignatureWindow};
use emarge_db::SurrealStore;
use emarge_service::{Enrollments, ServiceConfig, SessionLifecycle, SignatureLedger, SlotWindows};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

pub const TRAINER: &str = "trainer:bernard";

pub struct Harness {
    pub db: Surreal<Db>,
    pub store: SurrealStore<Db>,
    pub config: ServiceConfig,
    pub lifecycle: SessionLifecycle<SurrealStore<Db>>,
    pub windows: SlotWindows<SurrealStore<Db>>,
    pub enrollments: Enrollments<SurrealStore<Db>>,
    pub ledger: SignatureLedger<SurrealStore<Db>>,
}

pub async fn harness() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    emarge_db::run_migrations(&db).await.unwrap();

    let store = SurrealStore::new(db.clone());
    let config = ServiceConfig::default();
    Harness {
        lifecycle: SessionLifecycle::new(store.clone(), config.clone()),
        windows: SlotWindows::new(store.clone()),
        enrollments: Enrollments::new(store.clone()),
        ledger: SignatureLedger::new(store.clone(), config.clone()),
        db,
        store,
        config,
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

pub fn new_session_at(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> CreateSession {
    CreateSession {
        title: "First aid at work".into(),
        location: "Building A, room 12".into(),
        trainer_id: Uuid::new_v4(),
        starts_at,
        ends_at,
    }
}

pub fn new_session() -> CreateSession {
    let start = Utc::now();
    new_session_at(start, start + Duration::hours(7))
}

impl Harness {
    pub async fn draft(&self) -> Issued<Session> {
        self.lifecycle.create_session(new_session()).await.unwrap()
    }

    /// A session moved through Draft and NotStarted to Active.
    pub async fn active(&self) -> Issued<Session> {
        let issued = self.draft().await;
        let id = issued.entity.id;
        self.lifecycle.schedule(id, TRAINER).await.unwrap();
        let entity = self.lifecycle.open(id, TRAINER).await.unwrap();
        Issued {
            entity,
            token: issued.token,
        }
    }

    pub async fn window(&self, session_id: Uuid, d: u32, period: Period) -> Issued<SignatureWindow> {
        self.windows
            .create_window(session_id, day(d), period)
            .await
            .unwrap()
    }

    pub async fn enroll(&self, session_id: Uuid) -> Issued<Enrollment> {
        self.enrollments
            .enroll(session_id, Uuid::new_v4())
            .await
            .unwrap()
    }

    pub async fn add_employee(&self, employee_id: Uuid, name: &str) {
        self.db
            .query("CREATE employee SET employee_id = $employee_id, display_name = $name")
            .bind(("employee_id", employee_id.to_string()))
            .bind(("name", name.to_string()))
            .await
            .unwrap()
            .check()
            .unwrap();
    }

    pub async fn add_feedback(&self, enrollment_id: Uuid) {
        self.db
            .query("CREATE feedback SET enrollment_id = $enrollment_id")
            .bind(("enrollment_id", enrollment_id.to_string()))
            .await
            .unwrap()
            .check()
            .unwrap();
    }
}
