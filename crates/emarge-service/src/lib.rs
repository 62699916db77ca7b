//! Emarge Service — session lifecycle, signature windows, the signature
//! ledger, the capability-token gateway and feedback reminders.
//!
//! Every service is generic over [`emarge_core::repository::AttendanceStore`]
//! so this crate has no dependency on the database crate.

pub mod config;
pub mod enrollment;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod lifecycle;
pub mod public;
pub mod reminder;
pub mod token;
pub mod window;

pub use config::ServiceConfig;
pub use enrollment::Enrollments;
pub use error::AccessError;
pub use gateway::AccessTokenGateway;
pub use ledger::{SignatureLedger, SignatureReceipt, SubmitSignature};
pub use lifecycle::SessionLifecycle;
pub use public::PublicAccess;
pub use reminder::ReminderScheduler;
pub use token::TokenScope;
pub use window::SlotWindows;
