//! Emarge Core — domain models, error taxonomy, storage traits, and the
//! pure algorithms behind session lifecycles, attendance matrices and
//! feedback reminders.

pub mod error;
pub mod lifecycle;
pub mod matrix;
pub mod models;
pub mod reminder;
pub mod repository;

pub use error::{AttendanceError, AttendanceResult};
