//! Slot signature window domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WindowStatus {
    Closed,
    Open,
}

impl WindowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowStatus::Closed => "Closed",
            WindowStatus::Open => "Open",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Closed" => Some(WindowStatus::Closed),
            "Open" => Some(WindowStatus::Open),
            _ => None,
        }
    }
}

impl fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part of the day a window covers. Ordering follows the day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Morning => "Morning",
            Period::Afternoon => "Afternoon",
            Period::Evening => "Evening",
        }
    }

    /// Position within the day, stored alongside the tag so the database
    /// can sort windows without knowing the enum.
    pub fn rank(&self) -> u8 {
        match self {
            Period::Morning => 0,
            Period::Afternoon => 1,
            Period::Evening => 2,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "morning" => Ok(Period::Morning),
            "afternoon" => Ok(Period::Afternoon),
            "evening" => Ok(Period::Evening),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// One attendance-taking slot of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureWindow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub period: Period,
    pub status: WindowStatus,
    /// Set the first time the window opens and never cleared.
    pub opened_at: Option<DateTime<Utc>>,
    /// SHA-256 hex digest of the window-scope capability token.
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SignatureWindow {
    pub fn was_ever_opened(&self) -> bool {
        self.opened_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewWindow {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub period: Period,
    pub token_hash: String,
}
