use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of subject data a legal hold can freeze
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    Sessions,
    Files,
    ApplicationData,
    Identity,
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sessions => write!(f, "sessions"),
            Self::Files => write!(f, "files"),
            Self::ApplicationData => write!(f, "application_data"),
            Self::Identity => write!(f, "identity"),
        }
    }
}

/// Overlay that blocks the matching cleanup step for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalHold {
    pub subject_id: String,
    pub category: DataCategory,
    pub reason: String,
    pub placed_by: String,
    pub placed_at: DateTime<Utc>,
}
