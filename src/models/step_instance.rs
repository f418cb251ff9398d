//! # Pipeline Step Instances
//!
//! A [`StepInstance`] is the per-request copy of a catalog step. Everything the
//! executor needs to run it (required flag, timeout) is copied at request
//! creation so later catalog changes never alter an in-flight request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::legal_hold::DataCategory;
use crate::state_machine::StepStatus;

/// Identity of a pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Validation,
    Backup,
    SessionCleanup,
    FileCleanup,
    ApplicationDataCleanup,
    IdentityProviderDeletion,
    Verification,
    Notification,
}

impl StepId {
    /// Pipeline order. Backup precedes every destructive step.
    pub const ALL: [StepId; 8] = [
        StepId::Validation,
        StepId::Backup,
        StepId::SessionCleanup,
        StepId::FileCleanup,
        StepId::ApplicationDataCleanup,
        StepId::IdentityProviderDeletion,
        StepId::Verification,
        StepId::Notification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Backup => "backup",
            Self::SessionCleanup => "session_cleanup",
            Self::FileCleanup => "file_cleanup",
            Self::ApplicationDataCleanup => "application_data_cleanup",
            Self::IdentityProviderDeletion => "identity_provider_deletion",
            Self::Verification => "verification",
            Self::Notification => "notification",
        }
    }

    /// Steps whose failures may be retried with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backup
                | Self::SessionCleanup
                | Self::FileCleanup
                | Self::ApplicationDataCleanup
                | Self::IdentityProviderDeletion
                | Self::Verification
        )
    }

    /// Steps that remove subject data
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::SessionCleanup
                | Self::FileCleanup
                | Self::ApplicationDataCleanup
                | Self::IdentityProviderDeletion
        )
    }

    /// Data category a legal hold must not cover for this step to run
    pub fn hold_category(&self) -> Option<DataCategory> {
        match self {
            Self::SessionCleanup => Some(DataCategory::Sessions),
            Self::FileCleanup => Some(DataCategory::Files),
            Self::ApplicationDataCleanup => Some(DataCategory::ApplicationData),
            Self::IdentityProviderDeletion => Some(DataCategory::Identity),
            _ => None,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown step id: {s}"))
    }
}

/// One pipeline step embedded in a deletion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInstance {
    pub id: StepId,
    pub name: String,
    pub description: String,
    pub required: bool,
    pub timeout_ms: u64,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub retry_count: u32,
}

impl StepInstance {
    pub fn new(
        id: StepId,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            required,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            error: None,
            retry_count: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pending again after at least one failed attempt
    pub fn is_retrying(&self) -> bool {
        self.status == StepStatus::Pending && self.retry_count > 0
    }
}
