//! # Deletion Request
//!
//! The unit of work driven through the erasure pipeline. A request is created
//! by the orchestrator after validation, mutated only by the queue processor
//! while `in_progress`, and frozen once it reaches history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::step_instance::{StepId, StepInstance};
use crate::state_machine::{DeletionStatus, StepStatus};

/// Compliance regime a request is processed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceMode {
    #[default]
    Gdpr,
    Ccpa,
    Standard,
}

impl fmt::Display for ComplianceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gdpr => write!(f, "gdpr"),
            Self::Ccpa => write!(f, "ccpa"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

/// Immutable context captured at submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub reason: Option<String>,
    pub confirmation_phrase: String,
    pub requested_at: DateTime<Utc>,
    pub requested_by: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Snapshot taken by the backup step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub created: bool,
    pub location: Option<String>,
    pub size: Option<u64>,
    pub checksum: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Post-deletion verification flags, one per destructive step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub sessions_terminated: bool,
    pub files_deleted: bool,
    pub application_data_deleted: bool,
    pub identity_deleted: bool,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub estimated_completion_time: DateTime<Utc>,
    pub actual_completion_time: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<u64>,
    pub rollback_available: bool,
    pub compliance_mode: ComplianceMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub request_id: Uuid,
    pub subject_id: String,
    pub status: DeletionStatus,
    pub context: RequestContext,
    pub steps: Vec<StepInstance>,
    pub backup: BackupRecord,
    pub verification: VerificationRecord,
    pub current_step_id: Option<StepId>,
    pub metadata: RequestMetadata,
    pub started_at: Option<DateTime<Utc>>,
    pub failed_step_id: Option<StepId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
}

impl DeletionRequest {
    pub fn new(
        subject_id: impl Into<String>,
        context: RequestContext,
        steps: Vec<StepInstance>,
        estimated_completion_time: DateTime<Utc>,
        compliance_mode: ComplianceMode,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            status: DeletionStatus::Pending,
            context,
            steps,
            backup: BackupRecord::default(),
            verification: VerificationRecord::default(),
            current_step_id: None,
            metadata: RequestMetadata {
                estimated_completion_time,
                actual_completion_time: None,
                processing_time_ms: None,
                rollback_available: false,
                compliance_mode,
            },
            started_at: None,
            failed_step_id: None,
            cancelled_at: None,
            cancelled_by: None,
        }
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.context.requested_at
    }

    pub fn step(&self, id: StepId) -> Option<&StepInstance> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut StepInstance> {
        self.steps.iter_mut().find(|step| step.id == id)
    }

    pub fn step_completed(&self, id: StepId) -> bool {
        self.step(id)
            .is_some_and(|step| step.status == StepStatus::Completed)
    }

    /// True when every required step is completed or skipped
    pub fn all_required_steps_satisfied(&self) -> bool {
        self.steps
            .iter()
            .filter(|step| step.required)
            .all(|step| step.status.satisfies_pipeline())
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// When the request reached its terminal status, used for retention
    pub fn terminal_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            DeletionStatus::Completed | DeletionStatus::Failed => self
                .metadata
                .actual_completion_time
                .or(self.started_at)
                .or(Some(self.context.requested_at)),
            DeletionStatus::Cancelled => self.cancelled_at.or(Some(self.context.requested_at)),
            DeletionStatus::Pending | DeletionStatus::InProgress => None,
        }
    }

    /// Active and past its estimated completion time
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.metadata.estimated_completion_time
    }
}
