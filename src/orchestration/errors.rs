use thiserror::Error;

use crate::models::{DataCategory, StepId};
use crate::services::CollaboratorError;

/// Failure of a single step attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Step {step} timed out after {timeout_ms}ms")]
    Timeout { step: StepId, timeout_ms: u64 },

    #[error("Step {step} failed: {reason}")]
    Execution { step: StepId, reason: String },

    #[error("Verification failed: account {subject_id} still exists")]
    VerificationFailed { subject_id: String },

    #[error("Step {step} blocked by legal hold on {category}")]
    LegalHold { step: StepId, category: DataCategory },

    #[error("No handler registered for step {step}")]
    HandlerMissing { step: StepId },
}

impl StepError {
    pub fn execution(step: StepId, error: &CollaboratorError) -> Self {
        Self::Execution {
            step,
            reason: error.to_string(),
        }
    }

    /// Whether another attempt could change the outcome
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::LegalHold { .. } | Self::HandlerMissing { .. })
    }
}

pub type StepResult<T> = Result<T, StepError>;
