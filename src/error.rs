use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigurationError;
use crate::state_machine::{DeletionStatus, StateMachineError};

/// Submission rejected because the request itself is malformed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Subject id must not be empty")]
    EmptySubject,

    #[error("Confirmation phrase does not match")]
    ConfirmationMismatch,

    #[error("A reason for deletion is required")]
    ReasonRequired,

    #[error("Reason is {actual} characters, limit is {max}")]
    ReasonTooLong { max: usize, actual: usize },
}

/// Submission or cancellation rejected because of current state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("An active deletion request already exists: {request_id}")]
    ActiveRequestExists { request_id: Uuid },

    #[error("Cooldown period active, {remaining_days} day(s) remaining")]
    CooldownActive { remaining_days: i64 },

    #[error("Request {request_id} cannot be cancelled while {status}")]
    IllegalCancellation {
        request_id: Uuid,
        status: DeletionStatus,
    },
}

/// Caller-facing error for orchestrator operations
#[derive(Error, Debug)]
pub enum ErasureError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Deletion request not found: {0}")]
    RequestNotFound(Uuid),

    #[error("State transition error: {0}")]
    StateTransition(#[from] StateMachineError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl ErasureError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, ErasureError>;
