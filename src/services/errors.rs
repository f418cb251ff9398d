use thiserror::Error;

/// Outcome of a failed collaborator call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The addressed resource does not exist
    #[error("Resource not found")]
    NotFound,

    #[error("{service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("{service} call failed: {reason}")]
    Failed { service: String, reason: String },
}

impl CollaboratorError {
    pub fn unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;
