//! # Request Validator
//!
//! Pure admission check for new deletion requests. Rules run in a fixed order
//! and the first failing rule decides the error:
//!
//! 1. subject id present
//! 2. confirmation phrase matches exactly
//! 3. reason present (when required) and within the length limit
//! 4. no active request for the subject
//! 5. the subject's latest settled request is outside the cooldown window
//!
//! The validator reads state handed to it and never mutates anything; the
//! store re-checks rules 4 and 5 under its lock when the request is created.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ErasureConfig;
use crate::error::{ConflictError, ErasureError, ValidationError};
use crate::models::DeletionRequest;

const SECONDS_PER_DAY: i64 = 86_400;

/// Caller input for a new deletion request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDeletionRequest {
    pub reason: Option<String>,
    pub confirmation: String,
    pub requested_by: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl SubmitDeletionRequest {
    pub fn new(confirmation: impl Into<String>) -> Self {
        Self {
            confirmation: confirmation.into(),
            ..Self::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn requested_by(mut self, actor: impl Into<String>) -> Self {
        self.requested_by = Some(actor.into());
        self
    }

    pub fn from_client(mut self, ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Admission rules derived from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub confirmation_phrase: String,
    pub reason_required: bool,
    pub reason_max_length: usize,
    pub cooldown: Duration,
}

impl From<&ErasureConfig> for ValidationPolicy {
    fn from(config: &ErasureConfig) -> Self {
        Self {
            confirmation_phrase: config.confirmation.phrase.clone(),
            reason_required: config.validation.reason_required,
            reason_max_length: config.validation.reason_max_length,
            cooldown: config.compliance.cooldown(),
        }
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from(&ErasureConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    policy: ValidationPolicy,
}

impl RequestValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate a submission against the subject's active requests and the
    /// `requested_at` of its latest settled one
    pub fn validate(
        &self,
        subject_id: &str,
        request: &SubmitDeletionRequest,
        active: &[DeletionRequest],
        last_requested_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), ErasureError> {
        self.validate_input(subject_id, request)?;
        self.check_conflicts(active, last_requested_at, now)?;
        Ok(())
    }

    /// Input-only rules: subject, confirmation phrase, reason
    pub fn validate_input(
        &self,
        subject_id: &str,
        request: &SubmitDeletionRequest,
    ) -> Result<(), ValidationError> {
        if subject_id.trim().is_empty() {
            return Err(ValidationError::EmptySubject);
        }

        if request.confirmation != self.policy.confirmation_phrase {
            return Err(ValidationError::ConfirmationMismatch);
        }

        let reason = request.reason.as_deref().map(str::trim).unwrap_or("");
        if self.policy.reason_required && reason.is_empty() {
            return Err(ValidationError::ReasonRequired);
        }

        let length = reason.chars().count();
        if length > self.policy.reason_max_length {
            return Err(ValidationError::ReasonTooLong {
                max: self.policy.reason_max_length,
                actual: length,
            });
        }

        Ok(())
    }

    /// State rules: one active request per subject, then the cooldown
    pub fn check_conflicts(
        &self,
        active: &[DeletionRequest],
        last_requested_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), ConflictError> {
        if let Some(existing) = active.iter().find(|request| request.is_active()) {
            return Err(ConflictError::ActiveRequestExists {
                request_id: existing.request_id,
            });
        }

        if let Some(latest) = last_requested_at {
            let cooldown_ends = latest + self.policy.cooldown;
            if now < cooldown_ends {
                return Err(ConflictError::CooldownActive {
                    remaining_days: remaining_days(cooldown_ends - now),
                });
            }
        }

        Ok(())
    }
}

/// Whole days left, rounded up
fn remaining_days(remaining: Duration) -> i64 {
    let seconds = remaining.num_seconds().max(0);
    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}
