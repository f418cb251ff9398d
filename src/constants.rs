//! # Erasure Constants
//!
//! Compliance defaults and lifecycle event names shared across the pipeline.
//! Defaults here seed [`crate::config::ErasureConfig`]; deployments override
//! them through configuration.

// Re-export state types for convenience
pub use crate::state_machine::{DeletionStatus, StepStatus};

/// Literal a subject must type to confirm erasure
pub const DEFAULT_CONFIRMATION_PHRASE: &str = "DELETE MY ACCOUNT";

/// Hard ceiling on retries per step, beyond the first attempt
pub const MAX_STEP_RETRIES: u32 = 3;

pub const DEFAULT_REASON_MAX_LENGTH: usize = 500;
pub const DEFAULT_COOLDOWN_DAYS: u32 = 30;
pub const DEFAULT_RETENTION_DAYS: u32 = 90;
pub const DEFAULT_COMPLETION_DEADLINE_DAYS: u32 = 30;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_QUEUE_TICK_MS: u64 = 5_000;
pub const DEFAULT_HISTORY_PRUNE_INTERVAL_MS: u64 = 3_600_000;
pub const DEFAULT_HISTORY_MAX_ENTRIES: usize = 10_000;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_000;

/// Actor recorded when a subject files their own request
pub const SELF_SERVICE_REQUESTER: &str = "self";

/// Lifecycle events published to the audit trail and event subscribers
pub mod events {
    pub const DELETION_REQUESTED: &str = "deletion.requested";
    pub const DELETION_STARTED: &str = "deletion.started";
    pub const DELETION_COMPLETED: &str = "deletion.completed";
    pub const DELETION_FAILED: &str = "deletion.failed";
    pub const DELETION_CANCELLED: &str = "deletion.cancelled";

    pub const STEP_STARTED: &str = "step.started";
    pub const STEP_COMPLETED: &str = "step.completed";
    pub const STEP_FAILED: &str = "step.failed";
    pub const STEP_RETRY_SCHEDULED: &str = "step.retry_scheduled";
    pub const STEP_SKIPPED: &str = "step.skipped";

    pub const LEGAL_HOLD_PLACED: &str = "legal_hold.placed";
    pub const LEGAL_HOLD_RELEASED: &str = "legal_hold.released";
    pub const HISTORY_PRUNED: &str = "history.pruned";
}

/// Default per-step deadlines in milliseconds
pub mod step_timeouts {
    pub const VALIDATION_MS: u64 = 10_000;
    pub const BACKUP_MS: u64 = 60_000;
    pub const SESSION_CLEANUP_MS: u64 = 15_000;
    pub const FILE_CLEANUP_MS: u64 = 120_000;
    pub const APPLICATION_DATA_CLEANUP_MS: u64 = 120_000;
    pub const IDENTITY_PROVIDER_DELETION_MS: u64 = 30_000;
    pub const VERIFICATION_MS: u64 = 15_000;
    pub const NOTIFICATION_MS: u64 = 10_000;
}
