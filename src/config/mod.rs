//! # Erasure Configuration System
//!
//! Layered configuration for the erasure orchestrator. Values come from
//! `erasure.toml`, an optional `erasure.{environment}.toml` override, and
//! `ERASURE__`-prefixed environment variables, in that order. Every section
//! has defaults so an empty configuration directory still yields a working
//! setup.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use erasure_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let cooldown = manager.config().compliance.cooldown();
//! let tick = manager.config().scheduler.queue_tick_interval();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::constants::{self, MAX_STEP_RETRIES};
use crate::models::ComplianceMode;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring erasure.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ErasureConfig {
    /// Confirmation phrase policy
    pub confirmation: ConfirmationConfig,

    /// Submission validation rules
    pub validation: ValidationConfig,

    /// Cooldown, retention, and completion deadlines
    pub compliance: ComplianceConfig,

    /// Which optional pipeline steps are enabled, and step deadlines
    pub pipeline: PipelineConfig,

    /// Step retry policy
    pub retry: RetryConfig,

    /// Ticker intervals
    pub scheduler: SchedulerConfig,

    /// History bounds
    pub history: HistoryConfig,

    /// Lifecycle event channel
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub phrase: String,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            phrase: constants::DEFAULT_CONFIRMATION_PHRASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub reason_required: bool,
    pub reason_max_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            reason_required: true,
            reason_max_length: constants::DEFAULT_REASON_MAX_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub mode: ComplianceMode,
    pub cooldown_days: u32,
    pub retention_days: u32,
    pub completion_deadline_days: u32,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            mode: ComplianceMode::default(),
            cooldown_days: constants::DEFAULT_COOLDOWN_DAYS,
            retention_days: constants::DEFAULT_RETENTION_DAYS,
            completion_deadline_days: constants::DEFAULT_COMPLETION_DEADLINE_DAYS,
        }
    }
}

impl ComplianceConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.cooldown_days))
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn completion_deadline(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.completion_deadline_days))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub backup_enabled: bool,
    pub verification_enabled: bool,
    pub notifications_enabled: bool,
    /// Per-step deadline overrides keyed by step id, in milliseconds
    pub step_timeouts_ms: HashMap<String, u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backup_enabled: true,
            verification_enabled: true,
            notifications_enabled: true,
            step_timeouts_ms: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_STEP_RETRIES,
            base_delay_ms: constants::DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub queue_tick_ms: u64,
    pub history_prune_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_tick_ms: constants::DEFAULT_QUEUE_TICK_MS,
            history_prune_interval_ms: constants::DEFAULT_HISTORY_PRUNE_INTERVAL_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn queue_tick_interval(&self) -> Duration {
        Duration::from_millis(self.queue_tick_ms)
    }

    pub fn history_prune_interval(&self) -> Duration {
        Duration::from_millis(self.history_prune_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: constants::DEFAULT_HISTORY_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: constants::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Configuration digest reported alongside statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub compliance_mode: ComplianceMode,
    pub cooldown_days: u32,
    pub retention_days: u32,
    pub completion_deadline_days: u32,
    pub reason_required: bool,
    pub backup_enabled: bool,
    pub verification_enabled: bool,
    pub notifications_enabled: bool,
    pub max_retries: u32,
    pub queue_tick_ms: u64,
}

impl ErasureConfig {
    /// Reject configurations that would break compliance invariants
    pub fn validate(&self) -> ConfigResult<()> {
        if self.confirmation.phrase.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "confirmation.phrase",
                "must not be empty",
            ));
        }

        if self.validation.reason_max_length == 0 {
            return Err(ConfigurationError::invalid_value(
                "validation.reason_max_length",
                "must be greater than zero",
            ));
        }

        // History must outlive the cooldown or resubmission checks lose their anchor
        if self.compliance.retention_days < self.compliance.cooldown_days {
            return Err(ConfigurationError::invalid_value(
                "compliance.retention_days",
                format!(
                    "{} is shorter than cooldown_days ({})",
                    self.compliance.retention_days, self.compliance.cooldown_days
                ),
            ));
        }

        if self.retry.max_retries > MAX_STEP_RETRIES {
            return Err(ConfigurationError::invalid_value(
                "retry.max_retries",
                format!("must not exceed {MAX_STEP_RETRIES}"),
            ));
        }

        if self.scheduler.queue_tick_ms == 0 || self.scheduler.history_prune_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduler",
                "intervals must be greater than zero",
            ));
        }

        if self.history.max_entries == 0 {
            return Err(ConfigurationError::invalid_value(
                "history.max_entries",
                "must be greater than zero",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                "must be greater than zero",
            ));
        }

        for (step, timeout_ms) in &self.pipeline.step_timeouts_ms {
            if step.parse::<crate::models::StepId>().is_err() {
                return Err(ConfigurationError::invalid_value(
                    format!("pipeline.step_timeouts_ms.{step}"),
                    "unknown step id",
                ));
            }
            if *timeout_ms == 0 {
                return Err(ConfigurationError::invalid_value(
                    format!("pipeline.step_timeouts_ms.{step}"),
                    "must be greater than zero",
                ));
            }
        }

        Ok(())
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            compliance_mode: self.compliance.mode,
            cooldown_days: self.compliance.cooldown_days,
            retention_days: self.compliance.retention_days,
            completion_deadline_days: self.compliance.completion_deadline_days,
            reason_required: self.validation.reason_required,
            backup_enabled: self.pipeline.backup_enabled,
            verification_enabled: self.pipeline.verification_enabled,
            notifications_enabled: self.pipeline.notifications_enabled,
            max_retries: self.retry.max_retries,
            queue_tick_ms: self.scheduler.queue_tick_ms,
        }
    }
}
