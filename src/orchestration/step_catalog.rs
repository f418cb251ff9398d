//! # Step Catalog
//!
//! Static, ordered definition of the erasure pipeline. The order is fixed by
//! [`StepId::ALL`]; configuration only decides which optional steps are
//! required and how long each step may run.

use std::time::Duration;

use crate::config::PipelineConfig;
use crate::constants::step_timeouts;
use crate::models::{StepId, StepInstance};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: StepId,
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub timeout: Duration,
}

impl StepDefinition {
    pub fn instantiate(&self) -> StepInstance {
        StepInstance::new(
            self.id,
            self.name,
            self.description,
            self.required,
            self.timeout,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCatalog {
    steps: Vec<StepDefinition>,
}

impl StepCatalog {
    pub fn from_config(config: &PipelineConfig) -> Self {
        let steps = StepId::ALL
            .into_iter()
            .map(|id| {
                let (name, description) = describe(id);
                let required = match id {
                    StepId::Backup => config.backup_enabled,
                    StepId::Verification => config.verification_enabled,
                    StepId::Notification => config.notifications_enabled,
                    _ => true,
                };
                let timeout_ms = config
                    .step_timeouts_ms
                    .get(id.as_str())
                    .copied()
                    .unwrap_or_else(|| default_timeout_ms(id));

                StepDefinition {
                    id,
                    name,
                    description,
                    required,
                    timeout: Duration::from_millis(timeout_ms),
                }
            })
            .collect();

        Self { steps }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn get(&self, id: StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Fresh step instances for a new request, in catalog order
    pub fn instantiate(&self) -> Vec<StepInstance> {
        self.steps.iter().map(StepDefinition::instantiate).collect()
    }
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

fn describe(id: StepId) -> (&'static str, &'static str) {
    match id {
        StepId::Validation => (
            "Validate Request",
            "Confirm the subject can be resolved before any destructive work",
        ),
        StepId::Backup => (
            "Create Backup",
            "Export the subject's data and store a checksummed copy in the vault",
        ),
        StepId::SessionCleanup => ("Terminate Sessions", "End every live session of the subject"),
        StepId::FileCleanup => ("Delete Files", "Remove files uploaded by the subject"),
        StepId::ApplicationDataCleanup => (
            "Delete Application Data",
            "Remove application records owned by the subject",
        ),
        StepId::IdentityProviderDeletion => (
            "Delete Identity Account",
            "Delete the subject's account at the identity provider",
        ),
        StepId::Verification => (
            "Verify Deletion",
            "Confirm the identity provider no longer knows the subject",
        ),
        StepId::Notification => (
            "Send Notification",
            "Tell the subject their erasure completed",
        ),
    }
}

fn default_timeout_ms(id: StepId) -> u64 {
    match id {
        StepId::Validation => step_timeouts::VALIDATION_MS,
        StepId::Backup => step_timeouts::BACKUP_MS,
        StepId::SessionCleanup => step_timeouts::SESSION_CLEANUP_MS,
        StepId::FileCleanup => step_timeouts::FILE_CLEANUP_MS,
        StepId::ApplicationDataCleanup => step_timeouts::APPLICATION_DATA_CLEANUP_MS,
        StepId::IdentityProviderDeletion => step_timeouts::IDENTITY_PROVIDER_DELETION_MS,
        StepId::Verification => step_timeouts::VERIFICATION_MS,
        StepId::Notification => step_timeouts::NOTIFICATION_MS,
    }
}
