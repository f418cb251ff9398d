//! # Step Handlers
//!
//! One handler per pipeline step, each bound to the collaborator it drives.
//! Handlers see a snapshot of the request and return a [`StepOutput`]; the
//! executor owns every mutation of the request itself.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::clock::Clock;
use super::errors::{StepError, StepResult};
use super::legal_holds::LegalHoldRegistry;
use crate::constants::events;
use crate::models::{BackupRecord, DeletionRequest, StepId, VerificationRecord};
use crate::services::{CollaboratorError, Collaborators};

/// What a successful step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutput {
    Completed { detail: Option<String> },
    Backup(BackupRecord),
    Verified(VerificationRecord),
}

impl StepOutput {
    pub fn completed() -> Self {
        Self::Completed { detail: None }
    }

    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self::Completed {
            detail: Some(detail.into()),
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Completed { detail } => detail.clone(),
            Self::Backup(record) => record.location.clone(),
            Self::Verified(_) => Some("identity account confirmed absent".to_string()),
        }
    }
}

#[async_trait]
pub trait StepHandler: Send + Sync {
    fn step_id(&self) -> StepId;

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput>;
}

fn ensure_not_held(
    holds: &LegalHoldRegistry,
    step: StepId,
    request: &DeletionRequest,
) -> StepResult<()> {
    match step.hold_category() {
        Some(category) if holds.is_held(&request.subject_id, category) => {
            Err(StepError::LegalHold { step, category })
        }
        _ => Ok(()),
    }
}

/// Confirms the identity provider is reachable and the subject resolvable
pub struct ValidationHandler {
    collaborators: Collaborators,
}

#[async_trait]
impl StepHandler for ValidationHandler {
    fn step_id(&self) -> StepId {
        StepId::Validation
    }

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput> {
        match self
            .collaborators
            .identity
            .get_account(&request.subject_id)
            .await
        {
            Ok(_) => Ok(StepOutput::completed()),
            Err(CollaboratorError::NotFound) => Ok(StepOutput::with_detail(
                "account already absent at identity provider",
            )),
            Err(err) => Err(StepError::execution(StepId::Validation, &err)),
        }
    }
}

/// Exports, checksums, and vaults the subject's data
pub struct BackupHandler {
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl StepHandler for BackupHandler {
    fn step_id(&self) -> StepId {
        StepId::Backup
    }

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput> {
        let archive = self
            .collaborators
            .exporter
            .export_all(&request.subject_id)
            .await
            .map_err(|err| StepError::execution(StepId::Backup, &err))?;

        let checksum = hex::encode(Sha256::digest(&archive));
        let size = archive.len() as u64;

        let location = self
            .collaborators
            .vault
            .store(request.request_id, &archive)
            .await
            .map_err(|err| StepError::execution(StepId::Backup, &err))?;

        debug!(
            request_id = %request.request_id,
            size = size,
            checksum = %checksum,
            location = %location,
            "Backup archived"
        );

        Ok(StepOutput::Backup(BackupRecord {
            created: true,
            location: Some(location),
            size: Some(size),
            checksum: Some(checksum),
            created_at: Some(self.clock.now()),
        }))
    }
}

pub struct SessionCleanupHandler {
    collaborators: Collaborators,
    holds: Arc<LegalHoldRegistry>,
}

#[async_trait]
impl StepHandler for SessionCleanupHandler {
    fn step_id(&self) -> StepId {
        StepId::SessionCleanup
    }

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput> {
        ensure_not_held(&self.holds, StepId::SessionCleanup, request)?;
        let terminated = self
            .collaborators
            .sessions
            .terminate_user_sessions(&request.subject_id)
            .await
            .map_err(|err| StepError::execution(StepId::SessionCleanup, &err))?;
        Ok(StepOutput::with_detail(format!(
            "{terminated} session(s) terminated"
        )))
    }
}

pub struct FileCleanupHandler {
    collaborators: Collaborators,
    holds: Arc<LegalHoldRegistry>,
}

#[async_trait]
impl StepHandler for FileCleanupHandler {
    fn step_id(&self) -> StepId {
        StepId::FileCleanup
    }

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput> {
        ensure_not_held(&self.holds, StepId::FileCleanup, request)?;
        let deleted = self
            .collaborators
            .files
            .delete_user_files(&request.subject_id)
            .await
            .map_err(|err| StepError::execution(StepId::FileCleanup, &err))?;
        Ok(StepOutput::with_detail(format!("{deleted} file(s) deleted")))
    }
}

pub struct ApplicationDataCleanupHandler {
    collaborators: Collaborators,
    holds: Arc<LegalHoldRegistry>,
}

#[async_trait]
impl StepHandler for ApplicationDataCleanupHandler {
    fn step_id(&self) -> StepId {
        StepId::ApplicationDataCleanup
    }

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput> {
        ensure_not_held(&self.holds, StepId::ApplicationDataCleanup, request)?;
        let deleted = self
            .collaborators
            .application_data
            .delete_user_data(&request.subject_id)
            .await
            .map_err(|err| StepError::execution(StepId::ApplicationDataCleanup, &err))?;
        Ok(StepOutput::with_detail(format!("{deleted} record(s) deleted")))
    }
}

pub struct IdentityDeletionHandler {
    collaborators: Collaborators,
    holds: Arc<LegalHoldRegistry>,
}

#[async_trait]
impl StepHandler for IdentityDeletionHandler {
    fn step_id(&self) -> StepId {
        StepId::IdentityProviderDeletion
    }

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput> {
        ensure_not_held(&self.holds, StepId::IdentityProviderDeletion, request)?;
        match self
            .collaborators
            .identity
            .delete_account(&request.subject_id)
            .await
        {
            Ok(()) => Ok(StepOutput::completed()),
            // Already gone is the outcome we wanted
            Err(CollaboratorError::NotFound) => {
                Ok(StepOutput::with_detail("account already deleted"))
            }
            Err(err) => Err(StepError::execution(StepId::IdentityProviderDeletion, &err)),
        }
    }
}

/// Confirms the identity account is gone and records what cleanup achieved
pub struct VerificationHandler {
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl StepHandler for VerificationHandler {
    fn step_id(&self) -> StepId {
        StepId::Verification
    }

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput> {
        match self
            .collaborators
            .identity
            .get_account(&request.subject_id)
            .await
        {
            Err(CollaboratorError::NotFound) => Ok(StepOutput::Verified(VerificationRecord {
                sessions_terminated: request.step_completed(StepId::SessionCleanup),
                files_deleted: request.step_completed(StepId::FileCleanup),
                application_data_deleted: request.step_completed(StepId::ApplicationDataCleanup),
                identity_deleted: true,
                verified_at: Some(self.clock.now()),
            })),
            Ok(_) => Err(StepError::VerificationFailed {
                subject_id: request.subject_id.clone(),
            }),
            Err(err) => Err(StepError::execution(StepId::Verification, &err)),
        }
    }
}

/// Tells the subject their erasure went through
pub struct NotificationHandler {
    collaborators: Collaborators,
}

#[async_trait]
impl StepHandler for NotificationHandler {
    fn step_id(&self) -> StepId {
        StepId::Notification
    }

    async fn execute(&self, request: &DeletionRequest) -> StepResult<StepOutput> {
        self.collaborators
            .notifier
            .send(request.request_id, events::DELETION_COMPLETED)
            .await
            .map_err(|err| StepError::execution(StepId::Notification, &err))?;
        Ok(StepOutput::completed())
    }
}

/// Binds every step id to its handler
#[derive(Default)]
pub struct StepHandlerRegistry {
    handlers: HashMap<StepId, Arc<dyn StepHandler>>,
}

impl StepHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handler for every catalog step
    pub fn with_defaults(
        collaborators: &Collaborators,
        holds: Arc<LegalHoldRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ValidationHandler {
            collaborators: collaborators.clone(),
        }));
        registry.register(Arc::new(BackupHandler {
            collaborators: collaborators.clone(),
            clock: clock.clone(),
        }));
        registry.register(Arc::new(SessionCleanupHandler {
            collaborators: collaborators.clone(),
            holds: holds.clone(),
        }));
        registry.register(Arc::new(FileCleanupHandler {
            collaborators: collaborators.clone(),
            holds: holds.clone(),
        }));
        registry.register(Arc::new(ApplicationDataCleanupHandler {
            collaborators: collaborators.clone(),
            holds: holds.clone(),
        }));
        registry.register(Arc::new(IdentityDeletionHandler {
            collaborators: collaborators.clone(),
            holds,
        }));
        registry.register(Arc::new(VerificationHandler {
            collaborators: collaborators.clone(),
            clock,
        }));
        registry.register(Arc::new(NotificationHandler {
            collaborators: collaborators.clone(),
        }));
        registry
    }

    /// Register a handler, replacing any existing one for the same step
    pub fn register(&mut self, handler: Arc<dyn StepHandler>) -> Option<Arc<dyn StepHandler>> {
        self.handlers.insert(handler.step_id(), handler)
    }

    pub fn get(&self, step: StepId) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(&step).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for StepHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut steps: Vec<&StepId> = self.handlers.keys().collect();
        steps.sort();
        f.debug_struct("StepHandlerRegistry")
            .field("steps", &steps)
            .finish()
    }
}
