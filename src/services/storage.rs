//! Storage-side collaborators: the places subject data lives and the
//! capabilities used to export and vault it before destructive steps.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{CollaboratorError, CollaboratorResult};
use super::identity::IdentityProvider;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Delete every stored file owned by the subject, returning how many were removed
    async fn delete_user_files(&self, subject_id: &str) -> CollaboratorResult<u64>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Terminate every live session of the subject, returning how many were ended
    async fn terminate_user_sessions(&self, subject_id: &str) -> CollaboratorResult<u64>;
}

#[async_trait]
pub trait ApplicationDataStore: Send + Sync {
    /// Delete application records owned by the subject, returning how many were removed
    async fn delete_user_data(&self, subject_id: &str) -> CollaboratorResult<u64>;
}

#[async_trait]
pub trait DataExporter: Send + Sync {
    /// Export everything held about the subject as one archive
    async fn export_all(&self, subject_id: &str) -> CollaboratorResult<Vec<u8>>;
}

#[async_trait]
pub trait BackupVault: Send + Sync {
    /// Persist a backup archive, returning where it was stored
    async fn store(&self, request_id: Uuid, archive: &[u8]) -> CollaboratorResult<String>;
}

/// Deployment without file storage
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFileStore;

#[async_trait]
impl FileStore for NoopFileStore {
    async fn delete_user_files(&self, _subject_id: &str) -> CollaboratorResult<u64> {
        Ok(0)
    }
}

/// Deployment without a session store
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionStore;

#[async_trait]
impl SessionStore for NoopSessionStore {
    async fn terminate_user_sessions(&self, _subject_id: &str) -> CollaboratorResult<u64> {
        Ok(0)
    }
}

/// Deployment without application-owned subject data
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopApplicationDataStore;

#[async_trait]
impl ApplicationDataStore for NoopApplicationDataStore {
    async fn delete_user_data(&self, _subject_id: &str) -> CollaboratorResult<u64> {
        Ok(0)
    }
}

/// Exports the identity provider profile as a JSON archive
pub struct IdentityProfileExporter {
    identity: Arc<dyn IdentityProvider>,
}

impl IdentityProfileExporter {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl DataExporter for IdentityProfileExporter {
    async fn export_all(&self, subject_id: &str) -> CollaboratorResult<Vec<u8>> {
        // An already-deleted account still gets an (empty) archive
        let profile = match self.identity.export_profile(subject_id).await {
            Ok(profile) => Some(profile),
            Err(CollaboratorError::NotFound) => None,
            Err(err) => return Err(err),
        };

        serde_json::to_vec(&json!({
            "subject_id": subject_id,
            "profile": profile,
        }))
        .map_err(|e| CollaboratorError::failed("identity_profile_exporter", e.to_string()))
    }
}
