//! # External Collaborators
//!
//! Narrow capability traits for every system the erasure pipeline touches.
//! Optional capabilities have null-object implementations so the pipeline
//! never branches on whether a collaborator is present.

pub mod audit;
pub mod errors;
pub mod identity;
pub mod memory;
pub mod notifier;
pub mod storage;

use std::sync::Arc;

pub use audit::{AuditEvent, AuditSink, TracingAuditSink};
pub use errors::{CollaboratorError, CollaboratorResult};
pub use identity::{IdentityProvider, Profile};
pub use memory::{
    InMemoryAuditSink, InMemoryBackupVault, InMemoryIdentityProvider, InMemorySubjectStore,
    RecordingNotifier,
};
pub use notifier::{notify_best_effort, NoopNotifier, Notifier};
pub use storage::{
    ApplicationDataStore, BackupVault, DataExporter, FileStore, IdentityProfileExporter,
    NoopApplicationDataStore, NoopFileStore, NoopSessionStore, SessionStore,
};

/// Every collaborator the pipeline calls through
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub files: Arc<dyn FileStore>,
    pub application_data: Arc<dyn ApplicationDataStore>,
    pub exporter: Arc<dyn DataExporter>,
    pub vault: Arc<dyn BackupVault>,
    pub notifier: Arc<dyn Notifier>,
    pub audit: Arc<dyn AuditSink>,
}

impl Collaborators {
    /// Identity provider only; everything else falls back to null objects,
    /// profile export, an in-memory vault, and the tracing audit sink
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            exporter: Arc::new(IdentityProfileExporter::new(identity.clone())),
            identity,
            sessions: Arc::new(NoopSessionStore),
            files: Arc::new(NoopFileStore),
            application_data: Arc::new(NoopApplicationDataStore),
            vault: Arc::new(InMemoryBackupVault::new()),
            notifier: Arc::new(NoopNotifier),
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_files(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = files;
        self
    }

    pub fn with_application_data(mut self, store: Arc<dyn ApplicationDataStore>) -> Self {
        self.application_data = store;
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn DataExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_vault(mut self, vault: Arc<dyn BackupVault>) -> Self {
        self.vault = vault;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
