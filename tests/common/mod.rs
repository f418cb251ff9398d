//! Shared test harness: an orchestrator wired to in-memory collaborators and a
//! manual wall clock.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use erasure_core::config::ErasureConfig;
use erasure_core::orchestration::{
    Clock, ErasureOrchestrator, ManualClock, OrchestratorBuilder, SubmitDeletionRequest, TickOutcome,
};
use erasure_core::services::{
    Collaborators, InMemoryAuditSink, InMemoryBackupVault, InMemoryIdentityProvider,
    InMemorySubjectStore, RecordingNotifier,
};
use erasure_core::DeletionStatus;

pub const CONFIRMATION: &str = "DELETE MY ACCOUNT";

/// Default configuration with retries fast enough for paused-time tests
pub fn test_config() -> ErasureConfig {
    let mut config = ErasureConfig::default();
    config.retry.base_delay_ms = 10;
    config.scheduler.queue_tick_ms = 50;
    config.scheduler.history_prune_interval_ms = 1_000;
    config
}

pub fn valid_submission() -> SubmitDeletionRequest {
    SubmitDeletionRequest::new(CONFIRMATION).with_reason("I no longer use this service")
}

pub struct TestHarness {
    pub orchestrator: ErasureOrchestrator,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub sessions: Arc<InMemorySubjectStore>,
    pub files: Arc<InMemorySubjectStore>,
    pub application_data: Arc<InMemorySubjectStore>,
    pub vault: Arc<InMemoryBackupVault>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit: Arc<InMemoryAuditSink>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ErasureConfig) -> Self {
        Self::build(config, |builder, _| builder)
    }

    /// Build with extra builder customisation; the closure gets the shared clock
    pub fn build(
        config: ErasureConfig,
        customize: impl FnOnce(OrchestratorBuilder, Arc<ManualClock>) -> OrchestratorBuilder,
    ) -> Self {
        let identity = Arc::new(InMemoryIdentityProvider::new());
        let sessions = Arc::new(InMemorySubjectStore::new("session_store"));
        let files = Arc::new(InMemorySubjectStore::new("file_store"));
        let application_data = Arc::new(InMemorySubjectStore::new("application_data_store"));
        let vault = Arc::new(InMemoryBackupVault::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));

        let collaborators = Collaborators::new(identity.clone())
            .with_sessions(sessions.clone())
            .with_files(files.clone())
            .with_application_data(application_data.clone())
            .with_vault(vault.clone())
            .with_notifier(notifier.clone())
            .with_audit(audit.clone());

        let builder = ErasureOrchestrator::builder(config, collaborators).clock(clock.clone());
        let orchestrator = customize(builder, clock.clone())
            .build()
            .expect("test configuration is valid");

        Self {
            orchestrator,
            identity,
            sessions,
            files,
            application_data,
            vault,
            notifier,
            audit,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Give the subject an account and some data in every store
    pub fn seed_subject(&self, subject_id: &str) {
        self.identity
            .insert_account(erasure_core::services::Profile::new(subject_id));
        self.sessions.insert(subject_id, 2);
        self.files.insert(subject_id, 5);
        self.application_data.insert(subject_id, 7);
    }

    /// Submit and fully process one request, returning its terminal status
    pub async fn submit_and_process(&self, subject_id: &str) -> (uuid::Uuid, DeletionStatus) {
        let receipt = self
            .orchestrator
            .submit_deletion_request(subject_id, valid_submission())
            .await
            .expect("submission accepted");
        match self.orchestrator.process_next().await {
            TickOutcome::Processed { request_id, status } => {
                assert_eq!(request_id, receipt.request_id);
                (request_id, status)
            }
            other => panic!("expected a processed request, got {other:?}"),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
