use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use erasure_core::constants::events;
use erasure_core::models::DeletionRequest;
use erasure_core::orchestration::{StepError, StepHandler, StepOutput, TickOutcome};
use erasure_core::services::CollaboratorError;
use erasure_core::{ConflictError, DataCategory, DeletionStatus, ErasureError, StepId, StepStatus};

use crate::common::{test_config, valid_submission, TestHarness};

fn started_step_order(harness: &TestHarness, request_id: uuid::Uuid) -> Vec<StepId> {
    harness
        .audit
        .events_for(request_id)
        .into_iter()
        .filter(|event| event.event_type == events::STEP_STARTED)
        .filter_map(|event| event.step_id)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_full_pipeline_erases_subject() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Completed);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    assert!(request
        .steps
        .iter()
        .all(|step| step.status == StepStatus::Completed));
    assert!(request.current_step_id.is_none());
    assert_eq!(request.metadata.actual_completion_time, Some(harness.now()));
    assert_eq!(request.metadata.processing_time_ms, Some(0));

    // Collaborators saw the deletes
    assert!(!harness.identity.contains("u1"));
    assert_eq!(harness.sessions.remaining("u1"), 0);
    assert_eq!(harness.files.remaining("u1"), 0);
    assert_eq!(harness.application_data.remaining("u1"), 0);

    // Backup was vaulted before anything was deleted
    let archive = harness.vault.archive(request_id).expect("archive stored");
    assert!(request.backup.created);
    assert!(request.metadata.rollback_available);
    assert_eq!(request.backup.size, Some(archive.len() as u64));
    assert_eq!(
        request.backup.checksum,
        Some(hex::encode(Sha256::digest(&archive)))
    );
    assert_eq!(
        request.backup.location,
        Some(format!("memory://backups/{request_id}"))
    );
    let exported: serde_json::Value = serde_json::from_slice(&archive).unwrap();
    assert_eq!(exported["subject_id"], "u1");
    assert_eq!(exported["profile"]["subject_id"], "u1");

    let verification = &request.verification;
    assert!(verification.sessions_terminated);
    assert!(verification.files_deleted);
    assert!(verification.application_data_deleted);
    assert!(verification.identity_deleted);
    assert!(verification.verified_at.is_some());

    assert_eq!(started_step_order(&harness, request_id), StepId::ALL.to_vec());
    assert_eq!(
        harness.notifier.sent_for(request_id),
        vec![
            events::DELETION_REQUESTED.to_string(),
            events::DELETION_COMPLETED.to_string()
        ]
    );

    let stats = harness.orchestrator.get_statistics();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.history_size, 1);
}

#[tokio::test(start_paused = true)]
async fn test_steps_never_start_before_predecessor_finishes() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    harness.files.fail_next(2, "disk busy");

    let (request_id, _) = harness.submit_and_process("u1").await;
    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();

    for pair in request.steps.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        if let (Some(done), Some(started)) = (previous.completed_at, next.started_at) {
            assert!(started >= done, "{} started before {} finished", next.id, previous.id);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_identity_account_still_completes() {
    let harness = TestHarness::new();

    let (request_id, status) = harness.submit_and_process("ghost").await;
    assert_eq!(status, DeletionStatus::Completed);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    let identity = request.step(StepId::IdentityProviderDeletion).unwrap();
    assert_eq!(identity.status, StepStatus::Completed);
    assert_eq!(identity.retry_count, 0);
    assert_eq!(
        request.step(StepId::Verification).unwrap().status,
        StepStatus::Completed
    );
    assert!(request.verification.identity_deleted);
}

#[tokio::test(start_paused = true)]
async fn test_required_step_exhausting_retries_fails_request() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    harness.files.fail_next(10, "object store unreachable");

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Failed);
    assert_eq!(harness.files.calls(), 4);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    assert_eq!(request.failed_step_id, Some(StepId::FileCleanup));
    assert!(request.metadata.actual_completion_time.is_some());

    let files = request.step(StepId::FileCleanup).unwrap();
    assert_eq!(files.status, StepStatus::Failed);
    assert_eq!(files.retry_count, 3);
    assert!(files
        .error
        .as_deref()
        .unwrap()
        .contains("object store unreachable"));

    for later in [
        StepId::ApplicationDataCleanup,
        StepId::IdentityProviderDeletion,
        StepId::Verification,
        StepId::Notification,
    ] {
        assert_eq!(request.step(later).unwrap().status, StepStatus::Pending);
    }

    // Nothing past the failure touched the account
    assert!(harness.identity.contains("u1"));
    assert_eq!(harness.identity.delete_calls(), 0);
    assert_eq!(
        harness.notifier.sent_for(request_id),
        vec![
            events::DELETION_REQUESTED.to_string(),
            events::DELETION_FAILED.to_string()
        ]
    );
    assert_eq!(harness.orchestrator.get_statistics().failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_linear() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    harness.sessions.fail_next(3, "cache cluster failover");

    let started = tokio::time::Instant::now();
    let (_, status) = harness.submit_and_process("u1").await;

    assert_eq!(status, DeletionStatus::Completed);
    // 10ms + 20ms + 30ms of backoff with a 10ms base delay
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(60), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(70), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_step_timeout_counts_as_failure() {
    let mut config = test_config();
    config
        .pipeline
        .step_timeouts_ms
        .insert("session_cleanup".to_string(), 100);
    let harness = TestHarness::with_config(config);
    harness.seed_subject("u1");
    harness.sessions.set_delay(Some(Duration::from_secs(5)));

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Failed);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    let sessions = request.step(StepId::SessionCleanup).unwrap();
    assert_eq!(sessions.retry_count, 3);
    assert_eq!(
        sessions.error.as_deref(),
        Some("Step session_cleanup timed out after 100ms")
    );
    assert_eq!(harness.sessions.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_verification_failure_fails_request() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    harness.identity.retain_accounts_on_delete(true);

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Failed);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    assert_eq!(request.failed_step_id, Some(StepId::Verification));
    let verification = request.step(StepId::Verification).unwrap();
    assert_eq!(verification.retry_count, 3);
    assert_eq!(
        verification.error.as_deref(),
        Some("Verification failed: account u1 still exists")
    );
    assert!(!request.verification.identity_deleted);
    assert_eq!(
        request.step(StepId::Notification).unwrap().status,
        StepStatus::Pending
    );
    // One lookup from validation, four from verification
    assert_eq!(harness.identity.lookup_calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_validation_step_is_not_retried() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    harness
        .identity
        .fail_lookups(1, CollaboratorError::unavailable("identity", "503"));

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Failed);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    assert_eq!(request.failed_step_id, Some(StepId::Validation));
    assert_eq!(request.step(StepId::Validation).unwrap().retry_count, 0);
    assert!(!request.backup.created);
}

#[tokio::test(start_paused = true)]
async fn test_backup_retry_then_vault() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    harness.vault.fail_next(1, "bucket throttled");

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Completed);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    assert_eq!(request.step(StepId::Backup).unwrap().retry_count, 1);
    assert!(request.backup.created);
    assert!(harness.vault.archive(request_id).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_features_are_skipped() {
    let mut config = test_config();
    config.pipeline.backup_enabled = false;
    config.pipeline.verification_enabled = false;
    config.pipeline.notifications_enabled = false;
    let harness = TestHarness::with_config(config);
    harness.seed_subject("u1");

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Completed);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    for skipped in [StepId::Backup, StepId::Verification, StepId::Notification] {
        let step = request.step(skipped).unwrap();
        assert!(!step.required);
        assert_eq!(step.status, StepStatus::Skipped);
        assert!(step.started_at.is_none());
    }
    assert!(!request.backup.created);
    assert!(!request.metadata.rollback_available);
    assert!(harness.vault.archive(request_id).is_none());
    assert!(request.verification.verified_at.is_none());
    assert!(!harness
        .notifier
        .sent_for(request_id)
        .contains(&events::DELETION_COMPLETED.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_notification_step_failure_is_fatal() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");

    let receipt = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap();
    harness.notifier.fail_next(1, "smtp relay down");

    let outcome = harness.orchestrator.process_next().await;
    assert_eq!(
        outcome,
        TickOutcome::Processed {
            request_id: receipt.request_id,
            status: DeletionStatus::Failed
        }
    );

    let request = harness
        .orchestrator
        .get_deletion_status(receipt.request_id)
        .unwrap();
    assert_eq!(request.failed_step_id, Some(StepId::Notification));
    assert_eq!(request.step(StepId::Notification).unwrap().retry_count, 0);
    // Data is already gone even though the request failed
    assert!(!harness.identity.contains("u1"));
}

#[tokio::test(start_paused = true)]
async fn test_legal_hold_blocks_cleanup() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    harness
        .orchestrator
        .place_legal_hold("u1", DataCategory::Files, "case 2024-117", "legal-team")
        .await;

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Failed);

    let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
    assert_eq!(request.failed_step_id, Some(StepId::FileCleanup));
    let files = request.step(StepId::FileCleanup).unwrap();
    assert_eq!(files.retry_count, 0);
    assert!(files.error.as_deref().unwrap().contains("legal hold on files"));

    assert_eq!(harness.files.calls(), 0);
    assert_eq!(harness.files.remaining("u1"), 5);
    assert!(harness.identity.contains("u1"));
    // Steps before the held category still ran
    assert_eq!(
        request.step(StepId::SessionCleanup).unwrap().status,
        StepStatus::Completed
    );
}

#[tokio::test(start_paused = true)]
async fn test_released_hold_no_longer_blocks() {
    let mut config = test_config();
    config.compliance.cooldown_days = 0;
    let harness = TestHarness::with_config(config);
    harness.seed_subject("u1");

    harness
        .orchestrator
        .place_legal_hold("u1", DataCategory::Identity, "audit", "legal-team")
        .await;
    assert_eq!(harness.orchestrator.legal_holds_for("u1").len(), 1);
    let (_, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Failed);

    let released = harness
        .orchestrator
        .release_legal_hold("u1", DataCategory::Identity, "legal-team")
        .await;
    assert!(released.is_some());
    assert!(harness.orchestrator.legal_holds_for("u1").is_empty());

    let (_, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Completed);

    let hold_events: Vec<String> = harness
        .audit
        .events()
        .into_iter()
        .map(|event| event.event_type)
        .filter(|name| name.starts_with("legal_hold."))
        .collect();
    assert_eq!(
        hold_events,
        vec![
            events::LEGAL_HOLD_PLACED.to_string(),
            events::LEGAL_HOLD_RELEASED.to_string()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_status_shows_retrying_step_and_blocks_cancel() {
    let harness = Arc::new(TestHarness::new());
    harness.seed_subject("u1");
    harness.files.fail_next(1, "disk busy");

    let receipt = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap();

    let worker = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.orchestrator.process_next().await })
    };

    // The worker is now parked in its 10ms backoff
    tokio::time::sleep(Duration::from_millis(5)).await;

    let snapshot = harness
        .orchestrator
        .get_deletion_status(receipt.request_id)
        .unwrap();
    assert_eq!(snapshot.status, DeletionStatus::InProgress);
    let files = snapshot.step(StepId::FileCleanup).unwrap();
    assert!(files.is_retrying());
    assert_eq!(files.status, StepStatus::Pending);
    assert_eq!(files.retry_count, 1);
    assert!(files.error.as_deref().unwrap().contains("disk busy"));

    // Snapshots are stable while nothing moves
    assert_eq!(
        harness
            .orchestrator
            .get_deletion_status(receipt.request_id)
            .unwrap(),
        snapshot
    );

    let err = harness
        .orchestrator
        .cancel_deletion_request(receipt.request_id, "u1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ErasureError::Conflict(ConflictError::IllegalCancellation {
            status: DeletionStatus::InProgress,
            ..
        })
    ));

    let outcome = worker.await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Processed {
            request_id: receipt.request_id,
            status: DeletionStatus::Completed
        }
    );
}

/// Handler override that counts calls and always succeeds
struct CountingNotification {
    calls: AtomicU32,
}

#[async_trait]
impl StepHandler for CountingNotification {
    fn step_id(&self) -> StepId {
        StepId::Notification
    }

    async fn execute(&self, _request: &DeletionRequest) -> Result<StepOutput, StepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StepOutput::with_detail("sent by override"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_handler_override_replaces_builtin() {
    let handler = Arc::new(CountingNotification {
        calls: AtomicU32::new(0),
    });
    let override_handler = handler.clone();
    let harness = TestHarness::build(test_config(), move |builder, _| {
        builder.handler(override_handler)
    });
    harness.seed_subject("u1");

    let (request_id, status) = harness.submit_and_process("u1").await;
    assert_eq!(status, DeletionStatus::Completed);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    // The built-in notification handler never ran
    assert!(!harness
        .notifier
        .sent_for(request_id)
        .contains(&events::DELETION_COMPLETED.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_queue_is_processed_in_submission_order() {
    let harness = TestHarness::new();
    for subject in ["a", "b", "c"] {
        harness.seed_subject(subject);
    }

    let mut submitted = Vec::new();
    for subject in ["a", "b", "c"] {
        let receipt = harness
            .orchestrator
            .submit_deletion_request(subject, valid_submission())
            .await
            .unwrap();
        submitted.push(receipt.request_id);
    }

    let mut processed = Vec::new();
    while let TickOutcome::Processed { request_id, .. } = harness.orchestrator.process_next().await
    {
        processed.push(request_id);
    }
    assert_eq!(processed, submitted);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_events_are_published() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    let mut receiver = harness.orchestrator.subscribe();

    let (request_id, _) = harness.submit_and_process("u1").await;

    let mut names = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        assert_eq!(event.subject_id, "u1");
        names.push(event.name);
    }
    assert_eq!(names.first().map(String::as_str), Some(events::DELETION_REQUESTED));
    assert_eq!(names.get(1).map(String::as_str), Some(events::DELETION_STARTED));
    assert_eq!(names.last().map(String::as_str), Some(events::DELETION_COMPLETED));
    assert_eq!(
        names.iter().filter(|name| *name == events::STEP_COMPLETED).count(),
        StepId::ALL.len()
    );
    assert_eq!(harness.audit.events_for(request_id).len(), names.len());
}
