use chrono::Duration;

use erasure_core::constants::events;
use erasure_core::orchestration::{SubmitDeletionRequest, TickOutcome};
use erasure_core::{ConflictError, DeletionStatus, ErasureError, ValidationError};

use crate::common::{test_config, valid_submission, TestHarness, CONFIRMATION};

#[tokio::test]
async fn test_wrong_confirmation_creates_nothing() {
    let harness = TestHarness::new();

    let err = harness
        .orchestrator
        .submit_deletion_request("u1", SubmitDeletionRequest::new("WRONG").with_reason("bye"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ErasureError::Validation(ValidationError::ConfirmationMismatch)
    ));
    let stats = harness.orchestrator.get_statistics();
    assert_eq!(stats.received, 0);
    assert_eq!(stats.queued, 0);
    assert!(harness.orchestrator.list_active_by_subject("u1").is_empty());
    assert!(harness.audit.events().is_empty());
}

#[tokio::test]
async fn test_missing_reason_and_empty_subject_rejected() {
    let harness = TestHarness::new();

    let err = harness
        .orchestrator
        .submit_deletion_request("u1", SubmitDeletionRequest::new(CONFIRMATION))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ErasureError::Validation(ValidationError::ReasonRequired)
    ));

    let err = harness
        .orchestrator
        .submit_deletion_request("  ", valid_submission())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ErasureError::Validation(ValidationError::EmptySubject)
    ));
}

#[tokio::test]
async fn test_submission_receipt() {
    let harness = TestHarness::new();
    let now = harness.now();

    let receipt = harness
        .orchestrator
        .submit_deletion_request(
            "u1",
            valid_submission()
                .requested_by("support-agent-7")
                .from_client("203.0.113.9", "integration-test"),
        )
        .await
        .unwrap();

    assert_eq!(receipt.status, DeletionStatus::Pending);
    assert_eq!(receipt.estimated_completion_time, now + Duration::days(30));
    assert_eq!(receipt.steps.len(), 8);

    let snapshot = harness
        .orchestrator
        .get_deletion_status(receipt.request_id)
        .unwrap();
    assert_eq!(snapshot.context.requested_by, "support-agent-7");
    assert_eq!(snapshot.context.ip_address.as_deref(), Some("203.0.113.9"));
    assert_eq!(snapshot.context.requested_at, now);

    assert_eq!(
        harness.notifier.sent_for(receipt.request_id),
        vec![events::DELETION_REQUESTED.to_string()]
    );
    let audit = harness.audit.events_for(receipt.request_id);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event_type, events::DELETION_REQUESTED);
    assert_eq!(audit[0].actor.as_deref(), Some("support-agent-7"));
}

#[tokio::test]
async fn test_second_submission_names_active_request() {
    let harness = TestHarness::new();

    let first = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap();
    assert_eq!(first.status, DeletionStatus::Pending);

    let err = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap_err();

    match err {
        ErasureError::Conflict(ConflictError::ActiveRequestExists { request_id }) => {
            assert_eq!(request_id, first.request_id);
        }
        other => panic!("expected active request conflict, got {other:?}"),
    }
    assert_eq!(harness.orchestrator.list_active_by_subject("u1").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_after_completion() {
    let harness = TestHarness::new();
    harness.seed_subject("u2");

    let (_, status) = harness.submit_and_process("u2").await;
    assert_eq!(status, DeletionStatus::Completed);

    harness.clock.advance(Duration::days(10));
    let err = harness
        .orchestrator
        .submit_deletion_request("u2", valid_submission())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ErasureError::Conflict(ConflictError::CooldownActive { remaining_days: 20 })
    ));

    // Partial days round up
    harness.clock.advance(Duration::days(19) + Duration::hours(12));
    let err = harness
        .orchestrator
        .submit_deletion_request("u2", valid_submission())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ErasureError::Conflict(ConflictError::CooldownActive { remaining_days: 1 })
    ));

    harness.clock.advance(Duration::hours(12));
    assert!(harness
        .orchestrator
        .submit_deletion_request("u2", valid_submission())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_cancelled_request_also_starts_cooldown() {
    let harness = TestHarness::new();
    let receipt = harness
        .orchestrator
        .submit_deletion_request("u3", valid_submission())
        .await
        .unwrap();
    harness
        .orchestrator
        .cancel_deletion_request(receipt.request_id, "u3")
        .await
        .unwrap();

    let err = harness
        .orchestrator
        .submit_deletion_request("u3", valid_submission())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ErasureError::Conflict(ConflictError::CooldownActive { remaining_days: 30 })
    ));
}

#[tokio::test]
async fn test_zero_cooldown_allows_immediate_resubmission() {
    let mut config = test_config();
    config.compliance.cooldown_days = 0;
    let harness = TestHarness::with_config(config);

    let receipt = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap();
    harness
        .orchestrator
        .cancel_deletion_request(receipt.request_id, "u1")
        .await
        .unwrap();

    assert!(harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_cancel_pending_request() {
    let harness = TestHarness::new();
    let receipt = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap();

    let cancellation = harness
        .orchestrator
        .cancel_deletion_request(receipt.request_id, "support")
        .await
        .unwrap();

    assert_eq!(cancellation.status, DeletionStatus::Cancelled);
    assert_eq!(cancellation.cancelled_at, harness.now());

    let snapshot = harness
        .orchestrator
        .get_deletion_status(receipt.request_id)
        .unwrap();
    assert_eq!(snapshot.status, DeletionStatus::Cancelled);
    assert_eq!(snapshot.cancelled_by.as_deref(), Some("support"));

    // Nothing left to process
    assert_eq!(harness.orchestrator.process_next().await, TickOutcome::Idle);
    assert_eq!(
        harness.notifier.sent_for(receipt.request_id),
        vec![
            events::DELETION_REQUESTED.to_string(),
            events::DELETION_CANCELLED.to_string()
        ]
    );
}

#[tokio::test]
async fn test_cancel_unknown_and_terminal_requests() {
    let harness = TestHarness::new();

    let err = harness
        .orchestrator
        .cancel_deletion_request(uuid::Uuid::new_v4(), "support")
        .await
        .unwrap_err();
    assert!(matches!(err, ErasureError::RequestNotFound(_)));

    let receipt = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap();
    harness
        .orchestrator
        .cancel_deletion_request(receipt.request_id, "support")
        .await
        .unwrap();

    let err = harness
        .orchestrator
        .cancel_deletion_request(receipt.request_id, "support")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ErasureError::Conflict(ConflictError::IllegalCancellation {
            status: DeletionStatus::Cancelled,
            ..
        })
    ));
}

#[tokio::test]
async fn test_status_of_unknown_request() {
    let harness = TestHarness::new();
    assert!(matches!(
        harness.orchestrator.get_deletion_status(uuid::Uuid::new_v4()),
        Err(ErasureError::RequestNotFound(_))
    ));
}
