use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;

use erasure_core::models::DeletionRequest;
use erasure_core::orchestration::{ManualClock, StepError, StepHandler, StepOutput, TickOutcome};
use erasure_core::{ConflictError, DataCategory, DeletionStatus, ErasureError, StepId};

use crate::common::{test_config, valid_submission, TestHarness};

#[tokio::test(start_paused = true)]
async fn test_scheduler_drains_queue_in_background() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    harness.seed_subject("u2");

    let first = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap();
    let second = harness
        .orchestrator
        .submit_deletion_request("u2", valid_submission())
        .await
        .unwrap();

    let scheduler = harness.orchestrator.scheduler();
    scheduler.start();
    // Second start is a no-op
    scheduler.start();
    assert!(scheduler.is_running());

    // One request per tick at a 50ms cadence
    tokio::time::sleep(Duration::from_millis(120)).await;

    for request_id in [first.request_id, second.request_id] {
        let request = harness.orchestrator.get_deletion_status(request_id).unwrap();
        assert_eq!(request.status, DeletionStatus::Completed);
    }
    assert_eq!(harness.orchestrator.process_next().await, TickOutcome::Idle);

    scheduler.stop().await;
    assert!(!scheduler.is_running());

    // Requests submitted after shutdown stay queued
    harness.seed_subject("u3");
    let third = harness
        .orchestrator
        .submit_deletion_request("u3", valid_submission())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        harness
            .orchestrator
            .get_deletion_status(third.request_id)
            .unwrap()
            .status,
        DeletionStatus::Pending
    );
    assert_eq!(harness.orchestrator.get_statistics().queued, 1);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_can_restart_after_stop() {
    let harness = TestHarness::new();
    let scheduler = harness.orchestrator.scheduler();

    scheduler.stop().await;
    scheduler.start();
    scheduler.stop().await;
    scheduler.start();
    assert!(scheduler.is_running());

    let receipt = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(
        harness
            .orchestrator
            .get_deletion_status(receipt.request_id)
            .unwrap()
            .status,
        DeletionStatus::Completed
    );
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_history_pruned_after_retention() {
    let harness = TestHarness::new();
    harness.seed_subject("u1");
    let (request_id, _) = harness.submit_and_process("u1").await;

    harness.clock.advance(ChronoDuration::days(89));
    assert_eq!(harness.orchestrator.prune_history(), 0);
    assert!(harness.orchestrator.get_deletion_status(request_id).is_ok());

    harness.clock.advance(ChronoDuration::days(2));
    let scheduler = harness.orchestrator.scheduler();
    scheduler.start();
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    scheduler.stop().await;

    assert!(matches!(
        harness.orchestrator.get_deletion_status(request_id),
        Err(ErasureError::RequestNotFound(id)) if id == request_id
    ));

    // Counters are cumulative and survive pruning
    let stats = harness.orchestrator.get_statistics();
    assert_eq!(stats.history_size, 0);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.received, 1);
}

#[tokio::test(start_paused = true)]
async fn test_history_bound_evicts_oldest() {
    let mut config = test_config();
    config.history.max_entries = 2;
    let harness = TestHarness::with_config(config);

    let mut ids = Vec::new();
    for subject in ["a", "b", "c"] {
        let (request_id, status) = harness.submit_and_process(subject).await;
        assert_eq!(status, DeletionStatus::Completed);
        ids.push(request_id);
    }

    assert_eq!(harness.orchestrator.get_statistics().history_size, 2);
    assert!(harness.orchestrator.get_deletion_status(ids[0]).is_err());
    assert!(harness.orchestrator.get_deletion_status(ids[2]).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_history_bound_keeps_cooldown_anchor() {
    let mut config = test_config();
    config.history.max_entries = 1;
    let harness = TestHarness::with_config(config);
    harness.seed_subject("u1");
    harness.seed_subject("u2");

    let (first, _) = harness.submit_and_process("u1").await;
    harness.submit_and_process("u2").await;

    // u1's entry was evicted to make room for u2's
    assert_eq!(harness.orchestrator.get_statistics().history_size, 1);
    assert!(harness.orchestrator.get_deletion_status(first).is_err());

    let err = harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ErasureError::Conflict(ConflictError::CooldownActive { remaining_days: 30 })
    ));
    assert!(harness.orchestrator.list_active_by_subject("u1").is_empty());

    // The anchor still expires with the cooldown
    harness.clock.advance(ChronoDuration::days(30));
    assert!(harness
        .orchestrator
        .submit_deletion_request("u1", valid_submission())
        .await
        .is_ok());
}

/// Stands in for a slow notification so requests have a measurable duration
struct SlowNotification {
    clock: Arc<ManualClock>,
}

#[async_trait]
impl StepHandler for SlowNotification {
    fn step_id(&self) -> StepId {
        StepId::Notification
    }

    async fn execute(&self, _request: &DeletionRequest) -> Result<StepOutput, StepError> {
        self.clock.advance(ChronoDuration::milliseconds(1_500));
        Ok(StepOutput::completed())
    }
}

#[tokio::test(start_paused = true)]
async fn test_statistics() {
    let harness = TestHarness::build(test_config(), |builder, clock| {
        builder.handler(Arc::new(SlowNotification { clock }))
    });

    harness.seed_subject("done");
    harness.seed_subject("broken");

    let (_, status) = harness.submit_and_process("done").await;
    assert_eq!(status, DeletionStatus::Completed);

    harness
        .orchestrator
        .place_legal_hold("broken", DataCategory::Files, "litigation", "legal-team")
        .await;
    let (_, status) = harness.submit_and_process("broken").await;
    assert_eq!(status, DeletionStatus::Failed);

    let cancelled = harness
        .orchestrator
        .submit_deletion_request("changed-mind", valid_submission())
        .await
        .unwrap();
    harness
        .orchestrator
        .cancel_deletion_request(cancelled.request_id, "changed-mind")
        .await
        .unwrap();

    harness
        .orchestrator
        .submit_deletion_request("waiting", valid_submission())
        .await
        .unwrap();

    let stats = harness.orchestrator.get_statistics();
    assert_eq!(stats.received, 4);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.history_size, 3);
    assert_eq!(stats.legal_holds, 1);
    assert_eq!(stats.overdue, 0);
    // 1500ms for the completed request, 0ms for the one that failed on the hold
    assert_eq!(stats.average_processing_time_ms, Some(750));
    assert_eq!(stats.config.cooldown_days, 30);
    assert!(stats.config.backup_enabled);

    // The waiting request misses its completion deadline
    harness.clock.advance(ChronoDuration::days(31));
    assert_eq!(harness.orchestrator.get_statistics().overdue, 1);
}
