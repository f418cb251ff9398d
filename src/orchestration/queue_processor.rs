//! # Queue Processor
//!
//! One tick claims at most one request and drives it to a terminal status
//! before returning. Ticks hold a single execution slot, so even when the
//! scheduler and a manual `process_next` race, only one request is ever
//! being mutated.

use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::audit_trail::AuditTrail;
use super::clock::Clock;
use super::request_store::{Claim, RequestStore};
use super::statistics::ErasureMetrics;
use super::step_executor::StepExecutor;
use crate::constants::events;
use crate::logging::{log_error, log_request_operation};
use crate::models::DeletionRequest;
use crate::services::{notify_best_effort, AuditEvent, Notifier};
use crate::state_machine::{
    DeletionStatus, RequestEvent, RequestStateMachine, StepEvent, StepStateMachine,
};

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing queued
    Idle,
    /// A queued id no longer had a pending request behind it
    MissingRequest(Uuid),
    /// A request was driven to the given terminal status
    Processed {
        request_id: Uuid,
        status: DeletionStatus,
    },
}

pub struct QueueProcessor {
    store: Arc<RequestStore>,
    executor: StepExecutor,
    audit: AuditTrail,
    metrics: Arc<ErasureMetrics>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    slot: AsyncMutex<()>,
}

impl QueueProcessor {
    pub fn new(
        store: Arc<RequestStore>,
        executor: StepExecutor,
        audit: AuditTrail,
        metrics: Arc<ErasureMetrics>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            executor,
            audit,
            metrics,
            notifier,
            clock,
            slot: AsyncMutex::new(()),
        }
    }

    #[instrument(skip(self))]
    pub async fn tick(&self) -> TickOutcome {
        let _slot = self.slot.lock().await;

        let mut request = match self.store.claim_next(self.clock.now()) {
            Claim::Empty => return TickOutcome::Idle,
            Claim::Missing(request_id) => {
                warn!(request_id = %request_id, "Queued request id has no pending request, skipping");
                return TickOutcome::MissingRequest(request_id);
            }
            Claim::Claimed(request) => request,
        };

        let request_id = request.request_id;
        log_request_operation(
            "start",
            request_id,
            &request.subject_id,
            "in_progress",
            None,
        );
        self.audit
            .record(
                AuditEvent::new(events::DELETION_STARTED, &request.subject_id, self.clock.now())
                    .for_request(request_id)
                    .transition(DeletionStatus::Pending, DeletionStatus::InProgress),
            )
            .await;

        if let Err(err) = self.executor.execute(&mut request).await {
            log_error(
                "queue_processor",
                "execute",
                &err.to_string(),
                Some(&request_id.to_string()),
            );
            self.force_fail(&mut request, &err.to_string());
        }

        let status = request.status;
        self.store.move_to_history(request_id);
        self.metrics
            .record_terminal(status, request.metadata.processing_time_ms);

        if status == DeletionStatus::Failed {
            notify_best_effort(self.notifier.as_ref(), request_id, events::DELETION_FAILED).await;
        }

        TickOutcome::Processed { request_id, status }
    }

    /// Settle a request the executor could not finish cleanly
    fn force_fail(&self, request: &mut DeletionRequest, reason: &str) {
        if !request.is_active() {
            return;
        }
        let now = self.clock.now();
        request.failed_step_id = request.current_step_id;

        if let Some(step_id) = request.current_step_id {
            if let Some(step) = request.step_mut(step_id) {
                if !step.status.is_terminal() {
                    if let Err(err) = StepStateMachine::transition(
                        step,
                        StepEvent::fail_with_error(reason),
                        now,
                    ) {
                        warn!(step_id = %step_id, error = %err, "Could not fail interrupted step");
                    }
                }
            }
        }

        let failed = RequestStateMachine::transition(
            request,
            RequestEvent::Fail(reason.to_string()),
            now,
        );
        if let Err(err) = failed {
            log_error(
                "queue_processor",
                "force_fail",
                &err.to_string(),
                Some(&request.request_id.to_string()),
            );
        }
        self.store.update(request);
    }
}

impl std::fmt::Debug for QueueProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueProcessor")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
