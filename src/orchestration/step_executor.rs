//! # Step Executor
//!
//! Drives one claimed request through its steps in catalog order.
//!
//! For each step:
//! - not required: skipped without calling anything
//! - otherwise: started, run under its timeout, then completed, retried, or failed
//!
//! Retries form an explicit bounded loop. A failure is retried only when the
//! step is in the retryable set, the error could plausibly clear, and the step
//! has fewer than `max_retries` retries behind it. Between attempts the
//! executor sleeps `base_delay * retry_count`.
//!
//! Every transition is written back to the store so status queries can tell a
//! step that is waiting to retry (pending, `retry_count > 0`, last error kept)
//! from one that failed for good.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use super::audit_trail::AuditTrail;
use super::clock::Clock;
use super::errors::StepError;
use super::request_store::RequestStore;
use super::step_handlers::{StepHandlerRegistry, StepOutput};
use crate::config::RetryConfig;
use crate::constants::events;
use crate::logging::{log_request_operation, log_step_operation};
use crate::models::{DeletionRequest, StepId};
use crate::services::AuditEvent;
use crate::state_machine::{
    DeletionStatus, RequestEvent, RequestStateMachine, StateMachineResult, StepEvent,
    StepStateMachine, StepStatus,
};

enum Attempt {
    Done,
    Retry(Duration),
    Failed(StepError),
}

pub struct StepExecutor {
    handlers: Arc<StepHandlerRegistry>,
    store: Arc<RequestStore>,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    retry: RetryConfig,
}

impl StepExecutor {
    pub fn new(
        handlers: Arc<StepHandlerRegistry>,
        store: Arc<RequestStore>,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            handlers,
            store,
            audit,
            clock,
            retry,
        }
    }

    /// Run every step of an `in_progress` request and settle its terminal status
    #[instrument(skip(self, request), fields(request_id = %request.request_id))]
    pub async fn execute(&self, request: &mut DeletionRequest) -> StateMachineResult<DeletionStatus> {
        for index in 0..request.steps.len() {
            let step = &request.steps[index];
            let step_id = step.id;

            if !step.required {
                self.skip_step(request, index).await?;
                continue;
            }

            if let Err(error) = self.run_step(request, index).await? {
                return self.fail_request(request, step_id, &error).await;
            }
        }

        self.complete_request(request).await
    }

    async fn skip_step(&self, request: &mut DeletionRequest, index: usize) -> StateMachineResult<()> {
        let now = self.clock.now();
        let step = &mut request.steps[index];
        let from = step.status;
        StepStateMachine::transition(step, StepEvent::Skip, now)?;
        let step_id = step.id;

        self.store.update(request);
        log_step_operation("skip", request.request_id, step_id, "skipped", 0, None);
        self.audit
            .record(
                AuditEvent::new(events::STEP_SKIPPED, &request.subject_id, now)
                    .for_request(request.request_id)
                    .for_step(step_id)
                    .transition(from, StepStatus::Skipped),
            )
            .await;
        Ok(())
    }

    /// Attempt a step until it completes, fails for good, or runs out of retries
    async fn run_step(
        &self,
        request: &mut DeletionRequest,
        index: usize,
    ) -> StateMachineResult<Result<(), StepError>> {
        loop {
            match self.attempt(request, index).await? {
                Attempt::Done => return Ok(Ok(())),
                Attempt::Failed(error) => return Ok(Err(error)),
                Attempt::Retry(delay) => tokio::time::sleep(delay).await,
            }
        }
    }

    #[instrument(skip(self, request), fields(step_id = %request.steps[index].id))]
    async fn attempt(&self, request: &mut DeletionRequest, index: usize) -> StateMachineResult<Attempt> {
        let step_id = request.steps[index].id;
        let started = self.clock.now();
        StepStateMachine::transition(&mut request.steps[index], StepEvent::Start, started)?;
        request.current_step_id = Some(step_id);
        self.store.update(request);

        let retry_count = request.steps[index].retry_count;
        log_step_operation("start", request.request_id, step_id, "in_progress", retry_count, None);
        self.audit
            .record(
                AuditEvent::new(events::STEP_STARTED, &request.subject_id, started)
                    .for_request(request.request_id)
                    .for_step(step_id)
                    .transition(StepStatus::Pending, StepStatus::InProgress),
            )
            .await;

        let outcome = self.invoke(request, index).await;
        let now = self.clock.now();

        match outcome {
            Ok(output) => {
                let detail = output.detail();
                apply_output(request, output);
                StepStateMachine::transition(&mut request.steps[index], StepEvent::Complete, now)?;
                self.store.update(request);

                log_step_operation(
                    "complete",
                    request.request_id,
                    step_id,
                    "completed",
                    retry_count,
                    detail.as_deref(),
                );
                let mut event = AuditEvent::new(events::STEP_COMPLETED, &request.subject_id, now)
                    .for_request(request.request_id)
                    .for_step(step_id)
                    .transition(StepStatus::InProgress, StepStatus::Completed);
                if let Some(detail) = detail {
                    event = event.with_detail(detail);
                }
                self.audit.record(event).await;
                Ok(Attempt::Done)
            }
            Err(error) if self.should_retry(step_id, retry_count, &error) => {
                let message = error.to_string();
                StepStateMachine::transition(
                    &mut request.steps[index],
                    StepEvent::retry_after_error(message.clone()),
                    now,
                )?;
                self.store.update(request);

                let retry_count = request.steps[index].retry_count;
                let delay = self.retry.base_delay() * retry_count;
                warn!(
                    request_id = %request.request_id,
                    step_id = %step_id,
                    retry_count = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "Step failed, retry scheduled"
                );
                self.audit
                    .record(
                        AuditEvent::new(events::STEP_RETRY_SCHEDULED, &request.subject_id, now)
                            .for_request(request.request_id)
                            .for_step(step_id)
                            .transition(StepStatus::InProgress, StepStatus::Pending)
                            .with_detail(message),
                    )
                    .await;
                Ok(Attempt::Retry(delay))
            }
            Err(error) => {
                let message = error.to_string();
                StepStateMachine::transition(
                    &mut request.steps[index],
                    StepEvent::fail_with_error(message.clone()),
                    now,
                )?;
                self.store.update(request);

                log_step_operation(
                    "fail",
                    request.request_id,
                    step_id,
                    "failed",
                    retry_count,
                    Some(&message),
                );
                self.audit
                    .record(
                        AuditEvent::new(events::STEP_FAILED, &request.subject_id, now)
                            .for_request(request.request_id)
                            .for_step(step_id)
                            .transition(StepStatus::InProgress, StepStatus::Failed)
                            .with_detail(message),
                    )
                    .await;
                Ok(Attempt::Failed(error))
            }
        }
    }

    async fn invoke(&self, request: &DeletionRequest, index: usize) -> Result<StepOutput, StepError> {
        let step = &request.steps[index];
        let handler = self
            .handlers
            .get(step.id)
            .ok_or(StepError::HandlerMissing { step: step.id })?;

        match timeout(step.timeout(), handler.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(StepError::Timeout {
                step: step.id,
                timeout_ms: step.timeout_ms,
            }),
        }
    }

    fn should_retry(&self, step_id: StepId, retry_count: u32, error: &StepError) -> bool {
        step_id.is_retryable() && error.is_retryable() && retry_count < self.retry.max_retries
    }

    async fn fail_request(
        &self,
        request: &mut DeletionRequest,
        step_id: StepId,
        error: &StepError,
    ) -> StateMachineResult<DeletionStatus> {
        let now = self.clock.now();
        request.failed_step_id = Some(step_id);
        let status =
            RequestStateMachine::transition(request, RequestEvent::Fail(error.to_string()), now)?;
        self.store.update(request);

        log_request_operation(
            "fail",
            request.request_id,
            &request.subject_id,
            "failed",
            Some(&error.to_string()),
        );
        self.audit
            .record(
                AuditEvent::new(events::DELETION_FAILED, &request.subject_id, now)
                    .for_request(request.request_id)
                    .for_step(step_id)
                    .transition(DeletionStatus::InProgress, status)
                    .with_detail(error.to_string()),
            )
            .await;
        Ok(status)
    }

    async fn complete_request(&self, request: &mut DeletionRequest) -> StateMachineResult<DeletionStatus> {
        let now = self.clock.now();
        let status = RequestStateMachine::transition(request, RequestEvent::Complete, now)?;
        self.store.update(request);

        info!(
            request_id = %request.request_id,
            processing_time_ms = ?request.metadata.processing_time_ms,
            "Deletion request completed"
        );
        log_request_operation(
            "complete",
            request.request_id,
            &request.subject_id,
            "completed",
            None,
        );
        self.audit
            .record(
                AuditEvent::new(events::DELETION_COMPLETED, &request.subject_id, now)
                    .for_request(request.request_id)
                    .transition(DeletionStatus::InProgress, status),
            )
            .await;
        Ok(status)
    }
}

fn apply_output(request: &mut DeletionRequest, output: StepOutput) {
    match output {
        StepOutput::Completed { .. } => {}
        StepOutput::Backup(record) => {
            request.metadata.rollback_available = record.created;
            request.backup = record;
        }
        StepOutput::Verified(record) => {
            request.verification = record;
        }
    }
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("handlers", &self.handlers)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
