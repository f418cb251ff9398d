//! # Erasure Orchestrator
//!
//! Public entry point. Owns the store, the pipeline, legal holds, and the
//! scheduler, and exposes the caller-facing operations:
//!
//! - submit, inspect, and cancel deletion requests
//! - statistics
//! - legal hold management
//! - manual queue ticks and history pruning
//! - lifecycle event subscription
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use erasure_core::config::ErasureConfig;
//! use erasure_core::orchestration::{ErasureOrchestrator, SubmitDeletionRequest};
//! use erasure_core::services::{Collaborators, InMemoryIdentityProvider};
//!
//! # tokio_test::block_on(async {
//! let identity = Arc::new(InMemoryIdentityProvider::with_accounts(["user-42"]));
//! let orchestrator =
//!     ErasureOrchestrator::new(ErasureConfig::default(), Collaborators::new(identity)).unwrap();
//!
//! let receipt = orchestrator
//!     .submit_deletion_request(
//!         "user-42",
//!         SubmitDeletionRequest::new("DELETE MY ACCOUNT").with_reason("closing my account"),
//!     )
//!     .await
//!     .unwrap();
//!
//! orchestrator.process_next().await;
//! let status = orchestrator.get_deletion_status(receipt.request_id).unwrap();
//! # let _ = status;
//! # });
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument};
use uuid::Uuid;

use super::audit_trail::AuditTrail;
use super::clock::{Clock, SystemClock};
use super::history_pruner::HistoryPruner;
use super::legal_holds::LegalHoldRegistry;
use super::queue_processor::{QueueProcessor, TickOutcome};
use super::request_store::RequestStore;
use super::request_validator::{RequestValidator, SubmitDeletionRequest, ValidationPolicy};
use super::scheduler::ErasureScheduler;
use super::statistics::{ErasureMetrics, ErasureStatistics};
use super::step_catalog::StepCatalog;
use super::step_executor::StepExecutor;
use super::step_handlers::StepHandlerRegistry;
use crate::config::ErasureConfig;
use crate::constants::{events, SELF_SERVICE_REQUESTER};
use crate::error::{ErasureError, Result};
use crate::events::{EventPublisher, LifecycleEvent};
use crate::logging::log_request_operation;
use crate::models::{
    DataCategory, DeletionRequest, LegalHold, RequestContext, StepInstance,
};
use crate::services::{notify_best_effort, AuditEvent, Collaborators};
use crate::state_machine::DeletionStatus;

/// Returned when a request is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub request_id: Uuid,
    pub status: DeletionStatus,
    pub estimated_completion_time: DateTime<Utc>,
    pub steps: Vec<StepInstance>,
}

/// Returned when a pending request is cancelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancellationReceipt {
    pub request_id: Uuid,
    pub status: DeletionStatus,
    pub cancelled_at: DateTime<Utc>,
}

pub struct ErasureOrchestrator {
    config: ErasureConfig,
    catalog: StepCatalog,
    validator: RequestValidator,
    store: Arc<RequestStore>,
    holds: Arc<LegalHoldRegistry>,
    metrics: Arc<ErasureMetrics>,
    audit: AuditTrail,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    processor: Arc<QueueProcessor>,
    pruner: Arc<HistoryPruner>,
    scheduler: ErasureScheduler,
}

impl ErasureOrchestrator {
    /// Build an orchestrator on the system clock with the built-in step handlers
    pub fn new(config: ErasureConfig, collaborators: Collaborators) -> Result<Self> {
        Self::builder(config, collaborators).build()
    }

    pub fn builder(config: ErasureConfig, collaborators: Collaborators) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            collaborators,
            clock: Arc::new(SystemClock),
            holds: Arc::new(LegalHoldRegistry::new()),
            handler_overrides: StepHandlerRegistry::new(),
        }
    }

    /// Validate and enqueue a new deletion request
    #[instrument(skip(self, request), fields(subject_id = %subject_id))]
    pub async fn submit_deletion_request(
        &self,
        subject_id: &str,
        request: SubmitDeletionRequest,
    ) -> Result<SubmissionReceipt> {
        let now = self.clock.now();
        self.validator.validate(
            subject_id,
            &request,
            &self.store.list_active_by_subject(subject_id),
            self.store.last_requested_at(subject_id),
            now,
        )?;

        let requested_by = request
            .requested_by
            .clone()
            .unwrap_or_else(|| SELF_SERVICE_REQUESTER.to_string());
        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string);

        let deletion = DeletionRequest::new(
            subject_id,
            RequestContext {
                reason,
                confirmation_phrase: request.confirmation,
                requested_at: now,
                requested_by: requested_by.clone(),
                ip_address: request.ip_address,
                user_agent: request.user_agent,
            },
            self.catalog.instantiate(),
            now + self.config.compliance.completion_deadline(),
            self.config.compliance.mode,
        );

        let receipt = SubmissionReceipt {
            request_id: deletion.request_id,
            status: deletion.status,
            estimated_completion_time: deletion.metadata.estimated_completion_time,
            steps: deletion.steps.clone(),
        };

        self.store.create(deletion)?;
        self.metrics.record_received();

        log_request_operation(
            "submit",
            receipt.request_id,
            subject_id,
            "pending",
            None,
        );
        self.audit
            .record(
                AuditEvent::new(events::DELETION_REQUESTED, subject_id, now)
                    .for_request(receipt.request_id)
                    .by(requested_by),
            )
            .await;
        notify_best_effort(
            self.collaborators.notifier.as_ref(),
            receipt.request_id,
            events::DELETION_REQUESTED,
        )
        .await;

        Ok(receipt)
    }

    /// Snapshot of a live or historical request
    pub fn get_deletion_status(&self, request_id: Uuid) -> Result<DeletionRequest> {
        self.store
            .get(request_id)
            .ok_or(ErasureError::RequestNotFound(request_id))
    }

    /// Cancel a request that has not started yet
    #[instrument(skip(self))]
    pub async fn cancel_deletion_request(
        &self,
        request_id: Uuid,
        cancelled_by: &str,
    ) -> Result<CancellationReceipt> {
        let now = self.clock.now();
        let cancelled = self.store.cancel(request_id, cancelled_by, now)?;
        self.metrics.record_terminal(cancelled.status, None);

        log_request_operation(
            "cancel",
            request_id,
            &cancelled.subject_id,
            "cancelled",
            Some(cancelled_by),
        );
        self.audit
            .record(
                AuditEvent::new(events::DELETION_CANCELLED, &cancelled.subject_id, now)
                    .for_request(request_id)
                    .transition(DeletionStatus::Pending, DeletionStatus::Cancelled)
                    .by(cancelled_by),
            )
            .await;
        notify_best_effort(
            self.collaborators.notifier.as_ref(),
            request_id,
            events::DELETION_CANCELLED,
        )
        .await;

        Ok(CancellationReceipt {
            request_id,
            status: cancelled.status,
            cancelled_at: cancelled.cancelled_at.unwrap_or(now),
        })
    }

    pub fn get_statistics(&self) -> ErasureStatistics {
        let counters = self.metrics.counters();
        ErasureStatistics {
            received: counters.received,
            completed: counters.completed,
            failed: counters.failed,
            cancelled: counters.cancelled,
            active: self.store.active_count(),
            queued: self.store.queued_count(),
            history_size: self.store.history_len(),
            average_processing_time_ms: counters.average_processing_time_ms,
            overdue: self.store.overdue_count(self.clock.now()),
            legal_holds: self.holds.len(),
            config: self.config.summary(),
        }
    }

    pub fn list_active_by_subject(&self, subject_id: &str) -> Vec<DeletionRequest> {
        self.store.list_active_by_subject(subject_id)
    }

    /// Place a hold blocking the matching cleanup step for the subject
    pub async fn place_legal_hold(
        &self,
        subject_id: &str,
        category: DataCategory,
        reason: &str,
        placed_by: &str,
    ) -> LegalHold {
        let now = self.clock.now();
        let hold = LegalHold {
            subject_id: subject_id.to_string(),
            category,
            reason: reason.to_string(),
            placed_by: placed_by.to_string(),
            placed_at: now,
        };
        self.holds.place(hold.clone());

        info!(subject_id = %subject_id, category = %category, placed_by = %placed_by, "Legal hold placed");
        self.audit
            .record(
                AuditEvent::new(events::LEGAL_HOLD_PLACED, subject_id, now)
                    .by(placed_by)
                    .with_detail(format!("{category}: {reason}")),
            )
            .await;
        hold
    }

    /// Lift a hold; returns the hold that was removed, if any
    pub async fn release_legal_hold(
        &self,
        subject_id: &str,
        category: DataCategory,
        released_by: &str,
    ) -> Option<LegalHold> {
        let released = self.holds.release(subject_id, category)?;

        info!(subject_id = %subject_id, category = %category, released_by = %released_by, "Legal hold released");
        self.audit
            .record(
                AuditEvent::new(events::LEGAL_HOLD_RELEASED, subject_id, self.clock.now())
                    .by(released_by)
                    .with_detail(category.to_string()),
            )
            .await;
        Some(released)
    }

    pub fn legal_holds_for(&self, subject_id: &str) -> Vec<LegalHold> {
        self.holds.holds_for(subject_id)
    }

    /// Run one queue tick now
    pub async fn process_next(&self) -> TickOutcome {
        self.processor.tick().await
    }

    /// Prune history past the retention horizon now
    pub fn prune_history(&self) -> usize {
        self.pruner.prune()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.audit.publisher().subscribe()
    }

    pub fn scheduler(&self) -> &ErasureScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &ErasureConfig {
        &self.config
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }
}

impl std::fmt::Debug for ErasureOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasureOrchestrator")
            .field("catalog", &self.catalog)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Assembles an [`ErasureOrchestrator`] with a custom clock, legal hold
/// registry, or step handler overrides
pub struct OrchestratorBuilder {
    config: ErasureConfig,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    holds: Arc<LegalHoldRegistry>,
    handler_overrides: StepHandlerRegistry,
}

impl OrchestratorBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn legal_holds(mut self, holds: Arc<LegalHoldRegistry>) -> Self {
        self.holds = holds;
        self
    }

    /// Replace the built-in handler for the handler's step
    pub fn handler(mut self, handler: Arc<dyn super::step_handlers::StepHandler>) -> Self {
        self.handler_overrides.register(handler);
        self
    }

    pub fn build(self) -> Result<ErasureOrchestrator> {
        let Self {
            config,
            collaborators,
            clock,
            holds,
            handler_overrides,
        } = self;

        config.validate()?;

        let catalog = StepCatalog::from_config(&config.pipeline);
        let validator = RequestValidator::new(ValidationPolicy::from(&config));
        let store = Arc::new(RequestStore::new(
            config.history.max_entries,
            validator.clone(),
        ));
        let metrics = Arc::new(ErasureMetrics::new());
        let audit = AuditTrail::new(
            collaborators.audit.clone(),
            EventPublisher::new(config.events.channel_capacity),
        );

        let mut handlers =
            StepHandlerRegistry::with_defaults(&collaborators, holds.clone(), clock.clone());
        for step in crate::models::StepId::ALL {
            if let Some(handler) = handler_overrides.get(step) {
                handlers.register(handler);
            }
        }

        let executor = StepExecutor::new(
            Arc::new(handlers),
            store.clone(),
            audit.clone(),
            clock.clone(),
            config.retry.clone(),
        );
        let processor = Arc::new(QueueProcessor::new(
            store.clone(),
            executor,
            audit.clone(),
            metrics.clone(),
            collaborators.notifier.clone(),
            clock.clone(),
        ));
        let pruner = Arc::new(HistoryPruner::new(
            store.clone(),
            clock.clone(),
            config.compliance.retention(),
        ));
        let scheduler = ErasureScheduler::new(processor.clone(), pruner.clone(), &config.scheduler);

        info!(
            compliance_mode = %config.compliance.mode,
            steps = catalog.steps().len(),
            "Erasure orchestrator ready"
        );

        Ok(ErasureOrchestrator {
            validator,
            config,
            catalog,
            store,
            holds,
            metrics,
            audit,
            collaborators,
            clock,
            processor,
            pruner,
            scheduler,
        })
    }
}
