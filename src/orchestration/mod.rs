//! # Erasure Orchestration
//!
//! The serialized erasure pipeline.
//!
//! ## Core Components
//!
//! - **StepCatalog**: ordered step definitions, required flags, and timeouts
//! - **RequestValidator**: admission rules for new requests
//! - **RequestStore**: live requests, FIFO queue, and bounded history
//! - **StepExecutor**: runs a request's steps with timeouts and bounded retries
//! - **QueueProcessor**: claims one request per tick and settles it
//! - **ErasureScheduler**: queue and history-pruning tickers
//! - **ErasureOrchestrator**: the caller-facing API over all of the above
//!
//! Control flow: caller → validator → store (enqueue) → processor tick →
//! executor (step by step) → store (history).

pub mod audit_trail;
pub mod clock;
pub mod errors;
pub mod history_pruner;
pub mod legal_holds;
pub mod orchestrator;
pub mod queue_processor;
pub mod request_store;
pub mod request_validator;
pub mod scheduler;
pub mod statistics;
pub mod step_catalog;
pub mod step_executor;
pub mod step_handlers;

pub use audit_trail::AuditTrail;
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{StepError, StepResult};
pub use history_pruner::HistoryPruner;
pub use legal_holds::LegalHoldRegistry;
pub use orchestrator::{
    CancellationReceipt, ErasureOrchestrator, OrchestratorBuilder, SubmissionReceipt,
};
pub use queue_processor::{QueueProcessor, TickOutcome};
pub use request_store::{Claim, RequestStore};
pub use request_validator::{RequestValidator, SubmitDeletionRequest, ValidationPolicy};
pub use scheduler::ErasureScheduler;
pub use statistics::{ErasureMetrics, ErasureStatistics, MetricCounters};
pub use step_catalog::{StepCatalog, StepDefinition};
pub use step_executor::StepExecutor;
pub use step_handlers::{StepHandler, StepHandlerRegistry, StepOutput};
