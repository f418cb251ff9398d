#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Erasure Core
//!
//! Account-erasure workflow orchestrator for "right to be forgotten" requests.
//!
//! ## Overview
//!
//! A deletion request is validated, queued, and then driven through a fixed,
//! ordered pipeline: validation, backup, session cleanup, file cleanup,
//! application data cleanup, identity provider deletion, verification, and
//! notification. One request is processed at a time; every step runs under a
//! deadline and retryable steps get a bounded number of linear-backoff
//! retries. Every transition is audited.
//!
//! Compliance rules enforced at submission:
//! - at most one active (pending or in progress) request per subject
//! - a cooldown after the subject's most recent request
//! - an exact confirmation phrase and, by default, a reason
//!
//! ## Module Organization
//!
//! - [`models`] - deletion requests, step instances, legal holds
//! - [`state_machine`] - request and step transition tables
//! - [`orchestration`] - validator, store, executor, processor, scheduler, orchestrator
//! - [`services`] - collaborator traits with null and in-memory implementations
//! - [`events`] - lifecycle event broadcasting
//! - [`config`] - layered TOML/environment configuration
//! - [`error`] - structured error handling
//! - [`logging`] - structured tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use erasure_core::config::ConfigManager;
//! use erasure_core::orchestration::ErasureOrchestrator;
//! use erasure_core::services::{Collaborators, InMemoryIdentityProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! erasure_core::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load()?;
//! let identity = Arc::new(InMemoryIdentityProvider::new());
//! let orchestrator = ErasureOrchestrator::new(manager.config().clone(), Collaborators::new(identity))?;
//!
//! orchestrator.scheduler().start();
//! // ... serve requests ...
//! orchestrator.scheduler().stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod services;
pub mod state_machine;

pub use config::{ConfigManager, ErasureConfig};
pub use error::{ConflictError, ErasureError, Result, ValidationError};
pub use events::{EventPublisher, LifecycleEvent};
pub use models::{DataCategory, DeletionRequest, LegalHold, StepId, StepInstance};
pub use orchestration::{
    CancellationReceipt, ErasureOrchestrator, ErasureStatistics, SubmissionReceipt,
    SubmitDeletionRequest, TickOutcome,
};
pub use state_machine::{DeletionStatus, StepStatus};
