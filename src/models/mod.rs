//! # Erasure Data Model
//!
//! Deletion requests, their embedded pipeline steps, and legal hold overlays.

pub mod deletion_request;
pub mod legal_hold;
pub mod step_instance;

pub use deletion_request::{
    BackupRecord, ComplianceMode, DeletionRequest, RequestContext, RequestMetadata,
    VerificationRecord,
};
pub use legal_hold::{DataCategory, LegalHold};
pub use step_instance::{StepId, StepInstance};
