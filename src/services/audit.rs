use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::CollaboratorResult;
use crate::models::StepId;

/// One append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: String,
    pub request_id: Option<Uuid>,
    pub subject_id: String,
    pub step_id: Option<StepId>,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub actor: Option<String>,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        event_type: impl Into<String>,
        subject_id: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            request_id: None,
            subject_id: subject_id.into(),
            step_id: None,
            from_status: None,
            to_status: None,
            actor: None,
            detail: None,
            recorded_at,
        }
    }

    pub fn for_request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn for_step(mut self, step_id: StepId) -> Self {
        self.step_id = Some(step_id);
        self
    }

    pub fn transition(mut self, from: impl ToString, to: impl ToString) -> Self {
        self.from_status = Some(from.to_string());
        self.to_status = Some(to.to_string());
        self
    }

    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> CollaboratorResult<()>;
}

/// Writes the audit trail into the structured log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> CollaboratorResult<()> {
        tracing::info!(
            target: "erasure_audit",
            event_type = %event.event_type,
            request_id = ?event.request_id,
            subject_id = %event.subject_id,
            step_id = ?event.step_id,
            from_status = ?event.from_status,
            to_status = ?event.to_status,
            actor = ?event.actor,
            detail = ?event.detail,
            recorded_at = %event.recorded_at.to_rfc3339(),
            "AUDIT"
        );
        Ok(())
    }
}
