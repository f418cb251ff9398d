use async_trait::async_trait;
use uuid::Uuid;

use super::errors::CollaboratorResult;

/// Sends subject-facing notifications about a deletion request
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, request_id: Uuid, event_type: &str) -> CollaboratorResult<()>;
}

/// Send a notification whose failure must not affect the request
pub async fn notify_best_effort(notifier: &dyn Notifier, request_id: Uuid, event_type: &str) {
    if let Err(err) = notifier.send(request_id, event_type).await {
        tracing::warn!(
            request_id = %request_id,
            event_type = %event_type,
            error = %err,
            "Best-effort notification failed"
        );
    }
}

/// Deployment without outbound notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, request_id: Uuid, event_type: &str) -> CollaboratorResult<()> {
        tracing::debug!(request_id = %request_id, event_type = %event_type, "Notification dropped (no notifier configured)");
        Ok(())
    }
}
