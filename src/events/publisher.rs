use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::StepId;
use crate::services::AuditEvent;

/// Fan-out publisher for erasure lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<LifecycleEvent>,
}

/// Event that has been published
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    pub name: String,
    pub request_id: Option<Uuid>,
    pub subject_id: String,
    pub step_id: Option<StepId>,
    pub status: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl From<&AuditEvent> for LifecycleEvent {
    fn from(event: &AuditEvent) -> Self {
        Self {
            name: event.event_type.clone(),
            request_id: event.request_id,
            subject_id: event.subject_id.clone(),
            step_id: event.step_id,
            status: event.to_status.clone(),
            published_at: event.recorded_at,
        }
    }
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to every current subscriber
    pub fn publish(&self, event: LifecycleEvent) {
        // No subscribers is normal; events are only observed when someone listens
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
