use std::sync::Arc;

use crate::events::{EventPublisher, LifecycleEvent};
use crate::logging::log_error;
use crate::services::{AuditEvent, AuditSink};

/// Records every lifecycle transition to the audit sink and republishes it to
/// event subscribers. An audit sink failure never blocks the pipeline; it is
/// logged and the event is still published.
#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    publisher: EventPublisher,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>, publisher: EventPublisher) -> Self {
        Self { sink, publisher }
    }

    pub async fn record(&self, event: AuditEvent) {
        let lifecycle = LifecycleEvent::from(&event);
        let event_type = event.event_type.clone();

        if let Err(err) = self.sink.record(event).await {
            log_error(
                "audit_trail",
                "record",
                &err.to_string(),
                Some(&event_type),
            );
        }

        self.publisher.publish(lifecycle);
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}
