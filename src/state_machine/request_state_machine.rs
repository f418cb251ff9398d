use chrono::{DateTime, Utc};

use super::{
    errors::{guard_failed, StateMachineError, StateMachineResult},
    events::RequestEvent,
    states::DeletionStatus,
};
use crate::models::DeletionRequest;

/// Transition table and guards for deletion requests
pub struct RequestStateMachine;

impl RequestStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: DeletionStatus,
        event: &RequestEvent,
    ) -> StateMachineResult<DeletionStatus> {
        let target = match (current_state, event) {
            (DeletionStatus::Pending, RequestEvent::Start) => DeletionStatus::InProgress,
            (DeletionStatus::Pending, RequestEvent::Cancel) => DeletionStatus::Cancelled,
            (DeletionStatus::InProgress, RequestEvent::Complete) => DeletionStatus::Completed,
            (DeletionStatus::InProgress, RequestEvent::Fail(_)) => DeletionStatus::Failed,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: Some(from_state.to_string()),
                    to: format!("{event:?}"),
                })
            }
        };

        Ok(target)
    }

    /// Apply an event to a request, stamping lifecycle metadata
    pub fn transition(
        request: &mut DeletionRequest,
        event: RequestEvent,
        at: DateTime<Utc>,
    ) -> StateMachineResult<DeletionStatus> {
        let target = Self::determine_target_state(request.status, &event)?;

        if event == RequestEvent::Complete && !request.all_required_steps_satisfied() {
            return Err(guard_failed(format!(
                "Request {} has required steps that are not completed",
                request.request_id
            )));
        }

        match event {
            RequestEvent::Start => {
                request.started_at = Some(at);
            }
            RequestEvent::Complete | RequestEvent::Fail(_) => {
                request.current_step_id = None;
                request.metadata.actual_completion_time = Some(at);
                let started = request.started_at.unwrap_or(request.context.requested_at);
                let elapsed = (at - started).num_milliseconds().max(0);
                request.metadata.processing_time_ms = u64::try_from(elapsed).ok();
            }
            RequestEvent::Cancel => {
                request.cancelled_at = Some(at);
            }
        }

        request.status = target;
        Ok(target)
    }
}
