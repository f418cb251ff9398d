use chrono::{DateTime, Utc};

use super::{
    errors::{guard_failed, StateMachineError, StateMachineResult},
    events::StepEvent,
    states::StepStatus,
};
use crate::constants::MAX_STEP_RETRIES;
use crate::models::StepInstance;

/// Transition table and guards for pipeline steps
pub struct StepStateMachine;

impl StepStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: StepStatus,
        event: &StepEvent,
    ) -> StateMachineResult<StepStatus> {
        let target = match (current_state, event) {
            (StepStatus::Pending, StepEvent::Start) => StepStatus::InProgress,
            (StepStatus::Pending, StepEvent::Skip) => StepStatus::Skipped,
            // Abandoned before its next attempt, e.g. while waiting out a backoff
            (StepStatus::Pending, StepEvent::Fail(_)) => StepStatus::Failed,

            (StepStatus::InProgress, StepEvent::Complete) => StepStatus::Completed,
            (StepStatus::InProgress, StepEvent::Fail(_)) => StepStatus::Failed,

            // A failed attempt that will be retried goes back to pending
            (StepStatus::InProgress, StepEvent::Retry(_)) => StepStatus::Pending,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: Some(from_state.to_string()),
                    to: format!("{event:?}"),
                })
            }
        };

        Ok(target)
    }

    /// Apply an event to a step, stamping timestamps and retry bookkeeping
    pub fn transition(
        step: &mut StepInstance,
        event: StepEvent,
        at: DateTime<Utc>,
    ) -> StateMachineResult<StepStatus> {
        let target = Self::determine_target_state(step.status, &event)?;
        Self::check_guards(step, &event)?;

        match &event {
            StepEvent::Start => {
                step.started_at = Some(at);
                step.completed_at = None;
            }
            StepEvent::Complete => {
                step.completed_at = Some(at);
                step.error = None;
            }
            StepEvent::Fail(message) => {
                step.completed_at = Some(at);
                step.error = Some(message.clone());
            }
            StepEvent::Retry(message) => {
                step.retry_count += 1;
                step.error = Some(message.clone());
            }
            StepEvent::Skip => {
                step.completed_at = Some(at);
            }
        }

        step.status = target;
        Ok(target)
    }

    fn check_guards(step: &StepInstance, event: &StepEvent) -> StateMachineResult<()> {
        match event {
            StepEvent::Skip if step.required => Err(guard_failed(format!(
                "Required step {} cannot be skipped",
                step.id
            ))),
            StepEvent::Retry(_) if step.retry_count >= MAX_STEP_RETRIES => Err(guard_failed(
                format!("Step {} exhausted its {MAX_STEP_RETRIES} retries", step.id),
            )),
            _ => Ok(()),
        }
    }
}
