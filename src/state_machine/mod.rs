// State machine module for the erasure pipeline
//
// Pure transition tables for deletion requests and their steps. Callers hold
// the entity; the state machines only validate and apply transitions.

pub mod errors;
pub mod events;
pub mod request_state_machine;
pub mod states;
pub mod step_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::{RequestEvent, StepEvent};
pub use request_state_machine::RequestStateMachine;
pub use states::{DeletionStatus, StepStatus};
pub use step_state_machine::StepStateMachine;
