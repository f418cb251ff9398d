use serde::{Deserialize, Serialize};

/// Events that can trigger deletion request transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RequestEvent {
    /// Queue processor picked the request up
    Start,
    /// Every required step is satisfied
    Complete,
    /// A required step failed permanently
    Fail(String),
    /// Caller withdrew the request before processing
    Cancel,
}

impl RequestEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
            Self::Cancel => "cancel",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Events that can trigger pipeline step transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StepEvent {
    /// Begin an attempt
    Start,
    /// Attempt succeeded
    Complete,
    /// Attempt failed and no retry remains
    Fail(String),
    /// Attempt failed and another one is scheduled
    Retry(String),
    /// Step is not required and is passed over
    Skip,
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
            Self::Retry(_) => "retry",
            Self::Skip => "skip",
        }
    }

    /// Extract error message if this event carries one
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) | Self::Retry(msg) => Some(msg),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }

    /// Create a retry event with the error that caused it
    pub fn retry_after_error(error: impl Into<String>) -> Self {
        Self::Retry(error.into())
    }
}
