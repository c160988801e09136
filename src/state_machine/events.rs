use crate::models::AsyncKey;
use serde::{Deserialize, Serialize};

/// Events that can trigger step state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StepEvent {
    /// Run the entry behavior
    Start,
    /// Entry or resumption returned a suspension on this key
    Suspend(AsyncKey),
    /// The key the step waits on was resolved
    Resume(AsyncKey),
    /// Step logic finished normally
    Complete,
    /// Step logic failed with error message
    Fail(String),
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Suspend(_) => "suspend",
            Self::Resume(_) => "resume",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn async_key(&self) -> Option<&AsyncKey> {
        match self {
            Self::Suspend(key) | Self::Resume(key) => Some(key),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
