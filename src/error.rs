//! Error types for the Flowstate core.
//!
//! Each component owns a focused error enum; [`FlowstateError`] unifies them for
//! callers that drive several components at once.

use crate::config::ConfigurationError;
use crate::models::{AsyncKey, StepInstanceId, WorkflowInstanceId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowstateError {
    #[error("Step data error: {0}")]
    StepData(#[from] StepDataError),
    #[error("Async key error: {0}")]
    AsyncKey(#[from] AsyncKeyError),
    #[error("Processor error: {0}")]
    Processor(#[from] ProcessorError),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("Step error: {0}")]
    Step(#[from] StepError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for FlowstateError {
    fn from(error: serde_json::Error) -> Self {
        FlowstateError::Internal(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, FlowstateError>;

/// Errors raised by the keyed data stores.
///
/// There is intentionally no conflict variant: merges resolve last-writer-wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepDataError {
    #[error("Step instance {0} not found")]
    StepNotFound(StepInstanceId),
    #[error("Workflow instance {0} not found")]
    WorkflowNotFound(WorkflowInstanceId),
}

pub type StepDataResult<T> = std::result::Result<T, StepDataError>;

/// Misuse of the async completion registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsyncKeyError {
    #[error("Unknown async key {0}")]
    UnknownKey(AsyncKey),
    #[error("Async key {key} already resolved as {state}")]
    AlreadyResolved { key: AsyncKey, state: String },
    #[error("Async key {0} already exists")]
    DuplicateKey(AsyncKey),
}

pub type AsyncKeyResult<T> = std::result::Result<T, AsyncKeyError>;

/// Failure of a processor stage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessorError {
    /// Transform failed for one record; the batch carries on
    #[error("Processor {stage} failed on record: {reason}")]
    RecordFailed { stage: String, reason: String },
    /// The processor asked to stop the rest of the batch
    #[error("Processor {stage} aborted batch: {reason}")]
    BatchAbort { stage: String, reason: String },
    /// The downstream sink refused an output record
    #[error("Downstream sink rejected record from {stage}: {source}")]
    SinkRejected { stage: String, source: SinkError },
    #[error("Processor {stage} misconfigured: {reason}")]
    InvalidConfiguration { stage: String, reason: String },
}

impl ProcessorError {
    pub fn record_failed(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RecordFailed {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    pub fn batch_abort(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BatchAbort {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    pub fn is_batch_abort(&self) -> bool {
        matches!(self, Self::BatchAbort { .. })
    }
}

pub type ProcessorResult<T> = std::result::Result<T, ProcessorError>;

/// Failure reported by a downstream record sink
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    #[error("Sink is closed")]
    Closed,
    #[error("Record rejected: {0}")]
    Rejected(String),
    #[error("Step data sink failed: {0}")]
    StepData(#[from] StepDataError),
}

/// Failure of a step's entry or resumption behavior
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("{code}: {message}")]
    Raised { code: String, message: String },
    #[error("Step panicked: {0}")]
    Panicked(String),
    #[error("Step {step} cannot be resumed: {reason}")]
    NotResumable { step: StepInstanceId, reason: String },
    #[error("Step {0} was already started")]
    AlreadyStarted(StepInstanceId),
    #[error(transparent)]
    StepData(#[from] StepDataError),
    #[error(transparent)]
    AsyncKey(#[from] AsyncKeyError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

impl StepError {
    /// Raise a business error with an error code, as step code would throw one
    pub fn raise(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type StepResult<T> = std::result::Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_component_errors_convert_into_flowstate_error() {
        let key = AsyncKey::from("abc");
        let err: FlowstateError = AsyncKeyError::UnknownKey(key).into();
        assert_eq!(err.to_string(), "Async key error: Unknown async key abc");

        let step = StepInstanceId::new(WorkflowInstanceId::from(Uuid::nil()), "s1");
        let err: FlowstateError = StepDataError::StepNotFound(step).into();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_batch_abort_detection() {
        assert!(ProcessorError::batch_abort("p", "stop").is_batch_abort());
        assert!(!ProcessorError::record_failed("p", "bad").is_batch_abort());
    }
}
