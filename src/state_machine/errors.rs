use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Step is suspended on {expected} but resumption carried {actual}")]
    KeyMismatch { expected: String, actual: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
