use crate::models::{AsyncKey, StepInstanceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle of an async key. Leaves `Pending` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncKeyState {
    Pending,
    Completed,
    Expired,
}

impl AsyncKeyState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for AsyncKeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// What a suspended step learns when its key resolves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum AsyncOutcome {
    /// The external party completed the key with this payload
    Completed(Value),
    /// The key was expired by the timeout policy
    Expired,
}

impl AsyncOutcome {
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Completed(payload) => Some(payload),
            Self::Expired => None,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Request to continue the step instance bound to `key`
#[derive(Debug, Clone, PartialEq)]
pub struct Resumption {
    pub key: AsyncKey,
    pub step_instance_id: StepInstanceId,
    pub outcome: AsyncOutcome,
}

/// Externally visible view of one key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsyncKeyStatus {
    pub key: AsyncKey,
    pub step_instance_id: StepInstanceId,
    pub state: AsyncKeyState,
    pub payload: Option<Value>,
    pub issued_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Receiver of resumptions; the step executor implements this
pub trait ResumptionHandler: Send + Sync {
    fn resume(&self, resumption: Resumption);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_display_and_terminality() {
        assert_eq!(AsyncKeyState::Pending.to_string(), "pending");
        assert!(!AsyncKeyState::Pending.is_terminal());
        assert!(AsyncKeyState::Completed.is_terminal());
        assert!(AsyncKeyState::Expired.is_terminal());
    }

    #[test]
    fn test_outcome_payload() {
        let outcome = AsyncOutcome::Completed(json!({"approved": true}));
        assert_eq!(outcome.payload(), Some(&json!({"approved": true})));
        assert!(AsyncOutcome::Expired.is_expired());
        assert_eq!(AsyncOutcome::Expired.payload(), None);
    }
}
