//! # Identifiers
//!
//! Opaque identifiers for workflow instances, step instances and async
//! correlation tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one running workflow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowInstanceId(Uuid);

impl WorkflowInstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorkflowInstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for WorkflowInstanceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for WorkflowInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One execution of a named step within a workflow instance.
///
/// `index` separates repeated executions of the same step (array steps) and is
/// zero for ordinary steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepInstanceId {
    pub workflow_instance_id: WorkflowInstanceId,
    pub step_name: String,
    pub index: u32,
}

impl StepInstanceId {
    pub fn new(workflow_instance_id: WorkflowInstanceId, step_name: impl Into<String>) -> Self {
        Self {
            workflow_instance_id,
            step_name: step_name.into(),
            index: 0,
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }
}

impl fmt::Display for StepInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}[{}]",
            self.workflow_instance_id, self.step_name, self.index
        )
    }
}

/// Correlation token handed out when a step suspends
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncKey(String);

impl AsyncKey {
    /// Draw a fresh UUID-backed token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AsyncKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AsyncKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AsyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_instance_display() {
        let wf = WorkflowInstanceId::from(Uuid::nil());
        let step = StepInstanceId::new(wf, "validate").with_index(2);
        assert_eq!(
            step.to_string(),
            "00000000-0000-0000-0000-000000000000/validate[2]"
        );
    }

    #[test]
    fn test_async_key_serde_is_transparent() {
        let key = AsyncKey::from("order-42");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"order-42\"");
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(AsyncKey::generate(), AsyncKey::generate());
    }
}
