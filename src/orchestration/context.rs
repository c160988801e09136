use super::runtime::WorkflowRuntime;
use super::step_handler::Completion;
use crate::error::StepResult;
use crate::events::{NotificationHandler, PublishReport, SubscriptionHandle};
use crate::models::{AsyncKey, StepData, StepInstanceId, WorkflowInstanceId};
use serde_json::Value;
use std::sync::Arc;

/// Handle step code uses to reach its own state and the shared services.
///
/// Bound to exactly one step instance; every data call is scoped to it or to
/// its workflow instance.
#[derive(Clone)]
pub struct StepContext {
    runtime: Arc<WorkflowRuntime>,
    step_instance_id: StepInstanceId,
}

impl StepContext {
    pub fn new(runtime: Arc<WorkflowRuntime>, step_instance_id: StepInstanceId) -> Self {
        Self {
            runtime,
            step_instance_id,
        }
    }

    pub fn step_instance_id(&self) -> &StepInstanceId {
        &self.step_instance_id
    }

    pub fn workflow_instance_id(&self) -> WorkflowInstanceId {
        self.step_instance_id.workflow_instance_id
    }

    pub fn runtime(&self) -> &Arc<WorkflowRuntime> {
        &self.runtime
    }

    pub fn step_data(&self) -> StepResult<StepData> {
        Ok(self.runtime.step_data().read(&self.step_instance_id)?)
    }

    /// Merge `delta` into this step's data, returning the full result
    pub fn update_step_data(&self, delta: StepData) -> StepResult<StepData> {
        Ok(self
            .runtime
            .step_data()
            .merge(&self.step_instance_id, delta)?)
    }

    pub fn dynamic_data(&self) -> StepResult<StepData> {
        Ok(self
            .runtime
            .dynamic_data()
            .read(&self.workflow_instance_id())?)
    }

    /// Merge `delta` into the workflow instance's shared data
    pub fn update_dynamic_data(&self, delta: StepData) -> StepResult<StepData> {
        Ok(self
            .runtime
            .dynamic_data()
            .merge(&self.workflow_instance_id(), delta)?)
    }

    pub fn static_data(&self) -> StepResult<Arc<StepData>> {
        Ok(self.runtime.static_data(self.workflow_instance_id())?)
    }

    pub fn publish(&self, topic: &str, payload: Value) -> PublishReport {
        self.runtime.bus().publish(topic, payload)
    }

    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        handler: Arc<dyn NotificationHandler>,
    ) -> SubscriptionHandle {
        self.runtime.bus().subscribe(topic, handler)
    }

    /// Issue a key bound to this step without suspending yet
    pub fn issue_async_key(&self) -> AsyncKey {
        self.runtime
            .async_completions()
            .issue(&self.step_instance_id)
    }

    /// Issue a key and suspend on it
    pub fn suspend(&self) -> StepResult<Completion> {
        Ok(Completion::Suspended(self.issue_async_key()))
    }

    /// Suspend on a caller-chosen key
    pub fn submit_async_key(&self, key: impl Into<AsyncKey>) -> StepResult<Completion> {
        let key = key.into();
        self.runtime
            .async_completions()
            .submit(&self.step_instance_id, key.clone())?;
        Ok(Completion::Suspended(key))
    }
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("step_instance_id", &self.step_instance_id)
            .finish()
    }
}
