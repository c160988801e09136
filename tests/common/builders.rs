#![allow(dead_code)]

use flowstate_core::async_completion::AsyncOutcome;
use flowstate_core::error::{StepError, StepResult};
use flowstate_core::events::{HandlerError, Notification, NotificationHandler};
use flowstate_core::models::{AsyncKey, StepData, StepInstanceId};
use flowstate_core::orchestration::{
    Completion, StepContext, StepEntry, StepExecutor, StepResumable, WorkflowRuntime,
};
use flowstate_core::step_data;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fresh runtime + executor and one started workflow instance
pub fn executor_with_workflow() -> (Arc<StepExecutor>, StepInstanceIdFactory) {
    let runtime = Arc::new(WorkflowRuntime::default());
    let executor = StepExecutor::new(Arc::clone(&runtime));
    let wf = runtime.start_workflow_instance(step_data!({"order_id": 42}));
    (executor, StepInstanceIdFactory { wf })
}

pub struct StepInstanceIdFactory {
    pub wf: flowstate_core::models::WorkflowInstanceId,
}

impl StepInstanceIdFactory {
    pub fn step(&self, name: &str) -> StepInstanceId {
        StepInstanceId::new(self.wf, name)
    }
}

/// Records every notification it receives
#[derive(Default)]
pub struct RecordingHandler {
    pub name: String,
    pub seen: Mutex<Vec<(String, Value)>>,
}

impl RecordingHandler {
    pub fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn topics(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.seen.lock().iter().map(|(_, p)| p.clone()).collect()
    }
}

impl NotificationHandler for RecordingHandler {
    fn handle(&self, notification: &Notification) -> Result<(), HandlerError> {
        self.seen
            .lock()
            .push((notification.topic.clone(), (*notification.payload).clone()));
        Ok(())
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// Step that writes default data in primary, suspends, and on resume stores
/// what it was resumed with
pub struct ApprovalStep {
    pub primary_runs: AtomicUsize,
    pub resume_runs: AtomicUsize,
    pub resumed_with: Mutex<Vec<AsyncOutcome>>,
    /// Complete the own key from inside primary, before returning
    pub self_complete: bool,
    /// Suspend on this caller-chosen key instead of a generated one
    pub submitted_key: Option<AsyncKey>,
}

impl ApprovalStep {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::plain())
    }

    pub fn self_completing() -> Arc<Self> {
        Arc::new(Self {
            self_complete: true,
            ..Self::plain()
        })
    }

    pub fn with_submitted_key(key: &str) -> Arc<Self> {
        Arc::new(Self {
            submitted_key: Some(AsyncKey::from(key)),
            ..Self::plain()
        })
    }

    fn plain() -> Self {
        Self {
            primary_runs: AtomicUsize::new(0),
            resume_runs: AtomicUsize::new(0),
            resumed_with: Mutex::new(Vec::new()),
            self_complete: false,
            submitted_key: None,
        }
    }

    pub fn primary_runs(&self) -> usize {
        self.primary_runs.load(Ordering::SeqCst)
    }

    pub fn resume_runs(&self) -> usize {
        self.resume_runs.load(Ordering::SeqCst)
    }
}

impl StepEntry for ApprovalStep {
    fn name(&self) -> &str {
        "approval"
    }

    fn default_step_data(&self) -> StepData {
        step_data!({"test": "default"})
    }

    fn primary(&self, ctx: &StepContext) -> StepResult<Completion> {
        self.primary_runs.fetch_add(1, Ordering::SeqCst);
        ctx.update_step_data(step_data!({"requested": true}))?;

        if let Some(key) = &self.submitted_key {
            return ctx.submit_async_key(key.clone());
        }

        let key = ctx.issue_async_key();
        if self.self_complete {
            ctx.runtime()
                .async_completions()
                .complete(&key, json!({"early": true}))?;
            // the resumption must not run before this step has suspended
            assert_eq!(self.resume_runs(), 0);
        }
        Ok(Completion::Suspended(key))
    }

    fn as_resumable(&self) -> Option<&dyn StepResumable> {
        Some(self)
    }
}

impl StepResumable for ApprovalStep {
    fn resume(&self, ctx: &StepContext, outcome: AsyncOutcome) -> StepResult<Completion> {
        self.resume_runs.fetch_add(1, Ordering::SeqCst);
        self.resumed_with.lock().push(outcome.clone());
        match outcome {
            AsyncOutcome::Completed(payload) => {
                ctx.update_step_data(step_data!({"approval": payload}))?;
                Ok(Completion::Complete)
            }
            AsyncOutcome::Expired => Err(StepError::raise("approval_timeout", "nobody answered")),
        }
    }
}

/// Step that merges one distinct key into the shared dynamic data
pub struct DynamicWriterStep {
    pub key: String,
}

impl StepEntry for DynamicWriterStep {
    fn name(&self) -> &str {
        "dynamic_writer"
    }

    fn primary(&self, ctx: &StepContext) -> StepResult<Completion> {
        let mut delta = StepData::new();
        delta.insert(self.key.clone(), json!(ctx.step_instance_id().index));
        ctx.update_dynamic_data(delta)?;
        Ok(Completion::Complete)
    }
}
