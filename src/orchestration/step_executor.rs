//! # Step Executor
//!
//! Runs step instances and routes async resumptions back into them.
//!
//! ## Exclusivity
//!
//! Each step instance has a slot holding its state machine and a `running`
//! flag. Step code never runs while the slot lock is held. A resumption that
//! arrives while the instance is running (for instance the key is completed
//! before `primary` has even returned `Suspended`) is queued on the slot and
//! the thread already running the instance drains the queue once it settles.
//! The instance therefore never runs on two threads at once and no resumption
//! is lost.

use super::context::StepContext;
use super::runtime::WorkflowRuntime;
use super::step_handler::{Completion, StepEntry, StepOutcome};
use crate::async_completion::{AsyncKeyState, AsyncOutcome, Resumption, ResumptionHandler};
use crate::error::{StepError, StepResult};
use crate::events::bus::panic_message;
use crate::logging::{log_error, log_step_operation};
use crate::models::{AsyncKey, StepInstanceId, WorkflowInstanceId};
use crate::state_machine::{publish_transition, StepEvent, StepState, StepStateMachine, Transition};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

struct StepSlot {
    step: Arc<dyn StepEntry>,
    machine: StepStateMachine,
    running: bool,
    deferred: VecDeque<Resumption>,
    last_outcome: Option<StepOutcome>,
}

type SharedSlot = Arc<Mutex<StepSlot>>;

pub struct StepExecutor {
    runtime: Arc<WorkflowRuntime>,
    slots: DashMap<StepInstanceId, SharedSlot>,
    concurrency: Arc<Semaphore>,
}

impl StepExecutor {
    /// Create an executor and attach it to the runtime's async registry as
    /// the resumption handler
    pub fn new(runtime: Arc<WorkflowRuntime>) -> Arc<Self> {
        let max_concurrent_steps = runtime.config().execution.max_concurrent_steps;
        let executor = Arc::new(Self {
            runtime,
            slots: DashMap::new(),
            concurrency: Arc::new(Semaphore::new(max_concurrent_steps)),
        });

        let handler: Arc<dyn ResumptionHandler> = executor.clone();
        executor
            .runtime
            .async_completions()
            .attach_resumption_handler(Arc::downgrade(&handler));

        info!(
            max_concurrent_steps = max_concurrent_steps,
            "Step executor attached to async completion registry"
        );
        executor
    }

    pub fn runtime(&self) -> &Arc<WorkflowRuntime> {
        &self.runtime
    }

    /// Run `step` as the instance `step_instance_id` on the calling thread.
    ///
    /// Returns the instance's latest outcome once it settles. If resumptions
    /// arrived during the run they are applied before returning, so the
    /// outcome may already reflect a resumed run.
    pub fn execute(&self, step: Arc<dyn StepEntry>, step_instance_id: StepInstanceId) -> StepOutcome {
        let mut machine = StepStateMachine::new(step_instance_id.clone());
        let start = match machine.transition(StepEvent::Start) {
            Ok(transition) => transition,
            Err(e) => {
                error!(step_instance = %step_instance_id, error = %e, "Could not start step");
                return StepOutcome::Failed(StepError::AlreadyStarted(step_instance_id));
            }
        };

        let slot: SharedSlot = Arc::new(Mutex::new(StepSlot {
            step: Arc::clone(&step),
            machine,
            running: true,
            deferred: VecDeque::new(),
            last_outcome: None,
        }));

        match self.slots.entry(step_instance_id.clone()) {
            Entry::Occupied(_) => {
                warn!(step_instance = %step_instance_id, "Step instance already started");
                return StepOutcome::Failed(StepError::AlreadyStarted(step_instance_id));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&slot));
            }
        }

        log_step_operation("execute", &step_instance_id.to_string(), "in_progress", Some(step.name()));
        self.publish(&step_instance_id, &start);

        self.runtime
            .step_data()
            .initialize(&step_instance_id, step.default_step_data());

        let ctx = StepContext::new(Arc::clone(&self.runtime), step_instance_id.clone());
        let result = Self::run_guarded(&step_instance_id, || step.primary(&ctx));
        self.drive(&slot, &step_instance_id, result)
    }

    /// Run [`execute`](Self::execute) on the blocking pool, bounded by
    /// `execution.max_concurrent_steps`
    pub async fn execute_async(
        self: Arc<Self>,
        step: Arc<dyn StepEntry>,
        step_instance_id: StepInstanceId,
    ) -> StepOutcome {
        let permit = match Arc::clone(&self.concurrency).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                return StepOutcome::Failed(StepError::raise("executor_closed", e.to_string()))
            }
        };

        let joined = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            self.execute(step, step_instance_id)
        })
        .await;

        joined.unwrap_or_else(|e| StepOutcome::Failed(StepError::Panicked(e.to_string())))
    }

    /// Apply a resumption. Returns the outcome when this call ran the step,
    /// `None` when it was deferred to the running thread or rejected.
    pub fn apply_resumption(&self, resumption: Resumption) -> Option<StepOutcome> {
        let step_instance_id = resumption.step_instance_id.clone();
        let Some(slot) = self
            .slots
            .get(&step_instance_id)
            .map(|slot| Arc::clone(slot.value()))
        else {
            warn!(
                step_instance = %step_instance_id,
                async_key = %resumption.key,
                "Resumption for unknown step instance rejected"
            );
            return None;
        };

        let (step, transition, outcome) = {
            let mut guard = slot.lock();
            if guard.running {
                debug!(
                    step_instance = %step_instance_id,
                    async_key = %resumption.key,
                    "Step instance running, deferring resumption"
                );
                guard.deferred.push_back(resumption);
                return None;
            }

            let transition = match Self::begin_resume(&mut guard, &resumption) {
                Some(transition) => transition,
                None => return None,
            };
            guard.running = true;
            (Arc::clone(&guard.step), transition, resumption.outcome)
        };

        self.publish(&step_instance_id, &transition);
        let result = self.run_resume(&step, &step_instance_id, outcome);
        Some(self.drive(&slot, &step_instance_id, result))
    }

    pub fn state(&self, step_instance_id: &StepInstanceId) -> Option<StepState> {
        self.slots
            .get(step_instance_id)
            .map(|slot| slot.lock().machine.current_state())
    }

    pub fn last_outcome(&self, step_instance_id: &StepInstanceId) -> Option<StepOutcome> {
        self.slots
            .get(step_instance_id)
            .and_then(|slot| slot.lock().last_outcome.clone())
    }

    /// Retention hook: forget the slots of one workflow instance
    pub fn purge_workflow_instance(&self, workflow_instance_id: WorkflowInstanceId) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|id, _| id.workflow_instance_id != workflow_instance_id);
        before.saturating_sub(self.slots.len())
    }

    /// Settle `result`, then keep applying deferred resumptions until the
    /// queue is empty. Called with the slot marked running.
    fn drive(
        &self,
        slot: &SharedSlot,
        step_instance_id: &StepInstanceId,
        mut result: StepResult<Completion>,
    ) -> StepOutcome {
        loop {
            let (outcome, transition) = self.settle(slot, step_instance_id, result);
            if let Some(transition) = transition {
                self.publish(step_instance_id, &transition);
            }

            let Some((step, transition, async_outcome)) = Self::next_deferred(slot) else {
                log_step_operation(
                    "settle",
                    &step_instance_id.to_string(),
                    Self::outcome_status(&outcome),
                    outcome.error().map(|e| e.to_string()).as_deref(),
                );
                return outcome;
            };

            self.publish(step_instance_id, &transition);
            result = self.run_resume(&step, step_instance_id, async_outcome);
        }
    }

    fn settle(
        &self,
        slot: &SharedSlot,
        step_instance_id: &StepInstanceId,
        result: StepResult<Completion>,
    ) -> (StepOutcome, Option<Transition>) {
        let outcome = match result {
            Ok(Completion::Complete) => StepOutcome::Complete,
            Ok(Completion::Suspended(key)) => self.check_suspension_key(slot, step_instance_id, key),
            Err(error) => StepOutcome::Failed(error),
        };

        let event = match &outcome {
            StepOutcome::Complete => StepEvent::Complete,
            StepOutcome::Suspended(key) => StepEvent::Suspend(key.clone()),
            StepOutcome::Failed(error) => StepEvent::fail_with_error(error.to_string()),
        };

        let mut guard = slot.lock();
        let transition = match guard.machine.transition(event) {
            Ok(transition) => Some(transition),
            Err(e) => {
                log_error("step_executor", "settle", &e.to_string(), Some(&step_instance_id.to_string()));
                None
            }
        };
        guard.last_outcome = Some(outcome.clone());
        (outcome, transition)
    }

    /// A step may only suspend on a pending key bound to itself. A key that
    /// already resolved is accepted only while its resumption is queued on
    /// the slot, otherwise nothing could ever resume the instance.
    fn check_suspension_key(
        &self,
        slot: &SharedSlot,
        step_instance_id: &StepInstanceId,
        key: AsyncKey,
    ) -> StepOutcome {
        let status = match self.runtime.async_completions().status(&key) {
            Ok(status) => status,
            Err(e) => return StepOutcome::Failed(e.into()),
        };

        if &status.step_instance_id != step_instance_id {
            return StepOutcome::Failed(StepError::raise(
                "invalid_async_key",
                format!("async key {key} is bound to {}", status.step_instance_id),
            ));
        }

        if status.state == AsyncKeyState::Pending
            || slot.lock().deferred.iter().any(|r| r.key == key)
        {
            return StepOutcome::Suspended(key);
        }

        StepOutcome::Failed(StepError::raise(
            "invalid_async_key",
            format!("async key {key} is already {}", status.state),
        ))
    }

    /// Pop the next deferred resumption that is valid for the slot, or mark
    /// the slot idle when there is none
    fn next_deferred(slot: &SharedSlot) -> Option<(Arc<dyn StepEntry>, Transition, AsyncOutcome)> {
        let mut guard = slot.lock();
        while let Some(resumption) = guard.deferred.pop_front() {
            if let Some(transition) = Self::begin_resume(&mut guard, &resumption) {
                return Some((Arc::clone(&guard.step), transition, resumption.outcome));
            }
        }
        guard.running = false;
        None
    }

    /// Move the machine to in-progress for `resumption`, or log the rejection
    fn begin_resume(slot: &mut StepSlot, resumption: &Resumption) -> Option<Transition> {
        match slot.machine.transition(StepEvent::Resume(resumption.key.clone())) {
            Ok(transition) => Some(transition),
            Err(e) => {
                warn!(
                    step_instance = %resumption.step_instance_id,
                    async_key = %resumption.key,
                    state = %slot.machine.current_state(),
                    error = %e,
                    "Resumption rejected"
                );
                None
            }
        }
    }

    fn run_resume(
        &self,
        step: &Arc<dyn StepEntry>,
        step_instance_id: &StepInstanceId,
        outcome: AsyncOutcome,
    ) -> StepResult<Completion> {
        let ctx = StepContext::new(Arc::clone(&self.runtime), step_instance_id.clone());
        match step.as_resumable() {
            Some(resumable) => {
                Self::run_guarded(step_instance_id, || resumable.resume(&ctx, outcome))
            }
            None => Err(StepError::NotResumable {
                step: step_instance_id.clone(),
                reason: format!("step '{}' has no resumption behavior", step.name()),
            }),
        }
    }

    fn run_guarded<F>(step_instance_id: &StepInstanceId, f: F) -> StepResult<Completion>
    where
        F: FnOnce() -> StepResult<Completion>,
    {
        catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            log_error(
                "step_executor",
                "run_step",
                &format!("step logic panicked: {message}"),
                Some(&step_instance_id.to_string()),
            );
            Err(StepError::Panicked(message))
        })
    }

    fn publish(&self, step_instance_id: &StepInstanceId, transition: &Transition) {
        if let Some(report) = publish_transition(self.runtime.bus(), step_instance_id, transition) {
            if !report.is_clean() {
                debug!(
                    step_instance = %step_instance_id,
                    topic = %report.topic,
                    failures = report.failures.len(),
                    "Lifecycle notification had failing handlers"
                );
            }
        }
    }

    fn outcome_status(outcome: &StepOutcome) -> &'static str {
        match outcome {
            StepOutcome::Complete => "complete",
            StepOutcome::Suspended(_) => "suspended",
            StepOutcome::Failed(_) => "error",
        }
    }
}

impl ResumptionHandler for StepExecutor {
    fn resume(&self, resumption: Resumption) {
        self.apply_resumption(resumption);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepData;
    use crate::orchestration::step_handler::StepResumable;
    use crate::step_data;
    use serde_json::json;

    struct Immediate;

    impl StepEntry for Immediate {
        fn name(&self) -> &str {
            "immediate"
        }

        fn primary(&self, ctx: &StepContext) -> StepResult<Completion> {
            ctx.update_step_data(step_data!({"ran": true}))?;
            Ok(Completion::Complete)
        }
    }

    struct Panicking;

    impl StepEntry for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn primary(&self, _ctx: &StepContext) -> StepResult<Completion> {
            panic!("boom");
        }
    }

    struct SuspendsOnly;

    impl StepEntry for SuspendsOnly {
        fn name(&self) -> &str {
            "suspends_only"
        }

        fn primary(&self, ctx: &StepContext) -> StepResult<Completion> {
            ctx.suspend()
        }
    }

    fn executor() -> Arc<StepExecutor> {
        StepExecutor::new(Arc::new(WorkflowRuntime::default()))
    }

    fn step_id(executor: &StepExecutor, name: &str) -> StepInstanceId {
        let wf = executor.runtime().start_workflow_instance(StepData::new());
        StepInstanceId::new(wf, name)
    }

    #[test]
    fn test_execute_completes_and_records_state() {
        let executor = executor();
        let id = step_id(&executor, "immediate");

        assert_eq!(executor.execute(Arc::new(Immediate), id.clone()), StepOutcome::Complete);
        assert_eq!(executor.state(&id), Some(StepState::Complete));
        assert_eq!(
            executor.runtime().step_data().read(&id).unwrap(),
            step_data!({"ran": true})
        );
    }

    #[test]
    fn test_execute_async_on_current_thread_runtime() {
        let executor = executor();
        let id = step_id(&executor, "immediate");

        let outcome =
            tokio_test::block_on(Arc::clone(&executor).execute_async(Arc::new(Immediate), id.clone()));
        assert_eq!(outcome, StepOutcome::Complete);
        assert_eq!(executor.last_outcome(&id), Some(StepOutcome::Complete));
    }

    #[test]
    fn test_second_execute_of_same_instance_is_rejected() {
        let executor = executor();
        let id = step_id(&executor, "immediate");
        executor.execute(Arc::new(Immediate), id.clone());

        assert_eq!(
            executor.execute(Arc::new(Immediate), id.clone()),
            StepOutcome::Failed(StepError::AlreadyStarted(id))
        );
    }

    #[test]
    fn test_panic_becomes_failed_outcome() {
        let executor = executor();
        let id = step_id(&executor, "panicking");

        let outcome = executor.execute(Arc::new(Panicking), id.clone());
        assert_eq!(outcome, StepOutcome::Failed(StepError::Panicked("boom".to_string())));
        assert_eq!(executor.state(&id), Some(StepState::Error));
    }

    #[test]
    fn test_resuming_non_resumable_step_fails_it() {
        let executor = executor();
        let id = step_id(&executor, "suspends_only");

        let outcome = executor.execute(Arc::new(SuspendsOnly), id.clone());
        let key = outcome.async_key().cloned().unwrap();
        executor
            .runtime()
            .async_completions()
            .complete(&key, json!({}))
            .unwrap();

        assert!(matches!(
            executor.last_outcome(&id),
            Some(StepOutcome::Failed(StepError::NotResumable { .. }))
        ));
        assert_eq!(executor.state(&id), Some(StepState::Error));
    }

    /// Resumes by suspending again on the key it was just resumed with
    #[derive(Default)]
    struct ResuspendsOnSameKey {
        key: Mutex<Option<AsyncKey>>,
    }

    impl StepEntry for ResuspendsOnSameKey {
        fn name(&self) -> &str {
            "resuspends"
        }

        fn primary(&self, ctx: &StepContext) -> StepResult<Completion> {
            let key = ctx.issue_async_key();
            *self.key.lock() = Some(key.clone());
            Ok(Completion::Suspended(key))
        }

        fn as_resumable(&self) -> Option<&dyn StepResumable> {
            Some(self)
        }
    }

    impl StepResumable for ResuspendsOnSameKey {
        fn resume(&self, _ctx: &StepContext, _outcome: AsyncOutcome) -> StepResult<Completion> {
            Ok(Completion::Suspended(self.key.lock().clone().unwrap()))
        }
    }

    #[test]
    fn test_suspending_on_resolved_key_fails_the_step() {
        let executor = executor();
        let id = step_id(&executor, "resuspends");
        let step = Arc::new(ResuspendsOnSameKey::default());

        let key = executor
            .execute(step, id.clone())
            .async_key()
            .cloned()
            .unwrap();
        executor
            .runtime()
            .async_completions()
            .complete(&key, json!(1))
            .unwrap();

        match executor.last_outcome(&id) {
            Some(StepOutcome::Failed(StepError::Raised { code, .. })) => {
                assert_eq!(code, "invalid_async_key")
            }
            other => panic!("expected invalid_async_key failure, got {other:?}"),
        }
        assert_eq!(executor.state(&id), Some(StepState::Error));
    }

    #[test]
    fn test_resumption_for_unknown_instance_is_ignored() {
        let executor = executor();
        let id = step_id(&executor, "never_started");
        let result = executor.apply_resumption(Resumption {
            key: AsyncKey::from("k"),
            step_instance_id: id,
            outcome: AsyncOutcome::Expired,
        });
        assert!(result.is_none());
    }
}
