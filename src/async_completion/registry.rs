use super::types::{AsyncKeyState, AsyncKeyStatus, AsyncOutcome, Resumption, ResumptionHandler};
use crate::error::{AsyncKeyError, AsyncKeyResult};
use crate::logging::log_async_key_operation;
use crate::models::{AsyncKey, StepInstanceId, WorkflowInstanceId};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Weak;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct KeyRecord {
    step_instance_id: StepInstanceId,
    state: AsyncKeyState,
    payload: Option<Value>,
    issued_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl KeyRecord {
    fn pending(step_instance_id: StepInstanceId) -> Self {
        Self {
            step_instance_id,
            state: AsyncKeyState::Pending,
            payload: None,
            issued_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn status(&self, key: &AsyncKey) -> AsyncKeyStatus {
        AsyncKeyStatus {
            key: key.clone(),
            step_instance_id: self.step_instance_id.clone(),
            state: self.state,
            payload: self.payload.clone(),
            issued_at: self.issued_at,
            resolved_at: self.resolved_at,
        }
    }
}

/// Issues correlation keys to suspending steps and routes their resolution
/// back as resumptions.
///
/// A key leaves `Pending` exactly once. The check and the transition happen
/// under the key's map shard lock, so of two racing `complete`/`expire` calls
/// only one wins; the loser gets `AlreadyResolved`. The resumption is
/// dispatched after that lock is released.
///
/// Purged keys are remembered as retired tokens so no token is ever bound
/// twice over the registry's lifetime.
pub struct AsyncCompletionRegistry {
    keys: DashMap<AsyncKey, KeyRecord>,
    retired: DashSet<AsyncKey>,
    resumption_handler: RwLock<Option<Weak<dyn ResumptionHandler>>>,
}

impl AsyncCompletionRegistry {
    pub fn new() -> Self {
        Self {
            keys: DashMap::new(),
            retired: DashSet::new(),
            resumption_handler: RwLock::new(None),
        }
    }

    /// Route resumptions to `handler`. Only a weak reference is kept.
    pub fn attach_resumption_handler(&self, handler: Weak<dyn ResumptionHandler>) {
        *self.resumption_handler.write() = Some(handler);
    }

    /// Bind a fresh key to `step_instance_id`
    pub fn issue(&self, step_instance_id: &StepInstanceId) -> AsyncKey {
        loop {
            let key = AsyncKey::generate();
            if let Entry::Vacant(vacant) = self.keys.entry(key.clone()) {
                if self.retired.contains(&key) {
                    continue;
                }
                vacant.insert(KeyRecord::pending(step_instance_id.clone()));
                debug!(async_key = %key, step_instance = %step_instance_id, "Issued async key");
                return key;
            }
        }
    }

    /// Bind a caller-chosen key to `step_instance_id`
    pub fn submit(&self, step_instance_id: &StepInstanceId, key: AsyncKey) -> AsyncKeyResult<()> {
        // retired tokens are checked under the shard lock purge inserts them under
        match self.keys.entry(key.clone()) {
            Entry::Occupied(_) => Err(AsyncKeyError::DuplicateKey(key)),
            Entry::Vacant(_) if self.retired.contains(&key) => Err(AsyncKeyError::DuplicateKey(key)),
            Entry::Vacant(vacant) => {
                vacant.insert(KeyRecord::pending(step_instance_id.clone()));
                debug!(async_key = %key, step_instance = %step_instance_id, "Submitted async key");
                Ok(())
            }
        }
    }

    /// Resolve `key` with `payload` and resume its step
    pub fn complete(&self, key: &AsyncKey, payload: Value) -> AsyncKeyResult<()> {
        self.resolve(key, AsyncOutcome::Completed(payload))
    }

    /// Resolve `key` as timed out and resume its step
    pub fn expire(&self, key: &AsyncKey) -> AsyncKeyResult<()> {
        self.resolve(key, AsyncOutcome::Expired)
    }

    pub fn status(&self, key: &AsyncKey) -> AsyncKeyResult<AsyncKeyStatus> {
        self.keys
            .get(key)
            .map(|record| record.status(key))
            .ok_or_else(|| AsyncKeyError::UnknownKey(key.clone()))
    }

    /// Keys still pending that were issued before `cutoff`; the input an
    /// external timeout policy needs to decide what to expire
    pub fn pending_keys_issued_before(&self, cutoff: DateTime<Utc>) -> Vec<AsyncKey> {
        self.keys
            .iter()
            .filter(|entry| {
                entry.state == AsyncKeyState::Pending && entry.issued_at < cutoff
            })
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Every key ever bound to `step_instance_id`, oldest first
    pub fn keys_for_step(&self, step_instance_id: &StepInstanceId) -> Vec<AsyncKeyStatus> {
        let mut statuses: Vec<AsyncKeyStatus> = self
            .keys
            .iter()
            .filter(|entry| &entry.step_instance_id == step_instance_id)
            .map(|entry| entry.status(entry.key()))
            .collect();
        statuses.sort_by_key(|status| status.issued_at);
        statuses
    }

    /// Retention hook: forget every key bound to a step of `workflow_instance_id`.
    /// The tokens stay retired and are never accepted again.
    pub fn purge_workflow_instance(&self, workflow_instance_id: WorkflowInstanceId) -> usize {
        let mut purged = 0;
        self.keys.retain(|key, record| {
            if record.step_instance_id.workflow_instance_id != workflow_instance_id {
                return true;
            }
            self.retired.insert(key.clone());
            purged += 1;
            false
        });
        purged
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn resolve(&self, key: &AsyncKey, outcome: AsyncOutcome) -> AsyncKeyResult<()> {
        let resumption = {
            let mut record = self
                .keys
                .get_mut(key)
                .ok_or_else(|| AsyncKeyError::UnknownKey(key.clone()))?;

            if record.state != AsyncKeyState::Pending {
                return Err(AsyncKeyError::AlreadyResolved {
                    key: key.clone(),
                    state: record.state.to_string(),
                });
            }

            record.state = match outcome {
                AsyncOutcome::Completed(_) => AsyncKeyState::Completed,
                AsyncOutcome::Expired => AsyncKeyState::Expired,
            };
            record.payload = outcome.payload().cloned();
            record.resolved_at = Some(Utc::now());

            Resumption {
                key: key.clone(),
                step_instance_id: record.step_instance_id.clone(),
                outcome,
            }
        };

        let state = if resumption.outcome.is_expired() {
            AsyncKeyState::Expired
        } else {
            AsyncKeyState::Completed
        };
        log_async_key_operation(
            "resolve",
            key.as_str(),
            Some(&resumption.step_instance_id.to_string()),
            &state.to_string(),
        );
        self.dispatch(resumption);
        Ok(())
    }

    fn dispatch(&self, resumption: Resumption) {
        let handler = self
            .resumption_handler
            .read()
            .as_ref()
            .and_then(Weak::upgrade);

        match handler {
            Some(handler) => handler.resume(resumption),
            None => warn!(
                async_key = %resumption.key,
                step_instance = %resumption.step_instance_id,
                "No resumption handler attached, resolution recorded without resuming"
            ),
        }
    }
}

impl Default for AsyncCompletionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
