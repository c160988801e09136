use crate::error::{StepDataError, StepDataResult};
use crate::models::{StepData, StepInstanceId, WorkflowInstanceId};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, trace};

/// Key type a [`KeyedDataStore`] partitions its state by
pub trait DataScope: Clone + Eq + Hash + Display + Send + Sync + 'static {
    /// Workflow instance owning this scope, used by the retention hook
    fn workflow_instance(&self) -> WorkflowInstanceId;

    fn not_found(&self) -> StepDataError;
}

impl DataScope for StepInstanceId {
    fn workflow_instance(&self) -> WorkflowInstanceId {
        self.workflow_instance_id
    }

    fn not_found(&self) -> StepDataError {
        StepDataError::StepNotFound(self.clone())
    }
}

impl DataScope for WorkflowInstanceId {
    fn workflow_instance(&self) -> WorkflowInstanceId {
        *self
    }

    fn not_found(&self) -> StepDataError {
        StepDataError::WorkflowNotFound(*self)
    }
}

/// Concurrent keyed state store.
///
/// Each entry sits behind its own lock: merges on one scope are serialized,
/// merges on different scopes never contend, and reads copy the data under the
/// same lock so they never observe a half-applied merge.
pub struct KeyedDataStore<K: DataScope> {
    entries: DashMap<K, Arc<RwLock<StepData>>>,
    name: &'static str,
}

pub type StepDataStore = KeyedDataStore<StepInstanceId>;
pub type DynamicDataStore = KeyedDataStore<WorkflowInstanceId>;

impl StepDataStore {
    pub fn new() -> Self {
        Self::named("step_data")
    }
}

impl DynamicDataStore {
    pub fn new() -> Self {
        Self::named("dynamic_data")
    }
}

impl Default for StepDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for DynamicDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: DataScope> KeyedDataStore<K> {
    pub fn named(name: &'static str) -> Self {
        Self {
            entries: DashMap::new(),
            name,
        }
    }

    /// Create the entry for `scope` seeded with `defaults`.
    ///
    /// An existing entry is left as it is; the current snapshot is returned
    /// either way.
    pub fn initialize(&self, scope: &K, defaults: StepData) -> StepData {
        let entry = self
            .entries
            .entry(scope.clone())
            .or_insert_with(|| {
                debug!(store = self.name, scope = %scope, keys = defaults.len(), "Initialized data");
                Arc::new(RwLock::new(defaults))
            })
            .clone();
        let snapshot = entry.read().clone();
        snapshot
    }

    /// Current data for `scope` as an owned copy
    pub fn read(&self, scope: &K) -> StepDataResult<StepData> {
        let entry = self.entry(scope)?;
        let snapshot = entry.read().clone();
        Ok(snapshot)
    }

    /// Apply `delta` over the data for `scope` and return the full result
    pub fn merge(&self, scope: &K, delta: StepData) -> StepDataResult<StepData> {
        let entry = self.entry(scope)?;
        let delta_keys = delta.len();
        let mut data = entry.write();
        data.merge(delta);
        trace!(
            store = self.name,
            scope = %scope,
            delta_keys = delta_keys,
            total_keys = data.len(),
            "Merged data"
        );
        Ok(data.clone())
    }

    /// Read-only view for status surfaces polling from outside the runtime
    pub fn snapshot_for_external_view(&self, scope: &K) -> StepDataResult<StepData> {
        self.read(scope)
    }

    pub fn contains(&self, scope: &K) -> bool {
        self.entries.contains_key(scope)
    }

    /// Drop the entry for one scope, returning its final data
    pub fn remove(&self, scope: &K) -> Option<StepData> {
        self.entries.remove(scope).map(|(_, entry)| {
            let data = entry.read().clone();
            data
        })
    }

    /// Retention hook: drop every entry owned by `workflow_instance_id`
    pub fn purge_workflow_instance(&self, workflow_instance_id: WorkflowInstanceId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|scope, _| scope.workflow_instance() != workflow_instance_id);
        let purged = before.saturating_sub(self.entries.len());
        debug!(
            store = self.name,
            workflow_instance = %workflow_instance_id,
            purged = purged,
            "Purged workflow instance data"
        );
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, scope: &K) -> StepDataResult<Arc<RwLock<StepData>>> {
        self.entries
            .get(scope)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| scope.not_found())
    }
}
