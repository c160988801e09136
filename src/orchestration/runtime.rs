use crate::async_completion::AsyncCompletionRegistry;
use crate::config::{ConfigManager, FlowstateConfig};
use crate::error::{StepDataError, StepDataResult};
use crate::events::NotificationBus;
use crate::models::{StepData, WorkflowInstanceId};
use crate::step_data::{DynamicDataStore, StepDataStore};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Shared services every step context is bound to.
///
/// One runtime serves many workflow instances; everything it holds is keyed by
/// workflow or step instance.
pub struct WorkflowRuntime {
    config: FlowstateConfig,
    step_data: Arc<StepDataStore>,
    dynamic_data: Arc<DynamicDataStore>,
    async_completions: Arc<AsyncCompletionRegistry>,
    bus: Arc<NotificationBus>,
    static_data: DashMap<WorkflowInstanceId, Arc<StepData>>,
}

impl WorkflowRuntime {
    pub fn new(config: FlowstateConfig) -> Self {
        let bus = NotificationBus::with_config(&config.notifications);
        Self::with_notification_bus(config, bus)
    }

    /// Runtime with a pre-built bus, e.g. one with a custom fault sink
    pub fn with_notification_bus(config: FlowstateConfig, bus: NotificationBus) -> Self {
        Self {
            config,
            step_data: Arc::new(StepDataStore::new()),
            dynamic_data: Arc::new(DynamicDataStore::new()),
            async_completions: Arc::new(AsyncCompletionRegistry::new()),
            bus: Arc::new(bus),
            static_data: DashMap::new(),
        }
    }

    pub fn from_config_manager(manager: &ConfigManager) -> Self {
        Self::new(manager.config().clone())
    }

    pub fn config(&self) -> &FlowstateConfig {
        &self.config
    }

    pub fn step_data(&self) -> &Arc<StepDataStore> {
        &self.step_data
    }

    pub fn dynamic_data(&self) -> &Arc<DynamicDataStore> {
        &self.dynamic_data
    }

    pub fn async_completions(&self) -> &Arc<AsyncCompletionRegistry> {
        &self.async_completions
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    /// Register a new workflow instance with its read-only input data
    pub fn start_workflow_instance(&self, static_data: StepData) -> WorkflowInstanceId {
        let workflow_instance_id = WorkflowInstanceId::new();
        self.static_data
            .insert(workflow_instance_id, Arc::new(static_data));
        self.dynamic_data
            .initialize(&workflow_instance_id, StepData::new());
        info!(workflow_instance = %workflow_instance_id, "Started workflow instance");
        workflow_instance_id
    }

    pub fn static_data(&self, workflow_instance_id: WorkflowInstanceId) -> StepDataResult<Arc<StepData>> {
        self.static_data
            .get(&workflow_instance_id)
            .map(|data| Arc::clone(data.value()))
            .ok_or(StepDataError::WorkflowNotFound(workflow_instance_id))
    }

    /// Retention hook: drop all state of one workflow instance
    pub fn purge_workflow_instance(&self, workflow_instance_id: WorkflowInstanceId) -> usize {
        let mut purged = self.step_data.purge_workflow_instance(workflow_instance_id);
        purged += self.dynamic_data.purge_workflow_instance(workflow_instance_id);
        purged += self
            .async_completions
            .purge_workflow_instance(workflow_instance_id);
        if self.static_data.remove(&workflow_instance_id).is_some() {
            purged += 1;
        }
        info!(
            workflow_instance = %workflow_instance_id,
            purged = purged,
            "Purged workflow instance"
        );
        purged
    }
}

impl Default for WorkflowRuntime {
    fn default() -> Self {
        Self::new(FlowstateConfig::default())
    }
}
