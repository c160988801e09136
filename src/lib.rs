#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Flowstate Core
//!
//! Runtime core for executing workflow steps inside a single process.
//!
//! ## Overview
//!
//! A workflow instance is a run of a workflow definition; each step in it is
//! executed as a step instance. The core provides what running step code
//! needs around it:
//!
//! - per-step-instance key/value state with last-writer-wins merges
//! - async correlation keys that let a step suspend until an external party
//!   completes (or a timeout policy expires) the key
//! - a synchronous topic-based notification bus
//! - processor stages that transform records and forward them to a sink
//! - an executor that runs steps, interprets their outcome and resumes
//!   suspended ones exactly once per resolution
//!
//! ## Module Organization
//!
//! - [`models`] - Identifiers and step data
//! - [`step_data`] - Step data and workflow dynamic data stores
//! - [`async_completion`] - Async key registry and resumption routing
//! - [`events`] - Notification bus
//! - [`processor`] - Processor stages and sinks
//! - [`orchestration`] - Runtime, step context and step executor
//! - [`state_machine`] - Step lifecycle state
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use flowstate_core::config::ConfigManager;
//! use flowstate_core::error::StepResult;
//! use flowstate_core::models::{StepData, StepInstanceId};
//! use flowstate_core::orchestration::{
//!     Completion, StepContext, StepEntry, StepExecutor, StepOutcome, WorkflowRuntime,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct WaitForCallback;
//!
//! impl StepEntry for WaitForCallback {
//!     fn name(&self) -> &str {
//!         "wait_for_callback"
//!     }
//!
//!     fn primary(&self, ctx: &StepContext) -> StepResult<Completion> {
//!         ctx.suspend()
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::from_yaml_str("execution:\n  max_concurrent_steps: 4\n", "test")?;
//! let runtime = Arc::new(WorkflowRuntime::from_config_manager(&manager));
//! let executor = StepExecutor::new(Arc::clone(&runtime));
//!
//! let wf = runtime.start_workflow_instance(StepData::new());
//! let step = StepInstanceId::new(wf, "wait_for_callback");
//!
//! let outcome = executor.execute(Arc::new(WaitForCallback), step);
//! let key = outcome.async_key().cloned().ok_or("expected a suspension")?;
//! assert!(matches!(outcome, StepOutcome::Suspended(_)));
//!
//! // Later, an external party answers
//! runtime.async_completions().complete(&key, json!({"status": "ok"}))?;
//! # Ok(())
//! # }
//! ```

pub mod async_completion;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod processor;
pub mod state_machine;
pub mod step_data;

pub use async_completion::{AsyncCompletionRegistry, AsyncKeyState, AsyncOutcome};
pub use config::{ConfigManager, FlowstateConfig, StageConfig};
pub use error::{FlowstateError, Result};
pub use events::{Notification, NotificationBus, SubscriptionHandle};
pub use models::{AsyncKey, StepData, StepInstanceId, WorkflowInstanceId};
pub use orchestration::{
    Completion, StepContext, StepEntry, StepExecutor, StepOutcome, StepResumable, WorkflowRuntime,
};
pub use processor::{Processor, ProcessorStage, RecordSink};
pub use step_data::{DynamicDataStore, StepDataStore};
