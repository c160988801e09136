//! # Step Orchestration
//!
//! Execution of step instances on top of the shared runtime services.
//!
//! ## Core Components
//!
//! - **WorkflowRuntime**: owns the step data store, the workflow dynamic data
//!   store, the async completion registry and the notification bus
//! - **StepContext**: what step code receives; scoped to one step instance
//! - **StepEntry / StepResumable**: the capabilities a step implements
//! - **StepExecutor**: runs primaries, interprets outcomes and applies
//!   resumptions one at a time per step instance
//!
//! ```rust
//! use flowstate_core::error::StepResult;
//! use flowstate_core::models::{StepData, StepInstanceId};
//! use flowstate_core::orchestration::{
//!     Completion, StepContext, StepEntry, StepExecutor, StepOutcome, WorkflowRuntime,
//! };
//! use flowstate_core::step_data;
//! use std::sync::Arc;
//!
//! struct Greet;
//!
//! impl StepEntry for Greet {
//!     fn name(&self) -> &str {
//!         "greet"
//!     }
//!
//!     fn primary(&self, ctx: &StepContext) -> StepResult<Completion> {
//!         ctx.update_step_data(step_data!({"greeting": "hello"}))?;
//!         Ok(Completion::Complete)
//!     }
//! }
//!
//! let executor = StepExecutor::new(Arc::new(WorkflowRuntime::default()));
//! let wf = executor.runtime().start_workflow_instance(StepData::new());
//! let step = StepInstanceId::new(wf, "greet");
//!
//! assert_eq!(executor.execute(Arc::new(Greet), step.clone()), StepOutcome::Complete);
//! ```

pub mod context;
pub mod runtime;
pub mod step_executor;
pub mod step_handler;

pub use context::StepContext;
pub use runtime::WorkflowRuntime;
pub use step_executor::StepExecutor;
pub use step_handler::{Completion, StepEntry, StepOutcome, StepResumable};
