//! Core data model: identifiers and step data.

pub mod identifiers;
pub mod step_data;

pub use identifiers::{AsyncKey, StepInstanceId, WorkflowInstanceId};
pub use step_data::StepData;
