//! # Step Data Stores
//!
//! Per-step-instance and per-workflow-instance key/value state with
//! last-writer-wins merge semantics.
//!
//! Both stores are the same [`KeyedDataStore`] keyed by a different scope:
//!
//! ```text
//! StepDataStore     = KeyedDataStore<StepInstanceId>     (step data)
//! DynamicDataStore  = KeyedDataStore<WorkflowInstanceId> (workflow dynamic data)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use flowstate_core::models::{StepInstanceId, WorkflowInstanceId};
//! use flowstate_core::step_data::StepDataStore;
//! use flowstate_core::step_data;
//!
//! let store = StepDataStore::new();
//! let step = StepInstanceId::new(WorkflowInstanceId::new(), "collect");
//! store.initialize(&step, step_data!({"test1": "test1"}));
//! store.merge(&step, step_data!({"test1": "OVERWRITTEN"})).unwrap();
//!
//! assert_eq!(store.read(&step).unwrap(), step_data!({"test1": "OVERWRITTEN"}));
//! ```

pub mod store;

pub use store::{DataScope, DynamicDataStore, KeyedDataStore, StepDataStore};
