//! # Processor Stages
//!
//! A [`ProcessorStage`] hosts a user-supplied [`Processor`] and forwards each
//! output record to a [`RecordSink`]. Stages are sinks themselves, so they
//! chain:
//!
//! ```rust
//! use flowstate_core::config::StageConfig;
//! use flowstate_core::processor::{CollectingSink, PrefixProcessor, ProcessorStage};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(CollectingSink::new());
//! let second = Arc::new(ProcessorStage::new(
//!     Arc::new(PrefixProcessor::new("b", "B-")),
//!     sink.clone(),
//!     &StageConfig::default(),
//! ));
//! let first = ProcessorStage::new(
//!     Arc::new(PrefixProcessor::new("a", "A-")),
//!     second,
//!     &StageConfig::default(),
//! );
//!
//! first.submit(json!({"key": 1})).unwrap();
//! assert_eq!(sink.records(), vec![json!({"B-A-key": 1})]);
//! ```

pub mod function;
pub mod prefix;
pub mod sinks;
pub mod stage;
pub mod traits;

pub use function::FnProcessor;
pub use prefix::PrefixProcessor;
pub use sinks::{CollectingSink, QueueSink, StepDataSink};
pub use stage::{BatchReport, ProcessorStage, RecordFailure};
pub use traits::{BatchEmitter, Processor, RecordEmitter, RecordSink};
