//! # Async Completion
//!
//! Correlation keys for steps that wait on something outside the runtime.
//! A suspending step is issued an [`AsyncKey`](crate::models::AsyncKey); an
//! external party later calls `complete` (or a timeout policy calls
//! `expire`) and the registry hands a [`Resumption`] to the attached
//! [`ResumptionHandler`], normally the step executor.

pub mod registry;
pub mod types;

pub use registry::AsyncCompletionRegistry;
pub use types::{AsyncKeyState, AsyncKeyStatus, AsyncOutcome, Resumption, ResumptionHandler};
