//! # Step Capabilities
//!
//! A step implements [`StepEntry`] to be executable. Steps that can wait on an
//! external party additionally implement [`StepResumable`] and expose it
//! through [`StepEntry::as_resumable`].
//!
//! ```rust
//! use flowstate_core::async_completion::AsyncOutcome;
//! use flowstate_core::error::StepResult;
//! use flowstate_core::orchestration::{
//!     Completion, StepContext, StepEntry, StepResumable,
//! };
//! use flowstate_core::step_data;
//!
//! struct AwaitApproval;
//!
//! impl StepEntry for AwaitApproval {
//!     fn name(&self) -> &str {
//!         "await_approval"
//!     }
//!
//!     fn primary(&self, ctx: &StepContext) -> StepResult<Completion> {
//!         ctx.update_step_data(step_data!({"requested": true}))?;
//!         ctx.suspend()
//!     }
//!
//!     fn as_resumable(&self) -> Option<&dyn StepResumable> {
//!         Some(self)
//!     }
//! }
//!
//! impl StepResumable for AwaitApproval {
//!     fn resume(&self, ctx: &StepContext, outcome: AsyncOutcome) -> StepResult<Completion> {
//!         let approved = outcome.payload().is_some();
//!         ctx.update_step_data(step_data!({"approved": approved}))?;
//!         Ok(Completion::Complete)
//!     }
//! }
//! ```

use super::context::StepContext;
use crate::async_completion::AsyncOutcome;
use crate::error::{StepError, StepResult};
use crate::models::{AsyncKey, StepData};

/// How step logic finished one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Complete,
    /// Wait for `key` to be completed or expired
    Suspended(AsyncKey),
}

/// Entry behavior of a step
pub trait StepEntry: Send + Sync {
    fn name(&self) -> &str;

    /// Run the step's main logic
    fn primary(&self, ctx: &StepContext) -> StepResult<Completion>;

    /// Step data a fresh step instance starts with
    fn default_step_data(&self) -> StepData {
        StepData::new()
    }

    /// Resumption capability, if the step has one
    fn as_resumable(&self) -> Option<&dyn StepResumable> {
        None
    }
}

/// Continuation behavior after an async key resolves
pub trait StepResumable: StepEntry {
    fn resume(&self, ctx: &StepContext, outcome: AsyncOutcome) -> StepResult<Completion>;
}

/// What the executor reports for a step instance
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Complete,
    Suspended(AsyncKey),
    Failed(StepError),
}

impl StepOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn async_key(&self) -> Option<&AsyncKey> {
        match self {
            Self::Suspended(key) => Some(key),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StepError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}
