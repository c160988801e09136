use super::traits::{Processor, RecordEmitter};
use crate::error::ProcessorResult;
use serde_json::Value;

type TransformFn = dyn Fn(Value, &mut RecordEmitter) -> ProcessorResult<()> + Send + Sync;

/// Closure-backed processor for ad-hoc stages
pub struct FnProcessor {
    name: String,
    transform: Box<TransformFn>,
    supports_bulk: bool,
}

impl FnProcessor {
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value, &mut RecordEmitter) -> ProcessorResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            transform: Box::new(transform),
            supports_bulk: false,
        }
    }

    pub fn with_bulk(mut self, supports_bulk: bool) -> Self {
        self.supports_bulk = supports_bulk;
        self
    }
}

impl std::fmt::Debug for FnProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProcessor")
            .field("name", &self.name)
            .field("supports_bulk", &self.supports_bulk)
            .finish()
    }
}

impl Processor for FnProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, record: Value, out: &mut RecordEmitter) -> ProcessorResult<()> {
        (self.transform)(record, out)
    }

    fn supports_bulk(&self) -> bool {
        self.supports_bulk
    }
}
