use super::traits::{BatchEmitter, Processor, RecordEmitter, RecordSink, RecordSlot};
use crate::config::StageConfig;
use crate::error::{ProcessorError, ProcessorResult, SinkError};
use crate::logging::log_processor_operation;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// One input record that did not make it through the stage. A whole-batch
/// failure from a bulk processor is filed at `index == submitted`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub index: usize,
    pub error: String,
    #[serde(skip)]
    pub source: ProcessorError,
}

/// Result of `submit_batch`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub stage: String,
    pub submitted: usize,
    /// Output records handed to the sink
    pub forwarded: usize,
    pub failures: Vec<RecordFailure>,
    /// Records never processed because the batch ended early
    pub skipped: usize,
    /// The processor ended the batch, by `BatchAbort` or a whole-batch error
    pub aborted: bool,
}

impl BatchReport {
    fn new(stage: &str, submitted: usize) -> Self {
        Self {
            stage: stage.to_string(),
            submitted,
            forwarded: 0,
            failures: Vec::new(),
            skipped: 0,
            aborted: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }

    fn record_failure(&mut self, index: usize, error: ProcessorError) {
        self.failures.push(RecordFailure {
            index,
            error: error.to_string(),
            source: error,
        });
    }
}

/// Hosts a [`Processor`] and forwards everything it produces to a sink.
///
/// No internal concurrency: one submission is processed at a time on the
/// caller's thread, and every output is forwarded before the call returns.
pub struct ProcessorStage {
    name: String,
    processor: Arc<dyn Processor>,
    sink: Arc<dyn RecordSink>,
    supports_bulk: bool,
}

impl ProcessorStage {
    /// Configuration is captured here and never changes afterwards
    pub fn new(
        processor: Arc<dyn Processor>,
        sink: Arc<dyn RecordSink>,
        config: &StageConfig,
    ) -> Self {
        let supports_bulk = config
            .supports_bulk
            .unwrap_or_else(|| processor.supports_bulk());
        let name = processor.name().to_string();
        debug!(stage = %name, supports_bulk = supports_bulk, "Created processor stage");
        Self {
            name,
            processor,
            sink,
            supports_bulk,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supports_bulk(&self) -> bool {
        self.supports_bulk
    }

    /// Process exactly one record. Returns how many outputs were forwarded.
    pub fn submit(&self, record: Value) -> ProcessorResult<usize> {
        let mut emitter = RecordEmitter::new();
        self.processor.submit(record, &mut emitter)?;
        self.flush(emitter.into_records())
    }

    /// Process a batch. With bulk capability the processor sees the whole
    /// batch; otherwise each record goes through [`submit`](Self::submit).
    pub fn submit_batch(&self, batch: Vec<Value>) -> BatchReport {
        let mut report = BatchReport::new(&self.name, batch.len());

        if self.supports_bulk {
            self.run_bulk(batch, &mut report);
        } else {
            self.run_per_record(batch, &mut report);
        }

        let status = if report.is_clean() { "ok" } else { "partial" };
        log_processor_operation("submit_batch", &self.name, report.submitted, status, None);
        report
    }

    fn run_per_record(&self, batch: Vec<Value>, report: &mut BatchReport) {
        let total = batch.len();
        for (index, record) in batch.into_iter().enumerate() {
            match self.submit(record) {
                Ok(forwarded) => report.forwarded += forwarded,
                Err(error) if error.is_batch_abort() => {
                    warn!(stage = %self.name, index = index, error = %error, "Batch aborted");
                    report.record_failure(index, error);
                    report.aborted = true;
                    report.skipped = total - index - 1;
                    return;
                }
                Err(error) => {
                    warn!(stage = %self.name, index = index, error = %error, "Record failed");
                    report.record_failure(index, error);
                }
            }
        }
    }

    fn run_bulk(&self, batch: Vec<Value>, report: &mut BatchReport) {
        let mut emitter = BatchEmitter::with_len(batch.len());
        if let Err(error) = self.processor.submit_batch(batch, &mut emitter) {
            report.aborted = true;
            if error.is_batch_abort() {
                warn!(stage = %self.name, error = %error, "Bulk submission aborted");
            } else {
                warn!(stage = %self.name, error = %error, "Bulk submission failed as a whole");
                report.record_failure(report.submitted, error);
            }
        }

        for (index, slot) in emitter.into_slots().into_iter().enumerate() {
            match slot {
                RecordSlot::Staged(outputs) => match self.flush(outputs) {
                    Ok(forwarded) => report.forwarded += forwarded,
                    Err(error) => report.record_failure(index, error),
                },
                RecordSlot::Failed(error) => report.record_failure(index, error),
                RecordSlot::Untouched if report.aborted => report.skipped += 1,
                RecordSlot::Untouched => {}
            }
        }
    }

    fn flush(&self, outputs: Vec<Value>) -> ProcessorResult<usize> {
        let count = outputs.len();
        for output in outputs {
            self.sink
                .accept(output)
                .map_err(|source| ProcessorError::SinkRejected {
                    stage: self.name.clone(),
                    source,
                })?;
        }
        Ok(count)
    }
}

/// Stages chain: a stage is a valid sink for the stage before it
impl RecordSink for ProcessorStage {
    fn accept(&self, record: Value) -> Result<(), SinkError> {
        self.submit(record)
            .map(|_| ())
            .map_err(|e| SinkError::Rejected(e.to_string()))
    }

    fn accept_batch(&self, records: Vec<Value>) -> Result<(), SinkError> {
        let report = self.submit_batch(records);
        if report.is_clean() {
            return Ok(());
        }
        Err(SinkError::Rejected(format!(
            "stage {} failed {} of {} records (skipped {})",
            report.stage,
            report.failures.len(),
            report.submitted,
            report.skipped
        )))
    }
}
