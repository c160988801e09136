//! Processor and sink contracts.

use crate::error::{ProcessorError, ProcessorResult, SinkError};
use serde_json::Value;

/// Downstream consumer of the records a stage forwards
pub trait RecordSink: Send + Sync {
    fn accept(&self, record: Value) -> Result<(), SinkError>;

    /// Accept several records in order. Stops at the first rejection.
    fn accept_batch(&self, records: Vec<Value>) -> Result<(), SinkError> {
        for record in records {
            self.accept(record)?;
        }
        Ok(())
    }
}

impl<F> RecordSink for F
where
    F: Fn(Value) -> Result<(), SinkError> + Send + Sync,
{
    fn accept(&self, record: Value) -> Result<(), SinkError> {
        self(record)
    }
}

/// Collects what a processor produces for one input record.
///
/// Outputs stay staged until the processor returns successfully; a failed
/// record's outputs are discarded without reaching the sink.
#[derive(Debug, Default)]
pub struct RecordEmitter {
    staged: Vec<Value>,
}

impl RecordEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, record: Value) {
        self.staged.push(record);
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub(crate) fn into_records(self) -> Vec<Value> {
        self.staged
    }
}

#[derive(Debug)]
pub(crate) enum RecordSlot {
    Untouched,
    Staged(Vec<Value>),
    Failed(ProcessorError),
}

/// Per-record staging for a bulk submission. Slot `i` belongs to input `i`.
#[derive(Debug)]
pub struct BatchEmitter {
    slots: Vec<RecordSlot>,
}

impl BatchEmitter {
    pub(crate) fn with_len(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| RecordSlot::Untouched).collect(),
        }
    }

    /// Stage an output for input record `index`
    pub fn emit(&mut self, index: usize, record: Value) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        match slot {
            RecordSlot::Staged(outputs) => outputs.push(record),
            RecordSlot::Untouched => *slot = RecordSlot::Staged(vec![record]),
            RecordSlot::Failed(_) => {}
        }
    }

    /// Mark input record `index` as failed, discarding anything staged for it
    pub fn fail(&mut self, index: usize, error: ProcessorError) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = RecordSlot::Failed(error);
        }
    }

    /// Run `f` for record `index` with its own emitter.
    ///
    /// A record failure is recorded against the index and swallowed. A batch
    /// abort is recorded too and returned so the caller stops.
    pub fn process<F>(&mut self, index: usize, f: F) -> ProcessorResult<()>
    where
        F: FnOnce(&mut RecordEmitter) -> ProcessorResult<()>,
    {
        let mut emitter = RecordEmitter::new();
        match f(&mut emitter) {
            Ok(()) => {
                for record in emitter.into_records() {
                    self.emit(index, record);
                }
                if let Some(slot) = self.slots.get_mut(index) {
                    if matches!(slot, RecordSlot::Untouched) {
                        *slot = RecordSlot::Staged(Vec::new());
                    }
                }
                Ok(())
            }
            Err(error) if error.is_batch_abort() => {
                self.fail(index, error.clone());
                Err(error)
            }
            Err(error) => {
                self.fail(index, error);
                Ok(())
            }
        }
    }

    pub(crate) fn into_slots(self) -> Vec<RecordSlot> {
        self.slots
    }
}

/// A record transform hosted by a [`ProcessorStage`](super::ProcessorStage)
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    /// Transform one record, emitting zero or more outputs
    fn submit(&self, record: Value, out: &mut RecordEmitter) -> ProcessorResult<()>;

    /// Transform a whole batch with shared context.
    ///
    /// The default treats each record independently through [`submit`](Self::submit).
    /// Per-record failures belong in [`BatchEmitter::fail`]. Returning `Err`
    /// ends the batch: a `BatchAbort` is the explicit stop signal, and any
    /// other error is a whole-batch failure. Either way records not yet
    /// handled are reported as skipped.
    fn submit_batch(&self, batch: Vec<Value>, out: &mut BatchEmitter) -> ProcessorResult<()> {
        for (index, record) in batch.into_iter().enumerate() {
            out.process(index, |emitter| self.submit(record, emitter))?;
        }
        Ok(())
    }

    fn supports_bulk(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_emitter_discards_failed_outputs() {
        let mut out = BatchEmitter::with_len(2);
        out.process(0, |e| {
            e.emit(json!(1));
            Err(ProcessorError::record_failed("p", "bad"))
        })
        .unwrap();
        out.process(1, |e| {
            e.emit(json!(2));
            Ok(())
        })
        .unwrap();

        let slots = out.into_slots();
        assert!(matches!(slots[0], RecordSlot::Failed(_)));
        assert!(matches!(&slots[1], RecordSlot::Staged(v) if v == &vec![json!(2)]));
    }

    #[test]
    fn test_batch_abort_propagates() {
        let mut out = BatchEmitter::with_len(1);
        let result = out.process(0, |_| Err(ProcessorError::batch_abort("p", "stop")));
        assert!(result.unwrap_err().is_batch_abort());
    }
}
