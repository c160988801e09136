//! Built-in record sinks.

use super::traits::RecordSink;
use crate::error::SinkError;
use crate::models::{StepData, StepInstanceId};
use crate::step_data::StepDataStore;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Keeps every accepted record in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<Value>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything accepted so far, in arrival order
    pub fn records(&self) -> Vec<Value> {
        self.records.lock().clone()
    }

    /// Drain the accepted records
    pub fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for CollectingSink {
    fn accept(&self, record: Value) -> Result<(), SinkError> {
        self.records.lock().push(record);
        Ok(())
    }

    fn accept_batch(&self, records: Vec<Value>) -> Result<(), SinkError> {
        self.records.lock().extend(records);
        Ok(())
    }
}

/// Bounded queue; `accept` blocks while the queue is full
#[derive(Debug, Clone)]
pub struct QueueSink {
    sender: Sender<Value>,
}

impl QueueSink {
    pub fn bounded(capacity: usize) -> (Self, Receiver<Value>) {
        let (sender, receiver) = channel::bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl RecordSink for QueueSink {
    fn accept(&self, record: Value) -> Result<(), SinkError> {
        self.sender.send(record).map_err(|_| SinkError::Closed)
    }
}

/// Merges each object record into one step instance's data
pub struct StepDataSink {
    store: Arc<StepDataStore>,
    step_instance_id: StepInstanceId,
}

impl StepDataSink {
    pub fn new(store: Arc<StepDataStore>, step_instance_id: StepInstanceId) -> Self {
        Self {
            store,
            step_instance_id,
        }
    }
}

impl RecordSink for StepDataSink {
    fn accept(&self, record: Value) -> Result<(), SinkError> {
        let delta = StepData::from_value(record)
            .ok_or_else(|| SinkError::Rejected("step data records must be objects".to_string()))?;
        self.store.merge(&self.step_instance_id, delta)?;
        Ok(())
    }
}
