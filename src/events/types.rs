use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Notification delivered to subscribers. The payload is shared and immutable.
#[derive(Debug, Clone)]
pub struct Notification {
    pub topic: String,
    pub payload: Arc<Value>,
    pub published_at: DateTime<Utc>,
}

/// Returned by `subscribe`; pass it back to `unsubscribe`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub(crate) id: u64,
    pub(crate) topic: String,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Error a handler returns to signal it could not process a notification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// Subscriber interface
pub trait NotificationHandler: Send + Sync {
    fn handle(&self, notification: &Notification) -> Result<(), HandlerError>;

    /// Name used when reporting failures
    fn handler_name(&self) -> &str {
        "unnamed_handler"
    }
}

impl<F> NotificationHandler for F
where
    F: Fn(&Notification) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, notification: &Notification) -> Result<(), HandlerError> {
        self(notification)
    }
}

/// One subscriber that failed while handling a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerFailure {
    pub topic: String,
    pub subscription_id: u64,
    pub handler_name: String,
    pub error: String,
    pub panicked: bool,
}

/// Outcome of a single `publish` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub topic: String,
    pub delivered: usize,
    pub failures: Vec<HandlerFailure>,
}

impl PublishReport {
    /// Every handler ran without error
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Handlers invoked, failed or not
    pub fn invoked(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Destination for handler failures besides the publish report
pub trait FaultSink: Send + Sync {
    fn report(&self, failure: &HandlerFailure);
}

/// Default fault sink: structured error log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFaultSink;

impl FaultSink for LoggingFaultSink {
    fn report(&self, failure: &HandlerFailure) {
        error!(
            topic = %failure.topic,
            subscription_id = failure.subscription_id,
            handler = %failure.handler_name,
            panicked = failure.panicked,
            error = %failure.error,
            "Notification handler failed"
        );
    }
}
