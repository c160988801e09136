use super::types::{
    FaultSink, HandlerError, HandlerFailure, LoggingFaultSink, Notification, NotificationHandler,
    PublishReport, SubscriptionHandle,
};
use crate::config::NotificationConfig;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

struct Subscription {
    id: u64,
    handler: Arc<dyn NotificationHandler>,
}

/// Synchronous topic-based publish/subscribe registry.
///
/// `publish` runs on the caller's thread and returns only after every handler
/// registered for the topic at the moment of publishing has run.
pub struct NotificationBus {
    /// Topic to subscriptions in registration order
    topics: RwLock<HashMap<String, Vec<Subscription>>>,
    next_subscription_id: AtomicU64,
    fault_sink: Arc<dyn FaultSink>,
    slow_handler_threshold: Option<Duration>,
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Counters describing bus activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusStats {
    pub total_subscriptions: usize,
    pub topics: HashMap<String, usize>,
    pub notifications_published: u64,
    pub deliveries: u64,
    pub handler_failures: u64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::with_config(&NotificationConfig::default())
    }

    pub fn with_config(config: &NotificationConfig) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(1),
            fault_sink: Arc::new(LoggingFaultSink),
            slow_handler_threshold: config.slow_handler_threshold(),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Route handler failures to `fault_sink` instead of the error log
    pub fn with_fault_sink(mut self, fault_sink: Arc<dyn FaultSink>) -> Self {
        self.fault_sink = fault_sink;
        self
    }

    /// Register `handler` for `topic`
    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        handler: Arc<dyn NotificationHandler>,
    ) -> SubscriptionHandle {
        let topic = topic.into();
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);

        self.topics
            .write()
            .entry(topic.clone())
            .or_default()
            .push(Subscription {
                id,
                handler: Arc::clone(&handler),
            });

        info!(
            topic = %topic,
            subscription_id = id,
            handler = handler.handler_name(),
            "Registered notification handler"
        );
        SubscriptionHandle { id, topic }
    }

    /// Register a closure for `topic`
    pub fn subscribe_fn<F>(&self, topic: impl Into<String>, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Notification) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(handler))
    }

    /// Remove a subscription. Removing an already removed handle does nothing.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut topics = self.topics.write();
        let Some(subscriptions) = topics.get_mut(&handle.topic) else {
            return;
        };

        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != handle.id);
        let removed = before != subscriptions.len();
        if subscriptions.is_empty() {
            topics.remove(&handle.topic);
        }

        if removed {
            info!(
                topic = %handle.topic,
                subscription_id = handle.id,
                "Unregistered notification handler"
            );
        }
    }

    /// Deliver `payload` to every current subscriber of `topic`, in order.
    ///
    /// A handler that errors or panics is recorded in the report and sent to the
    /// fault sink; the remaining handlers still run.
    pub fn publish(&self, topic: &str, payload: Value) -> PublishReport {
        self.published.fetch_add(1, Ordering::Relaxed);

        // Snapshot so handlers can subscribe, unsubscribe or publish re-entrantly
        let subscribers: Vec<(u64, Arc<dyn NotificationHandler>)> = {
            let topics = self.topics.read();
            topics
                .get(topic)
                .map(|subscriptions| {
                    subscriptions
                        .iter()
                        .map(|s| (s.id, Arc::clone(&s.handler)))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut report = PublishReport {
            topic: topic.to_string(),
            delivered: 0,
            failures: Vec::new(),
        };

        if subscribers.is_empty() {
            debug!(topic = %topic, "No subscribers for notification, dropping");
            return report;
        }

        let notification = Notification {
            topic: topic.to_string(),
            payload: Arc::new(payload),
            published_at: Utc::now(),
        };

        for (subscription_id, handler) in subscribers {
            let started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(&notification)));
            self.check_slow_handler(topic, subscription_id, handler.as_ref(), started.elapsed());

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some((error.to_string(), false)),
                Err(panic) => Some((panic_message(panic.as_ref()), true)),
            };

            match failure {
                None => {
                    report.delivered += 1;
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Some((error, panicked)) => {
                    let failure = HandlerFailure {
                        topic: topic.to_string(),
                        subscription_id,
                        handler_name: handler.handler_name().to_string(),
                        error,
                        panicked,
                    };
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    self.fault_sink.report(&failure);
                    report.failures.push(failure);
                }
            }
        }

        debug!(
            topic = %topic,
            delivered = report.delivered,
            failed = report.failures.len(),
            "Published notification"
        );
        report
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    pub fn stats(&self) -> BusStats {
        let topics = self.topics.read();
        let per_topic: HashMap<String, usize> = topics
            .iter()
            .map(|(topic, subscriptions)| (topic.clone(), subscriptions.len()))
            .collect();

        BusStats {
            total_subscriptions: per_topic.values().sum(),
            topics: per_topic,
            notifications_published: self.published.load(Ordering::Relaxed),
            deliveries: self.delivered.load(Ordering::Relaxed),
            handler_failures: self.failed.load(Ordering::Relaxed),
        }
    }

    fn check_slow_handler(
        &self,
        topic: &str,
        subscription_id: u64,
        handler: &dyn NotificationHandler,
        elapsed: Duration,
    ) {
        if let Some(threshold) = self.slow_handler_threshold {
            if elapsed > threshold {
                warn!(
                    topic = %topic,
                    subscription_id = subscription_id,
                    handler = handler.handler_name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = threshold.as_millis() as u64,
                    "Slow notification handler delayed publisher"
                );
            }
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked without a message".to_string()
    }
}
